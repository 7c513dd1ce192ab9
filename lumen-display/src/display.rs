//! The draw/swap cycle for one root surface.
//!
//! A [`Display`] walks a fixed lifecycle: created uninitialized, it gains
//! an output surface, then a root surface id, after which it can draw.
//! Output failure latches it into a lost state; the owning
//! [`DisplayClient`] is told once and no further draws happen until the
//! embedder supplies a fresh output surface. Disposal releases the root
//! reference that kept the displayed surface alive.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;
use tracing::{info, warn};

use crate::aggregator::SurfaceAggregator;
use crate::output::{DisplayClient, OutputSurface, OutputSurfaceError};
use crate::scheduler::{DisplayScheduler, DisplaySchedulerConfig};
use lumen_core::Size;
use lumen_surfaces::client::SurfaceObserver;
use lumen_surfaces::id::{FrameSinkId, SurfaceId};
use lumen_surfaces::manager::SurfaceManager;
use lumen_surfaces::surface::{CopyOutputResult, DrawStatus};

/// Lifecycle states of a display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    /// Created, no output surface yet.
    Uninitialized,
    /// Has an output surface but nothing to show.
    Initialized,
    /// Has a root surface and can draw.
    HasSurface,
    /// The output surface failed; drawing is suspended.
    Lost,
    /// Torn down for good.
    Disposed,
}

/// Errors reported by [`Display::draw_and_swap`].
#[derive(Debug, Error)]
pub enum DisplayError {
    /// No root surface has been set.
    #[error("no root surface set")]
    NoSurfaceSet,
    /// The output surface was lost; supply a new one to resume.
    #[error("output surface lost")]
    OutputSurfaceLost,
    /// The display has been disposed.
    #[error("display disposed")]
    Disposed,
    /// The swap itself failed, transitioning the display to lost.
    #[error(transparent)]
    Swap(#[from] OutputSurfaceError),
}

/// Owns the draw/swap cycle for exactly one root surface id.
pub struct Display {
    frame_sink_id: FrameSinkId,
    state: DisplayState,
    current_surface_id: Option<SurfaceId>,
    output: Option<Box<dyn OutputSurface>>,
    client: Rc<RefCell<dyn DisplayClient>>,
    aggregator: SurfaceAggregator,
    scheduler: Rc<RefCell<DisplayScheduler>>,
}

impl Display {
    /// Creates an uninitialized display for `frame_sink_id`, reporting to
    /// `client`.
    pub fn new(
        frame_sink_id: FrameSinkId,
        client: Rc<RefCell<dyn DisplayClient>>,
        scheduler_config: DisplaySchedulerConfig,
    ) -> Self {
        Display {
            frame_sink_id,
            state: DisplayState::Uninitialized,
            current_surface_id: None,
            output: None,
            client,
            aggregator: SurfaceAggregator::new(),
            scheduler: Rc::new(RefCell::new(DisplayScheduler::new(scheduler_config))),
        }
    }

    /// The display's own frame sink id.
    pub fn frame_sink_id(&self) -> FrameSinkId {
        self.frame_sink_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DisplayState {
        self.state
    }

    /// The scheduler, for attaching to a begin-frame source.
    pub fn scheduler(&self) -> Rc<RefCell<DisplayScheduler>> {
        self.scheduler.clone()
    }

    /// Supplies the output surface and registers for damage, moving the
    /// display to initialized.
    ///
    /// # Panics
    /// Panics unless the display is uninitialized.
    pub fn initialize(&mut self, manager: &mut SurfaceManager, output: Box<dyn OutputSurface>) {
        assert_eq!(
            self.state,
            DisplayState::Uninitialized,
            "display initialized twice"
        );
        self.output = Some(output);
        let observer: Rc<RefCell<dyn SurfaceObserver>> = self.scheduler.clone();
        manager.add_observer(&observer);
        self.state = DisplayState::Initialized;
    }

    /// Points the display at a root surface. The registry's designated
    /// root keeps a reference to it so garbage collection cannot take the
    /// displayed surface away; the reference to the previously shown
    /// surface is dropped.
    ///
    /// # Panics
    /// Panics when the display has no output surface, is lost, or is
    /// disposed.
    pub fn set_surface_id(&mut self, manager: &mut SurfaceManager, surface_id: SurfaceId) {
        assert!(
            matches!(self.state, DisplayState::Initialized | DisplayState::HasSurface),
            "setting surface on a display in state {:?}",
            self.state
        );
        let root = manager.root_surface_id();
        let previous = self.current_surface_id.replace(surface_id);
        manager.add_surface_reference(root, surface_id);
        if let Some(previous) = previous {
            if previous != surface_id {
                manager.remove_surface_reference(root, previous);
            }
        }
        self.scheduler.borrow_mut().set_root_surface(surface_id);
        self.state = DisplayState::HasSurface;
    }

    /// Resizes the output surface.
    pub fn resize(&mut self, size: Size<u32>) {
        if let Some(output) = self.output.as_mut() {
            output.resize(size);
        }
    }

    /// Aggregates the current surface tree, swaps it, fires draw callbacks
    /// and copy results. Returns `Ok(true)` when a frame was swapped,
    /// `Ok(false)` when there was nothing to draw.
    ///
    /// On swap failure the display latches into the lost state, tells the
    /// client once, and every further call fails without touching the
    /// output.
    pub fn draw_and_swap(&mut self, manager: &mut SurfaceManager) -> Result<bool, DisplayError> {
        match self.state {
            DisplayState::HasSurface => {}
            DisplayState::Uninitialized | DisplayState::Initialized => {
                return Err(DisplayError::NoSurfaceSet)
            }
            DisplayState::Lost => return Err(DisplayError::OutputSurfaceLost),
            DisplayState::Disposed => return Err(DisplayError::Disposed),
        }
        let surface_id = self
            .current_surface_id
            .expect("has-surface state without a surface id");

        let Some(frame) = self.aggregator.aggregate(manager, surface_id) else {
            return Ok(false);
        };

        let output = self
            .output
            .as_mut()
            .expect("initialized display without an output surface");
        match output.swap_buffers(&frame) {
            Ok(()) => {
                let output_size = output.surface_size();
                for contained in &frame.contained_surfaces {
                    if let Some(surface) = manager.get_surface_mut(*contained) {
                        surface.run_draw_callback(DrawStatus::Drawn);
                    }
                }
                for (_, request) in frame.copy_requests {
                    request.send_result(CopyOutputResult::with_size(output_size));
                }
                let mut scheduler = self.scheduler.borrow_mut();
                scheduler.did_draw();
                // Software-style outputs complete their swap synchronously.
                scheduler.did_swap_complete();
                Ok(true)
            }
            Err(error) => {
                warn!(%surface_id, %error, "output surface lost during swap");
                self.state = DisplayState::Lost;
                self.client.borrow_mut().display_output_surface_lost();
                Err(DisplayError::Swap(error))
            }
        }
    }

    /// Supplies a replacement output surface after loss, resuming draws.
    ///
    /// # Panics
    /// Panics unless the display is in the lost state.
    pub fn restore_output_surface(&mut self, output: Box<dyn OutputSurface>) {
        assert_eq!(
            self.state,
            DisplayState::Lost,
            "restoring output surface on a display that is not lost"
        );
        self.output = Some(output);
        info!("output surface restored");
        self.state = if self.current_surface_id.is_some() {
            DisplayState::HasSurface
        } else {
            DisplayState::Initialized
        };
    }

    /// Tears the display down: releases the root reference pinning the
    /// displayed surface and stops observing damage.
    pub fn dispose(&mut self, manager: &mut SurfaceManager) {
        if let Some(surface_id) = self.current_surface_id.take() {
            manager.remove_surface_reference(manager.root_surface_id(), surface_id);
        }
        let observer: Rc<RefCell<dyn SurfaceObserver>> = self.scheduler.clone();
        manager.remove_observer(&observer);
        self.output = None;
        self.state = DisplayState::Disposed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::SoftwareOutputSurface;
    use lumen_core::Rect;
    use lumen_surfaces::begin_frame::BeginFrameSourceHandle;
    use lumen_surfaces::client::SurfaceFactoryClient;
    use lumen_surfaces::factory::SurfaceFactory;
    use lumen_surfaces::frame::{CompositorFrame, DrawQuad, RenderPass, RenderPassId};
    use lumen_surfaces::id::LocalFrameId;
    use lumen_surfaces::resources::ReturnedResource;
    use lumen_surfaces::surface::CopyOutputRequest;
    use lumen_surfaces::SurfaceIdAllocator;
    use std::cell::Cell;

    #[derive(Default)]
    struct NullFactoryClient;

    impl SurfaceFactoryClient for NullFactoryClient {
        fn return_resources(&mut self, _resources: Vec<ReturnedResource>) {}
        fn set_begin_frame_source(&mut self, _source: Option<BeginFrameSourceHandle>) {}
        fn will_draw_surface(&mut self, _surface_id: SurfaceId, _damage_rect: Rect<i32>) {}
    }

    #[derive(Default)]
    struct RecordingDisplayClient {
        lost_count: usize,
    }

    impl DisplayClient for RecordingDisplayClient {
        fn display_output_surface_lost(&mut self) {
            self.lost_count += 1;
        }
    }

    struct Harness {
        manager: SurfaceManager,
        factory: SurfaceFactory,
        allocator: SurfaceIdAllocator,
        display: Display,
        client: Rc<RefCell<RecordingDisplayClient>>,
    }

    fn harness() -> Harness {
        let mut manager = SurfaceManager::new();
        let producer_sink = FrameSinkId::new(1, 0);
        let display_sink = FrameSinkId::new(100, 0);
        manager.register_frame_sink_id(producer_sink);
        manager.register_frame_sink_id(display_sink);

        let factory_client = Rc::new(RefCell::new(NullFactoryClient));
        let factory = SurfaceFactory::new(producer_sink, factory_client);
        let allocator = SurfaceIdAllocator::new(producer_sink);

        let client = Rc::new(RefCell::new(RecordingDisplayClient::default()));
        let mut display = Display::new(
            display_sink,
            client.clone(),
            DisplaySchedulerConfig::default(),
        );
        display.initialize(
            &mut manager,
            Box::new(SoftwareOutputSurface::new(Size::new(800, 600))),
        );

        Harness {
            manager,
            factory,
            allocator,
            display,
            client,
        }
    }

    fn solid_frame() -> CompositorFrame {
        let mut pass = RenderPass::new(RenderPassId(1), Rect::from_coords(0, 0, 800, 600));
        pass.quads.push(DrawQuad::SolidColor {
            rect: Rect::from_coords(0, 0, 800, 600),
            color: 0xff12_3456,
        });
        CompositorFrame::from_passes(vec![pass], Vec::new())
    }

    fn create_submitted_surface(h: &mut Harness) -> (LocalFrameId, SurfaceId) {
        let local_id = h.allocator.generate_id();
        h.factory.create(&mut h.manager, local_id);
        h.factory
            .submit_compositor_frame(&mut h.manager, local_id, solid_frame(), None);
        (local_id, SurfaceId::new(h.factory.frame_sink_id(), local_id))
    }

    #[test]
    fn test_draw_before_surface_set_is_an_error() {
        let mut h = harness();
        assert!(matches!(
            h.display.draw_and_swap(&mut h.manager),
            Err(DisplayError::NoSurfaceSet)
        ));
    }

    #[test]
    fn test_draw_and_swap_presents_and_fires_callbacks() {
        let mut h = harness();
        let local_id = h.allocator.generate_id();
        h.factory.create(&mut h.manager, local_id);

        let drawn = Rc::new(Cell::new(None));
        let drawn_clone = drawn.clone();
        h.factory.submit_compositor_frame(
            &mut h.manager,
            local_id,
            solid_frame(),
            Some(Box::new(move |status| drawn_clone.set(Some(status)))),
        );
        let surface_id = SurfaceId::new(h.factory.frame_sink_id(), local_id);

        h.display.set_surface_id(&mut h.manager, surface_id);
        assert_eq!(h.display.state(), DisplayState::HasSurface);

        let swapped = h.display.draw_and_swap(&mut h.manager).unwrap();
        assert!(swapped);
        assert_eq!(drawn.get(), Some(DrawStatus::Drawn));
    }

    #[test]
    fn test_surface_without_frame_draws_nothing() {
        let mut h = harness();
        let local_id = h.allocator.generate_id();
        h.factory.create(&mut h.manager, local_id);
        let surface_id = SurfaceId::new(h.factory.frame_sink_id(), local_id);

        h.display.set_surface_id(&mut h.manager, surface_id);
        assert_eq!(h.display.draw_and_swap(&mut h.manager).unwrap(), false);
    }

    #[test]
    fn test_displayed_surface_is_pinned_until_replaced() {
        let mut h = harness();
        let (local_a, surface_a) = create_submitted_surface(&mut h);
        let (_local_b, surface_b) = create_submitted_surface(&mut h);

        h.display.set_surface_id(&mut h.manager, surface_a);
        h.factory.destroy(&mut h.manager, local_a);
        // Destroyed but displayed: the root reference keeps it alive.
        assert!(h.manager.get_surface(surface_a).is_some());

        h.display.set_surface_id(&mut h.manager, surface_b);
        // Showing b released a, which can now be collected.
        assert!(h.manager.get_surface(surface_a).is_none());
        assert!(h.manager.get_surface(surface_b).is_some());
    }

    #[test]
    fn test_output_loss_latches_and_notifies_once() {
        let mut h = harness();
        let (_, surface_id) = create_submitted_surface(&mut h);
        h.display.set_surface_id(&mut h.manager, surface_id);

        // Replace the live output with one whose next swap fails.
        let mut failing = SoftwareOutputSurface::new(Size::new(800, 600));
        failing.fail_next_swap();
        h.display.output = Some(Box::new(failing));

        assert!(matches!(
            h.display.draw_and_swap(&mut h.manager),
            Err(DisplayError::Swap(OutputSurfaceError::Lost(_)))
        ));
        assert_eq!(h.display.state(), DisplayState::Lost);
        assert_eq!(h.client.borrow().lost_count, 1);

        // Further draws fail fast without another notification.
        assert!(matches!(
            h.display.draw_and_swap(&mut h.manager),
            Err(DisplayError::OutputSurfaceLost)
        ));
        assert_eq!(h.client.borrow().lost_count, 1);

        // A fresh output surface resumes drawing.
        h.display
            .restore_output_surface(Box::new(SoftwareOutputSurface::new(Size::new(800, 600))));
        assert_eq!(h.display.state(), DisplayState::HasSurface);
        assert!(h.display.draw_and_swap(&mut h.manager).unwrap());
    }

    #[test]
    fn test_copy_request_fulfilled_after_swap() {
        let mut h = harness();
        let (local_id, surface_id) = create_submitted_surface(&mut h);
        h.display.set_surface_id(&mut h.manager, surface_id);

        let result_size = Rc::new(Cell::new(Size::new(0u32, 0u32)));
        let result_clone = result_size.clone();
        h.factory.request_copy_of_surface(
            &mut h.manager,
            local_id,
            CopyOutputRequest::new(move |result| result_clone.set(result.size)),
        );

        h.display.draw_and_swap(&mut h.manager).unwrap();
        assert_eq!(result_size.get(), Size::new(800, 600));
    }

    #[test]
    fn test_scheduler_arms_on_damage_and_tick() {
        let mut h = harness();
        let (local_id, surface_id) = create_submitted_surface(&mut h);
        h.display.set_surface_id(&mut h.manager, surface_id);
        h.display.draw_and_swap(&mut h.manager).unwrap();

        let scheduler = h.display.scheduler();
        assert!(!scheduler.borrow().draw_pending());

        // New content damages the surface through the manager's fan-out.
        h.factory
            .submit_compositor_frame(&mut h.manager, local_id, solid_frame(), None);
        assert!(scheduler.borrow().damaged());

        use lumen_surfaces::begin_frame::BeginFrameObserver;
        scheduler.borrow_mut().on_begin_frame(
            lumen_surfaces::begin_frame::BeginFrameArgs {
                frame_time: std::time::Instant::now(),
                interval: std::time::Duration::from_millis(16),
                sequence_number: 1,
            },
        );
        assert!(scheduler.borrow().draw_pending());

        assert!(h.display.draw_and_swap(&mut h.manager).unwrap());
        assert!(!scheduler.borrow().draw_pending());
    }

    #[test]
    fn test_dispose_releases_displayed_surface() {
        let mut h = harness();
        let (local_id, surface_id) = create_submitted_surface(&mut h);
        h.display.set_surface_id(&mut h.manager, surface_id);
        h.factory.destroy(&mut h.manager, local_id);
        assert!(h.manager.get_surface(surface_id).is_some());

        h.display.dispose(&mut h.manager);
        assert_eq!(h.display.state(), DisplayState::Disposed);
        assert!(h.manager.get_surface(surface_id).is_none());
        assert!(matches!(
            h.display.draw_and_swap(&mut h.manager),
            Err(DisplayError::Disposed)
        ));
    }
}
