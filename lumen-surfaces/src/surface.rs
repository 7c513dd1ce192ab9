//! A single frame-producer's current drawable state.
//!
//! A [`Surface`] is created through the factory, owned by the manager's
//! surface map once registered, and destroyed through deferred garbage
//! collection: marking a surface destroyed only queues it, actual deletion
//! waits until no live surface depends on it and all of its destruction
//! dependencies are satisfied.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Weak;

use crate::client::SurfaceFactoryClientHandle;
use crate::frame::CompositorFrame;
use crate::id::{FrameSinkId, SurfaceId, SurfaceSequence};
use crate::resources::SurfaceResourceHolder;
use lumen_core::Size;

/// Outcome delivered to a frame's draw callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawStatus {
    /// The frame was part of a drawn, swapped output.
    Drawn,
    /// The frame was replaced or its surface torn down before drawing.
    DrawSkipped,
}

/// Callback fired exactly once per submitted frame, when the frame is first
/// drawn or when it is discarded undrawn.
pub type DrawCallback = Box<dyn FnOnce(DrawStatus)>;

/// Result of a pixel-readback request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutputResult {
    /// Size of the produced readback; zero when the request yielded
    /// nothing.
    pub size: Size<u32>,
}

impl CopyOutputResult {
    /// A result carrying pixels of the given size.
    pub fn with_size(size: Size<u32>) -> Self {
        CopyOutputResult { size }
    }

    /// An empty result, delivered when the surface died undrawn.
    pub fn empty() -> Self {
        CopyOutputResult {
            size: Size::new(0, 0),
        }
    }

    /// Whether the request produced no pixels.
    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }
}

/// A pixel-readback request serviced on the next aggregation pass.
pub struct CopyOutputRequest {
    callback: Box<dyn FnOnce(CopyOutputResult)>,
}

impl CopyOutputRequest {
    /// Creates a request delivering its result to `callback`. The callback
    /// fires exactly once: with pixels after the next draw, or empty if the
    /// surface is torn down first.
    pub fn new(callback: impl FnOnce(CopyOutputResult) + 'static) -> Self {
        CopyOutputRequest {
            callback: Box::new(callback),
        }
    }

    /// Delivers the result, consuming the request.
    pub fn send_result(self, result: CopyOutputResult) {
        (self.callback)(result);
    }
}

impl std::fmt::Debug for CopyOutputRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyOutputRequest").finish_non_exhaustive()
    }
}

/// Link back to the factory that produced a surface, used during teardown
/// to release the last frame's resources to the producer. The holder is
/// weak: a surface can outlive its factory, in which case the resources are
/// simply gone with it.
pub(crate) struct FactoryLink {
    pub(crate) holder: Weak<RefCell<SurfaceResourceHolder>>,
    pub(crate) client: SurfaceFactoryClientHandle,
}

/// One versioned instance of content produced by a frame sink.
pub struct Surface {
    surface_id: SurfaceId,
    current_frame: Option<CompositorFrame>,
    frame_index: u64,
    draw_callback: Option<DrawCallback>,
    copy_requests: Vec<CopyOutputRequest>,
    destruction_dependencies: Vec<SurfaceSequence>,
    destroyed: bool,
    factory_link: Option<FactoryLink>,
}

impl Surface {
    /// Creates an empty surface for `surface_id`.
    pub fn new(surface_id: SurfaceId) -> Self {
        Surface {
            surface_id,
            current_frame: None,
            frame_index: 0,
            draw_callback: None,
            copy_requests: Vec::new(),
            destruction_dependencies: Vec::new(),
            destroyed: false,
            factory_link: None,
        }
    }

    pub(crate) fn bind_factory(&mut self, link: FactoryLink) {
        self.factory_link = Some(link);
    }

    /// This surface's id.
    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    /// The currently drawable frame, if any has been submitted.
    pub fn current_frame(&self) -> Option<&CompositorFrame> {
        self.current_frame.as_ref()
    }

    /// Monotonic count of frames submitted into this surface.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Surfaces embedded by the current frame; empty before the first
    /// submission.
    pub fn referenced_surfaces(&self) -> &[SurfaceId] {
        self.current_frame
            .as_ref()
            .map(|f| f.referenced_surfaces())
            .unwrap_or(&[])
    }

    /// Stores a newly submitted frame, returning the replaced frame and its
    /// unfired draw callback. The caller fires the old callback as skipped
    /// and releases the old frame's resources.
    pub fn queue_frame(
        &mut self,
        frame: CompositorFrame,
        draw_callback: Option<DrawCallback>,
    ) -> (Option<CompositorFrame>, Option<DrawCallback>) {
        let old_frame = self.current_frame.replace(frame);
        let old_callback = std::mem::replace(&mut self.draw_callback, draw_callback);
        self.frame_index += 1;
        (old_frame, old_callback)
    }

    /// Fires the pending draw callback, if any, with `status`.
    pub fn run_draw_callback(&mut self, status: DrawStatus) {
        if let Some(callback) = self.draw_callback.take() {
            callback(status);
        }
    }

    /// Attaches a pixel-readback request to be serviced on the next
    /// aggregation pass.
    pub fn request_copy_of_output(&mut self, request: CopyOutputRequest) {
        self.copy_requests.push(request);
    }

    /// Takes all pending copy requests.
    pub fn take_copy_requests(&mut self) -> Vec<CopyOutputRequest> {
        std::mem::take(&mut self.copy_requests)
    }

    /// Whether a copy request is pending.
    pub fn has_copy_requests(&self) -> bool {
        !self.copy_requests.is_empty()
    }

    /// Adds a destruction dependency: the surface will not be
    /// garbage-collected until `sequence` is satisfied or its frame sink is
    /// invalidated.
    pub fn add_destruction_dependency(&mut self, sequence: SurfaceSequence) {
        self.destruction_dependencies.push(sequence);
    }

    /// Drops every dependency that is in `satisfied` or whose frame sink is
    /// no longer in `valid_frame_sink_ids`. A matching sequence is consumed
    /// from `satisfied`; each satisfaction releases one dependency.
    pub fn satisfy_destruction_dependencies(
        &mut self,
        satisfied: &mut HashSet<SurfaceSequence>,
        valid_frame_sink_ids: &HashSet<FrameSinkId>,
    ) {
        self.destruction_dependencies.retain(|sequence| {
            !satisfied.remove(sequence) && valid_frame_sink_ids.contains(&sequence.frame_sink_id)
        });
    }

    /// Whether unsatisfied destruction dependencies remain.
    pub fn has_unsatisfied_dependencies(&self) -> bool {
        !self.destruction_dependencies.is_empty()
    }

    /// Marks the surface destroyed. Deletion is deferred to garbage
    /// collection.
    pub fn set_destroyed(&mut self, destroyed: bool) {
        self.destroyed = destroyed;
    }

    /// Whether the surface has been marked destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Final teardown, run by the registry when garbage collection reaps
    /// the surface: the unfired draw callback reports skipped, pending copy
    /// requests complete empty, and the last frame's resources flow back to
    /// the producer.
    pub(crate) fn clear_for_teardown(&mut self) {
        self.run_draw_callback(DrawStatus::DrawSkipped);
        for request in self.take_copy_requests() {
            request.send_result(CopyOutputResult::empty());
        }
        if let Some(frame) = self.current_frame.take() {
            if let Some(link) = &self.factory_link {
                if let Some(holder) = link.holder.upgrade() {
                    let returned = holder.borrow_mut().unref_resources(&frame.resource_ids());
                    if !returned.is_empty() {
                        link.client.borrow_mut().return_resources(returned);
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("surface_id", &self.surface_id)
            .field("frame_index", &self.frame_index)
            .field("destroyed", &self.destroyed)
            .field("dependencies", &self.destruction_dependencies)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::LocalFrameId;
    use std::cell::Cell;
    use std::rc::Rc;
    use uuid::Uuid;

    fn test_surface_id() -> SurfaceId {
        SurfaceId::new(
            FrameSinkId::new(1, 0),
            LocalFrameId::new(1, Uuid::new_v4()),
        )
    }

    #[test]
    fn test_queue_frame_returns_replaced_frame_and_callback() {
        let mut surface = Surface::new(test_surface_id());
        let fired = Rc::new(Cell::new(None));
        let fired_clone = fired.clone();

        let (old, old_cb) = surface.queue_frame(
            CompositorFrame::default(),
            Some(Box::new(move |status| fired_clone.set(Some(status)))),
        );
        assert!(old.is_none());
        assert!(old_cb.is_none());
        assert_eq!(surface.frame_index(), 1);

        let (old, old_cb) = surface.queue_frame(CompositorFrame::default(), None);
        assert!(old.is_some());
        let cb = old_cb.expect("first frame's callback must be handed back");
        cb(DrawStatus::DrawSkipped);
        assert_eq!(fired.get(), Some(DrawStatus::DrawSkipped));
        assert_eq!(surface.frame_index(), 2);
    }

    #[test]
    fn test_satisfy_dependencies_by_sequence_and_by_invalidation() {
        let sink_a = FrameSinkId::new(1, 0);
        let sink_b = FrameSinkId::new(2, 0);
        let mut surface = Surface::new(test_surface_id());
        surface.add_destruction_dependency(SurfaceSequence::new(sink_a, 4));
        surface.add_destruction_dependency(SurfaceSequence::new(sink_b, 9));

        let mut satisfied = HashSet::new();
        let mut valid: HashSet<FrameSinkId> = [sink_a, sink_b].into_iter().collect();

        surface.satisfy_destruction_dependencies(&mut satisfied, &valid);
        assert!(surface.has_unsatisfied_dependencies());

        // Satisfying the sequence drops the first dependency and consumes
        // the sequence.
        satisfied.insert(SurfaceSequence::new(sink_a, 4));
        surface.satisfy_destruction_dependencies(&mut satisfied, &valid);
        assert!(surface.has_unsatisfied_dependencies());
        assert!(satisfied.is_empty());

        // Invalidating the other sink drops the rest.
        valid.remove(&sink_b);
        surface.satisfy_destruction_dependencies(&mut satisfied, &valid);
        assert!(!surface.has_unsatisfied_dependencies());
    }

    #[test]
    fn test_teardown_reports_skipped_and_empty_copies() {
        let mut surface = Surface::new(test_surface_id());
        let draw_status = Rc::new(Cell::new(None));
        let copy_empty = Rc::new(Cell::new(false));

        let ds = draw_status.clone();
        surface.queue_frame(
            CompositorFrame::default(),
            Some(Box::new(move |status| ds.set(Some(status)))),
        );
        let ce = copy_empty.clone();
        surface.request_copy_of_output(CopyOutputRequest::new(move |result| {
            ce.set(result.is_empty())
        }));

        surface.clear_for_teardown();
        assert_eq!(draw_status.get(), Some(DrawStatus::DrawSkipped));
        assert!(copy_empty.get());
        assert!(surface.current_frame().is_none());
    }
}
