//! Per-producer façade over the registry: surface creation, frame
//! submission, and destruction.
//!
//! A factory owns no surfaces itself; it registers them with the manager
//! and remembers which local ids it created so it can tear them all down
//! when the producer goes away. Operations take `&mut SurfaceManager`
//! explicitly, keeping the single-owner mutation contract visible at every
//! call site.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::client::SurfaceFactoryClientHandle;
use crate::frame::CompositorFrame;
use crate::id::{FrameSinkId, LocalFrameId, SurfaceId};
use crate::manager::SurfaceManager;
use crate::resources::SurfaceResourceHolder;
use crate::surface::{CopyOutputRequest, DrawCallback, DrawStatus, FactoryLink, Surface};

/// Creates and feeds surfaces for one frame sink.
pub struct SurfaceFactory {
    frame_sink_id: FrameSinkId,
    client: SurfaceFactoryClientHandle,
    holder: Rc<RefCell<SurfaceResourceHolder>>,
    owned_surfaces: HashSet<LocalFrameId>,
}

impl SurfaceFactory {
    /// Creates a factory for `frame_sink_id`, returning freed resources to
    /// `client`.
    pub fn new(frame_sink_id: FrameSinkId, client: SurfaceFactoryClientHandle) -> Self {
        SurfaceFactory {
            frame_sink_id,
            client,
            holder: Rc::new(RefCell::new(SurfaceResourceHolder::new())),
            owned_surfaces: HashSet::new(),
        }
    }

    /// The frame sink this factory produces for.
    pub fn frame_sink_id(&self) -> FrameSinkId {
        self.frame_sink_id
    }

    fn surface_id(&self, local_frame_id: LocalFrameId) -> SurfaceId {
        SurfaceId::new(self.frame_sink_id, local_frame_id)
    }

    /// Registers a new surface for `local_frame_id` with the manager, which
    /// owns it from here on.
    ///
    /// # Panics
    /// Panics if the id was already created by this factory, or (in the
    /// manager) if the factory's frame sink is not registered.
    pub fn create(&mut self, manager: &mut SurfaceManager, local_frame_id: LocalFrameId) {
        assert!(
            self.owned_surfaces.insert(local_frame_id),
            "{local_frame_id} created twice"
        );
        let mut surface = Surface::new(self.surface_id(local_frame_id));
        surface.bind_factory(FactoryLink {
            holder: Rc::downgrade(&self.holder),
            client: self.client.clone(),
        });
        manager.register_surface(surface);
    }

    /// Marks the surface for garbage collection. Actual deletion is
    /// deferred until nothing references it.
    ///
    /// # Panics
    /// Panics if this factory did not create `local_frame_id`.
    pub fn destroy(&mut self, manager: &mut SurfaceManager, local_frame_id: LocalFrameId) {
        assert!(
            self.owned_surfaces.remove(&local_frame_id),
            "destroying {local_frame_id} this factory never created"
        );
        manager.destroy_surface(self.surface_id(local_frame_id));
    }

    /// Marks every surface this factory created for garbage collection.
    /// Used when the producer disappears.
    pub fn destroy_all(&mut self, manager: &mut SurfaceManager) {
        let owned: Vec<LocalFrameId> = self.owned_surfaces.drain().collect();
        for local_frame_id in owned {
            manager.destroy_surface(self.surface_id(local_frame_id));
        }
    }

    /// Stores `frame` on the surface, refs its resources, reconciles the
    /// manager's reference graph with the frame's embedded surfaces, and
    /// announces the damage.
    ///
    /// The replaced frame's draw callback fires as skipped and resources
    /// only that frame was using go back to the client.
    ///
    /// # Panics
    /// Panics if this factory did not create `local_frame_id`.
    pub fn submit_compositor_frame(
        &mut self,
        manager: &mut SurfaceManager,
        local_frame_id: LocalFrameId,
        frame: CompositorFrame,
        draw_callback: Option<DrawCallback>,
    ) {
        assert!(
            self.owned_surfaces.contains(&local_frame_id),
            "submitting to {local_frame_id} this factory never created"
        );
        let surface_id = self.surface_id(local_frame_id);

        self.holder.borrow_mut().receive_from_child(&frame.resource_list);
        let new_refs = frame.metadata.referenced_surfaces.clone();

        let (old_frame, old_callback) = manager
            .get_surface_mut(surface_id)
            .unwrap_or_else(|| panic!("submitting to unregistered {surface_id}"))
            .queue_frame(frame, draw_callback);

        let old_refs = old_frame
            .as_ref()
            .map(|f| f.metadata.referenced_surfaces.clone())
            .unwrap_or_default();
        manager.update_frame_references(surface_id, &old_refs, &new_refs);

        if let Some(callback) = old_callback {
            callback(DrawStatus::DrawSkipped);
        }
        if let Some(old_frame) = old_frame {
            let returned = self
                .holder
                .borrow_mut()
                .unref_resources(&old_frame.resource_ids());
            if !returned.is_empty() {
                self.client.borrow_mut().return_resources(returned);
            }
        }

        manager.surface_modified(surface_id);
    }

    /// Attaches a pixel-readback request to the surface, serviced on the
    /// next aggregation pass, and announces the damage so one is scheduled.
    ///
    /// # Panics
    /// Panics if this factory did not create `local_frame_id`.
    pub fn request_copy_of_surface(
        &mut self,
        manager: &mut SurfaceManager,
        local_frame_id: LocalFrameId,
        request: CopyOutputRequest,
    ) {
        assert!(
            self.owned_surfaces.contains(&local_frame_id),
            "copy request for {local_frame_id} this factory never created"
        );
        let surface_id = self.surface_id(local_frame_id);
        manager
            .get_surface_mut(surface_id)
            .unwrap_or_else(|| panic!("copy request for unregistered {surface_id}"))
            .request_copy_of_output(request);
        manager.surface_modified(surface_id);
    }
}
