//! Callback seams between the registry and the code embedding it.

use std::cell::RefCell;
use std::rc::Rc;

use crate::begin_frame::BeginFrameSourceHandle;
use crate::id::SurfaceId;
use crate::resources::ReturnedResource;
use lumen_core::Rect;

/// Per-frame-sink callback object bound through
/// [`crate::manager::SurfaceManager::register_surface_factory_client`].
///
/// The registry pushes begin-frame-source changes through it and the
/// factory hands freed resources back through it.
pub trait SurfaceFactoryClient {
    /// Resources no longer referenced by any live frame of this sink.
    fn return_resources(&mut self, resources: Vec<ReturnedResource>);

    /// The pacing source currently routed to this sink, or `None` when the
    /// sink has no source (e.g. its source was unregistered and no other
    /// source reaches it).
    fn set_begin_frame_source(&mut self, source: Option<BeginFrameSourceHandle>);

    /// One of this sink's surfaces is about to be drawn with the given
    /// damage.
    fn will_draw_surface(&mut self, surface_id: SurfaceId, damage_rect: Rect<i32>);
}

/// Shared handle to a factory client.
pub type SurfaceFactoryClientHandle = Rc<RefCell<dyn SurfaceFactoryClient>>;

/// Observes surface damage, e.g. to schedule a redraw.
pub trait SurfaceObserver {
    /// A surface gained new content or a copy request. Returns whether the
    /// observer scheduled work in response.
    fn on_surface_damaged(&mut self, surface_id: SurfaceId) -> bool;
}
