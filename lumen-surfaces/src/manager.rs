//! The surface registry: surface map, frame-sink hierarchy,
//! begin-frame-source routing, reference tracking, and garbage collection.
//!
//! One [`SurfaceManager`] coordinates every producer in the process. It is
//! a single-owner object: all handles it stores are `Rc`, so the manager is
//! not `Send` and every mutation goes through `&mut self`. Cross-thread
//! callers post work to the owning thread themselves.
//!
//! Failure semantics follow a trusted-coordinator model: precondition
//! violations in registration calls are programmer errors and panic.
//! The exception is the surface-reference API, which can be driven by a
//! compromised producer and therefore logs and ignores bad edits instead
//! of crashing, and hierarchy registration, which reports a would-be cycle
//! to the caller without mutating anything.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::{Rc, Weak};

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::begin_frame::BeginFrameSourceHandle;
use crate::client::{SurfaceFactoryClientHandle, SurfaceObserver};
use crate::id::{FrameSinkId, LocalFrameId, SurfaceId, SurfaceSequence};
use crate::surface::Surface;
use lumen_core::Rect;

/// The designated root of the surface reference graph. Not a real surface;
/// references from this id pin their targets for the display.
const ROOT_SURFACE_ID: SurfaceId = SurfaceId::new(
    FrameSinkId::new(0, 0),
    LocalFrameId::new(0, Uuid::nil()),
);

/// Errors reported by hierarchy registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HierarchyError {
    /// Adding the edge would make the frame-sink hierarchy cyclic.
    #[error("registering {child} under {parent} would create a cycle")]
    CycleDetected {
        parent: FrameSinkId,
        child: FrameSinkId,
    },
}

/// Per-frame-sink routing state: the bound client, the begin-frame source
/// currently reaching this sink, and the sink's children.
///
/// Entries are created lazily, so hierarchy edges can be registered before
/// the sink's client binds (and vice versa).
#[derive(Default)]
struct FrameSinkSourceMapping {
    client: Option<SurfaceFactoryClientHandle>,
    source: Option<BeginFrameSourceHandle>,
    children: Vec<FrameSinkId>,
}

impl FrameSinkSourceMapping {
    fn is_empty(&self) -> bool {
        self.client.is_none() && self.children.is_empty()
    }
}

/// The registry. See the module documentation for the ownership and
/// failure model.
#[derive(Default)]
pub struct SurfaceManager {
    surfaces: HashMap<SurfaceId, Surface>,
    /// Surfaces marked destroyed, awaiting garbage collection.
    surfaces_to_destroy: Vec<SurfaceId>,
    satisfied_sequences: HashSet<SurfaceSequence>,
    valid_frame_sink_ids: HashSet<FrameSinkId>,
    /// Surface reference graph and its inverse.
    parent_to_children: HashMap<SurfaceId, HashSet<SurfaceId>>,
    child_to_parents: HashMap<SurfaceId, HashSet<SurfaceId>>,
    /// Frame-sink hierarchy and begin-frame routing state.
    registry: HashMap<FrameSinkId, FrameSinkSourceMapping>,
    /// Registered sources in registration order; re-propagation preserves
    /// this order, which is what makes first-registered-wins stable.
    registered_sources: Vec<(BeginFrameSourceHandle, FrameSinkId)>,
    observers: Vec<Weak<RefCell<dyn SurfaceObserver>>>,
}

impl SurfaceManager {
    /// Creates an empty registry.
    pub fn new() -> Self {
        SurfaceManager::default()
    }

    /// The designated root id of the reference graph. Valid as the parent
    /// of [`SurfaceManager::add_surface_reference`] without being a
    /// registered surface.
    pub fn root_surface_id(&self) -> SurfaceId {
        ROOT_SURFACE_ID
    }

    // --- Frame sink validity -------------------------------------------------

    /// Marks `frame_sink_id` valid. Must precede any surface, hierarchy
    /// edge, or begin-frame-source registration naming it.
    ///
    /// # Panics
    /// Panics if the id is already registered.
    pub fn register_frame_sink_id(&mut self, frame_sink_id: FrameSinkId) {
        assert!(
            self.valid_frame_sink_ids.insert(frame_sink_id),
            "{frame_sink_id} registered twice"
        );
    }

    /// Removes `frame_sink_id` from the valid set. Destruction dependencies
    /// keyed on it become satisfied, and garbage collection runs.
    ///
    /// # Panics
    /// Panics if the id was not registered.
    pub fn invalidate_frame_sink_id(&mut self, frame_sink_id: FrameSinkId) {
        assert!(
            self.valid_frame_sink_ids.remove(&frame_sink_id),
            "invalidating unregistered {frame_sink_id}"
        );
        self.garbage_collect_surfaces();
    }

    /// Whether `frame_sink_id` is currently valid.
    pub fn is_valid_frame_sink_id(&self, frame_sink_id: FrameSinkId) -> bool {
        self.valid_frame_sink_ids.contains(&frame_sink_id)
    }

    // --- Surface map ---------------------------------------------------------

    /// Inserts a surface into the registry, which owns it from here on.
    ///
    /// # Panics
    /// Panics if the surface's frame sink is not valid or its id is already
    /// present.
    pub fn register_surface(&mut self, surface: Surface) {
        let surface_id = surface.surface_id();
        assert!(
            self.valid_frame_sink_ids
                .contains(&surface_id.frame_sink_id()),
            "registering surface under unregistered {}",
            surface_id.frame_sink_id()
        );
        let previous = self.surfaces.insert(surface_id, surface);
        assert!(previous.is_none(), "{surface_id} registered twice");
    }

    /// Removes a surface from the registry immediately, dropping its
    /// reference bookkeeping in both directions, then re-collects.
    ///
    /// # Panics
    /// Panics if the surface is unknown.
    pub fn deregister_surface(&mut self, surface_id: SurfaceId) -> Surface {
        let surface = self.remove_surface_internal(surface_id);
        self.surfaces_to_destroy.retain(|id| *id != surface_id);
        self.garbage_collect_surfaces();
        surface
    }

    /// Marks a surface destroyed and queues it for deferred deletion.
    /// Deletion does not happen synchronously: live references or
    /// unsatisfied destruction dependencies keep the surface in the map
    /// until garbage collection proves it unreachable.
    ///
    /// # Panics
    /// Panics if the surface is unknown or already destroyed.
    pub fn destroy_surface(&mut self, surface_id: SurfaceId) {
        let surface = self
            .surfaces
            .get_mut(&surface_id)
            .unwrap_or_else(|| panic!("destroying unknown {surface_id}"));
        assert!(!surface.is_destroyed(), "{surface_id} destroyed twice");
        surface.set_destroyed(true);
        self.surfaces_to_destroy.push(surface_id);
        self.garbage_collect_surfaces();
    }

    /// Looks up a surface.
    pub fn get_surface(&self, surface_id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(&surface_id)
    }

    /// Looks up a surface mutably.
    pub fn get_surface_mut(&mut self, surface_id: SurfaceId) -> Option<&mut Surface> {
        self.surfaces.get_mut(&surface_id)
    }

    /// Number of live surfaces in the map, destroyed-but-uncollected ones
    /// included.
    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Records that `sequence` has been satisfied, then re-collects.
    pub fn satisfy_sequence(&mut self, sequence: SurfaceSequence) {
        self.satisfied_sequences.insert(sequence);
        self.garbage_collect_surfaces();
    }

    // --- Surface references --------------------------------------------------

    /// Adds a reference from `parent_id` to `child_id`.
    ///
    /// This path can be driven by untrusted producers, so invalid input is
    /// logged and ignored rather than asserted: the parent must be a
    /// registered surface or the designated root, the child must be a
    /// registered surface, and self-references are dropped.
    pub fn add_surface_reference(&mut self, parent_id: SurfaceId, child_id: SurfaceId) {
        if parent_id == child_id {
            warn!(%parent_id, "ignoring self-reference");
            return;
        }
        if parent_id != ROOT_SURFACE_ID && !self.surfaces.contains_key(&parent_id) {
            warn!(%parent_id, %child_id, "ignoring reference from unknown surface");
            return;
        }
        if !self.surfaces.contains_key(&child_id) {
            warn!(%parent_id, %child_id, "ignoring reference to unknown surface");
            return;
        }
        self.parent_to_children
            .entry(parent_id)
            .or_default()
            .insert(child_id);
        self.child_to_parents
            .entry(child_id)
            .or_default()
            .insert(parent_id);
    }

    /// Removes the reference from `parent_id` to `child_id`. Once a child's
    /// last inbound reference is gone, its own outbound references are
    /// recursively dropped so orphaned subtrees cannot pin each other, then
    /// garbage collection runs.
    ///
    /// Unknown edges are logged and ignored, mirroring
    /// [`SurfaceManager::add_surface_reference`].
    pub fn remove_surface_reference(&mut self, parent_id: SurfaceId, child_id: SurfaceId) {
        let edge_exists = self
            .parent_to_children
            .get(&parent_id)
            .map_or(false, |children| children.contains(&child_id));
        if !edge_exists {
            warn!(%parent_id, %child_id, "ignoring removal of unknown reference");
            return;
        }
        self.remove_reference_cascade(parent_id, child_id);
        self.garbage_collect_surfaces();
    }

    fn remove_reference_cascade(&mut self, parent_id: SurfaceId, child_id: SurfaceId) {
        if let Some(children) = self.parent_to_children.get_mut(&parent_id) {
            children.remove(&child_id);
            if children.is_empty() {
                self.parent_to_children.remove(&parent_id);
            }
        }
        let child_orphaned = match self.child_to_parents.get_mut(&child_id) {
            Some(parents) => {
                parents.remove(&parent_id);
                if parents.is_empty() {
                    self.child_to_parents.remove(&child_id);
                    true
                } else {
                    false
                }
            }
            None => true,
        };

        if child_orphaned {
            let grandchildren: Vec<SurfaceId> = self
                .parent_to_children
                .get(&child_id)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default();
            for grandchild in grandchildren {
                self.remove_reference_cascade(child_id, grandchild);
            }
        }
    }

    /// Inbound reference count of `surface_id`.
    pub fn surface_reference_count(&self, surface_id: SurfaceId) -> usize {
        self.child_to_parents
            .get(&surface_id)
            .map_or(0, |parents| parents.len())
    }

    /// Reconciles the reference graph with a newly submitted frame's
    /// referenced-surface list.
    pub(crate) fn update_frame_references(
        &mut self,
        surface_id: SurfaceId,
        old_refs: &[SurfaceId],
        new_refs: &[SurfaceId],
    ) {
        for old in old_refs {
            if !new_refs.contains(old) {
                self.remove_surface_reference(surface_id, *old);
            }
        }
        for new in new_refs {
            if !old_refs.contains(new) {
                self.add_surface_reference(surface_id, *new);
            }
        }
    }

    // --- Garbage collection --------------------------------------------------

    /// Deletes every queued-for-destroy surface that is unreachable.
    ///
    /// Every surface's destruction dependencies are settled first (consuming
    /// satisfied sequences, dropping dependencies on invalidated sinks).
    /// Mark phase: roots are surfaces that are not destroyed, have
    /// unsatisfied destruction dependencies, or are referenced by the
    /// designated root id; reachability then flows breadth-first along the
    /// reference graph, so a reachable surface survives even when its own
    /// direct reference count is zero and a cycle of destroyed surfaces
    /// does not pin itself alive. Sweep phase: unmarked queued surfaces are
    /// deregistered and dropped. Synchronous and deterministic given the
    /// current graph; re-run after every mutation that can reduce
    /// reachability.
    pub fn garbage_collect_surfaces(&mut self) {
        for surface in self.surfaces.values_mut() {
            surface.satisfy_destruction_dependencies(
                &mut self.satisfied_sequences,
                &self.valid_frame_sink_ids,
            );
        }

        let live = self.mark_reachable_surfaces();
        let pending: Vec<SurfaceId> = self.surfaces_to_destroy.clone();
        for surface_id in pending {
            if live.contains(&surface_id) {
                continue;
            }
            self.surfaces_to_destroy.retain(|id| *id != surface_id);
            let mut surface = self.remove_surface_internal(surface_id);
            surface.clear_for_teardown();
        }
    }

    fn mark_reachable_surfaces(&self) -> HashSet<SurfaceId> {
        let mut live = HashSet::new();
        let mut queue: VecDeque<SurfaceId> = VecDeque::new();

        for (surface_id, surface) in &self.surfaces {
            if !surface.is_destroyed() || surface.has_unsatisfied_dependencies() {
                queue.push_back(*surface_id);
            }
        }
        // References held by the designated root pin their targets the way
        // a live surface would.
        if let Some(children) = self.parent_to_children.get(&ROOT_SURFACE_ID) {
            queue.extend(children.iter().copied());
        }

        while let Some(surface_id) = queue.pop_front() {
            if !live.insert(surface_id) {
                continue;
            }
            if let Some(children) = self.parent_to_children.get(&surface_id) {
                for child in children {
                    if !live.contains(child) {
                        queue.push_back(*child);
                    }
                }
            }
        }
        live
    }

    fn remove_surface_internal(&mut self, surface_id: SurfaceId) -> Surface {
        let surface = self
            .surfaces
            .remove(&surface_id)
            .unwrap_or_else(|| panic!("deregistering unknown {surface_id}"));

        if let Some(children) = self.parent_to_children.remove(&surface_id) {
            for child in children {
                if let Some(parents) = self.child_to_parents.get_mut(&child) {
                    parents.remove(&surface_id);
                    if parents.is_empty() {
                        self.child_to_parents.remove(&child);
                    }
                }
            }
        }
        if let Some(parents) = self.child_to_parents.remove(&surface_id) {
            for parent in parents {
                if let Some(children) = self.parent_to_children.get_mut(&parent) {
                    children.remove(&surface_id);
                    if children.is_empty() {
                        self.parent_to_children.remove(&parent);
                    }
                }
            }
        }
        surface
    }

    // --- Damage observers ----------------------------------------------------

    /// Registers a damage observer. The registry holds it weakly.
    pub fn add_observer(&mut self, observer: &Rc<RefCell<dyn SurfaceObserver>>) {
        self.observers.push(Rc::downgrade(observer));
    }

    /// Removes a previously registered observer.
    pub fn remove_observer(&mut self, observer: &Rc<RefCell<dyn SurfaceObserver>>) {
        self.observers
            .retain(|weak| weak.upgrade().map_or(false, |o| !Rc::ptr_eq(&o, observer)));
    }

    /// Announces that `surface_id` gained new content or a copy request.
    /// Returns whether any observer scheduled work in response.
    pub fn surface_modified(&mut self, surface_id: SurfaceId) -> bool {
        let mut scheduled = false;
        self.observers.retain(|weak| match weak.upgrade() {
            Some(observer) => {
                scheduled |= observer.borrow_mut().on_surface_damaged(surface_id);
                true
            }
            None => false,
        });
        scheduled
    }

    /// Routes an about-to-draw notification to the client bound for the
    /// surface's frame sink, if one is registered.
    pub fn will_draw_surface(&self, surface_id: SurfaceId, damage_rect: Rect<i32>) {
        if let Some(client) = self
            .registry
            .get(&surface_id.frame_sink_id())
            .and_then(|mapping| mapping.client.clone())
        {
            client.borrow_mut().will_draw_surface(surface_id, damage_rect);
        }
    }

    // --- Frame sink clients --------------------------------------------------

    /// Binds the callback object for `frame_sink_id`. If a begin-frame
    /// source already reaches this sink, the client learns it immediately,
    /// so client and hierarchy registration order does not matter.
    ///
    /// # Panics
    /// Panics if the sink is not valid or already has a client.
    pub fn register_surface_factory_client(
        &mut self,
        frame_sink_id: FrameSinkId,
        client: SurfaceFactoryClientHandle,
    ) {
        assert!(
            self.valid_frame_sink_ids.contains(&frame_sink_id),
            "binding client to unregistered {frame_sink_id}"
        );
        let mapping = self.registry.entry(frame_sink_id).or_default();
        assert!(
            mapping.client.is_none(),
            "{frame_sink_id} already has a client"
        );
        mapping.client = Some(client.clone());
        if let Some(source) = mapping.source.clone() {
            client.borrow_mut().set_begin_frame_source(Some(source));
        }
    }

    /// Unbinds the callback object for `frame_sink_id`, telling it first
    /// that it no longer has a begin-frame source.
    ///
    /// # Panics
    /// Panics if no client is bound for the sink.
    pub fn unregister_surface_factory_client(&mut self, frame_sink_id: FrameSinkId) {
        let mapping = self
            .registry
            .get_mut(&frame_sink_id)
            .unwrap_or_else(|| panic!("unbinding client of unknown {frame_sink_id}"));
        let client = mapping
            .client
            .take()
            .unwrap_or_else(|| panic!("{frame_sink_id} has no bound client"));
        if mapping.source.is_some() {
            client.borrow_mut().set_begin_frame_source(None);
        }
        if mapping.is_empty() {
            self.registry.remove(&frame_sink_id);
        }
    }

    // --- Begin-frame sources -------------------------------------------------

    /// Attaches a pacing source to the subtree rooted at `frame_sink_id`.
    /// Within the subtree the first-registered source wins: nodes that
    /// already have a source keep it.
    ///
    /// # Panics
    /// Panics if the source is already registered or the sink is not valid.
    pub fn register_begin_frame_source(
        &mut self,
        source: BeginFrameSourceHandle,
        frame_sink_id: FrameSinkId,
    ) {
        assert!(
            !self
                .registered_sources
                .iter()
                .any(|(registered, _)| Rc::ptr_eq(registered, &source)),
            "begin-frame source registered twice"
        );
        assert!(
            self.valid_frame_sink_ids.contains(&frame_sink_id),
            "attaching source to unregistered {frame_sink_id}"
        );
        self.registered_sources.push((source.clone(), frame_sink_id));
        self.recursively_attach_begin_frame_source(frame_sink_id, &source);
    }

    /// Detaches a pacing source. Exactly the nodes carrying this source are
    /// cleared, then every other registered source is re-propagated from
    /// scratch to patch subtrees the removal orphaned.
    ///
    /// # Panics
    /// Panics if the source was not registered.
    pub fn unregister_begin_frame_source(&mut self, source: &BeginFrameSourceHandle) {
        let index = self
            .registered_sources
            .iter()
            .position(|(registered, _)| Rc::ptr_eq(registered, source))
            .expect("unregistering unknown begin-frame source");
        let (_, frame_sink_id) = self.registered_sources.remove(index);

        // No routing entry means nothing carries this source anymore.
        if !self.registry.contains_key(&frame_sink_id) {
            return;
        }
        self.recursively_detach_begin_frame_source(frame_sink_id, source);
        self.reattach_all_begin_frame_sources();
    }

    fn reattach_all_begin_frame_sources(&mut self) {
        let sources = self.registered_sources.clone();
        for (source, frame_sink_id) in sources {
            self.recursively_attach_begin_frame_source(frame_sink_id, &source);
        }
    }

    fn recursively_attach_begin_frame_source(
        &mut self,
        frame_sink_id: FrameSinkId,
        source: &BeginFrameSourceHandle,
    ) {
        let mapping = self.registry.entry(frame_sink_id).or_default();
        if mapping.source.is_none() {
            mapping.source = Some(source.clone());
            if let Some(client) = mapping.client.clone() {
                client
                    .borrow_mut()
                    .set_begin_frame_source(Some(source.clone()));
            }
        }
        let children = self
            .registry
            .get(&frame_sink_id)
            .map(|mapping| mapping.children.clone())
            .unwrap_or_default();
        for child in children {
            self.recursively_attach_begin_frame_source(child, source);
        }
    }

    fn recursively_detach_begin_frame_source(
        &mut self,
        frame_sink_id: FrameSinkId,
        source: &BeginFrameSourceHandle,
    ) {
        let Some(mapping) = self.registry.get_mut(&frame_sink_id) else {
            return;
        };
        if mapping
            .source
            .as_ref()
            .map_or(false, |current| Rc::ptr_eq(current, source))
        {
            mapping.source = None;
            if let Some(client) = mapping.client.clone() {
                client.borrow_mut().set_begin_frame_source(None);
            }
        }
        if mapping.is_empty() {
            self.registry.remove(&frame_sink_id);
            return;
        }
        let children = mapping.children.clone();
        for child in children {
            self.recursively_detach_begin_frame_source(child, source);
        }
    }

    // --- Frame sink hierarchy ------------------------------------------------

    /// Adds a parent→child edge to the frame-sink hierarchy and routes the
    /// parent's current source into the child's subtree.
    ///
    /// An edge that would make the hierarchy cyclic is rejected before any
    /// state is touched.
    ///
    /// # Panics
    /// Panics if either sink is not valid or the edge already exists.
    pub fn register_frame_sink_hierarchy(
        &mut self,
        parent_id: FrameSinkId,
        child_id: FrameSinkId,
    ) -> Result<(), HierarchyError> {
        assert!(
            self.valid_frame_sink_ids.contains(&parent_id),
            "hierarchy edge from unregistered {parent_id}"
        );
        assert!(
            self.valid_frame_sink_ids.contains(&child_id),
            "hierarchy edge to unregistered {child_id}"
        );

        if parent_id == child_id || self.subtree_contains(child_id, parent_id) {
            warn!(%parent_id, %child_id, "rejecting cyclic hierarchy edge");
            return Err(HierarchyError::CycleDetected {
                parent: parent_id,
                child: child_id,
            });
        }

        let mapping = self.registry.entry(parent_id).or_default();
        assert!(
            !mapping.children.contains(&child_id),
            "{child_id} already registered under {parent_id}"
        );
        mapping.children.push(child_id);

        if let Some(source) = mapping.source.clone() {
            self.recursively_attach_begin_frame_source(child_id, &source);
        }
        Ok(())
    }

    /// Removes a parent→child edge. If the parent's source was flowing into
    /// the child through the hierarchy it is detached from the child's
    /// subtree, after which every registered source re-propagates to patch
    /// the gap.
    ///
    /// # Panics
    /// Panics if the edge does not exist.
    pub fn unregister_frame_sink_hierarchy(
        &mut self,
        parent_id: FrameSinkId,
        child_id: FrameSinkId,
    ) {
        let mapping = self
            .registry
            .get_mut(&parent_id)
            .unwrap_or_else(|| panic!("removing hierarchy edge from unknown {parent_id}"));
        let position = mapping
            .children
            .iter()
            .position(|id| *id == child_id)
            .unwrap_or_else(|| panic!("{child_id} not registered under {parent_id}"));
        mapping.children.remove(position);
        let parent_source = mapping.source.clone();
        if mapping.is_empty() {
            self.registry.remove(&parent_id);
        }

        // A source can only have flowed into the child through this edge if
        // the parent carries one.
        let Some(source) = parent_source else {
            return;
        };
        self.recursively_detach_begin_frame_source(child_id, &source);
        self.reattach_all_begin_frame_sources();
    }

    fn subtree_contains(&self, root: FrameSinkId, search: FrameSinkId) -> bool {
        if root == search {
            return true;
        }
        let Some(mapping) = self.registry.get(&root) else {
            return false;
        };
        mapping
            .children
            .iter()
            .any(|child| self.subtree_contains(*child, search))
    }

    /// The begin-frame source currently routed to `frame_sink_id`, if any.
    pub fn begin_frame_source_for(
        &self,
        frame_sink_id: FrameSinkId,
    ) -> Option<BeginFrameSourceHandle> {
        self.registry
            .get(&frame_sink_id)
            .and_then(|mapping| mapping.source.clone())
    }
}
