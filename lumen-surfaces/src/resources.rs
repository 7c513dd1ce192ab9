//! Resource-return bookkeeping between a frame producer and its frames.
//!
//! A producer transfers resources (pixel buffers, in spirit) alongside each
//! submitted frame. The [`SurfaceResourceHolder`] reference-counts every
//! resource a factory has received; once the last frame using a resource is
//! replaced or its surface torn down, the resource is handed back to the
//! producer through
//! [`crate::client::SurfaceFactoryClient::return_resources`].

use std::collections::HashMap;

use bitflags::bitflags;
use lumen_core::Size;

/// Identifies a transferred resource within one producer's namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u32);

bitflags! {
    /// Properties of a transferred resource.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResourceFlags: u8 {
        /// The resource lives in shared system memory rather than on the GPU.
        const SOFTWARE = 1 << 0;
        /// The resource may be promoted to a hardware overlay.
        const OVERLAY_CANDIDATE = 1 << 1;
        /// The backing of the resource has been lost (e.g. context loss).
        const LOST = 1 << 2;
    }
}

/// A resource transferred from a producer alongside a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferableResource {
    /// Producer-chosen id, unique within the producer.
    pub id: ResourceId,
    /// Pixel dimensions of the backing.
    pub size: Size<u32>,
    /// Resource properties.
    pub flags: ResourceFlags,
}

impl TransferableResource {
    /// Creates a plain software resource, the common case in tests and
    /// software embedders.
    pub fn software(id: ResourceId, size: Size<u32>) -> Self {
        TransferableResource {
            id,
            size,
            flags: ResourceFlags::SOFTWARE,
        }
    }
}

/// A resource being returned to its producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnedResource {
    /// The id the producer transferred the resource under.
    pub id: ResourceId,
    /// How many times the resource had been received since it was last
    /// returned.
    pub count: u32,
    /// Whether the backing was lost while the compositor held it.
    pub lost: bool,
}

#[derive(Debug)]
struct ResourceEntry {
    resource: TransferableResource,
    refs: u32,
    receive_count: u32,
}

/// Reference counts the resources one factory has received from its
/// producer.
///
/// Each appearance of a resource in a submitted frame takes one reference;
/// replacing or discarding that frame releases it. A resource whose count
/// reaches zero is removed from the holder and reported as returnable.
#[derive(Debug, Default)]
pub struct SurfaceResourceHolder {
    entries: HashMap<ResourceId, ResourceEntry>,
}

impl SurfaceResourceHolder {
    /// Creates an empty holder.
    pub fn new() -> Self {
        SurfaceResourceHolder::default()
    }

    /// Takes one reference on every resource in `resources`, recording the
    /// resource itself on first sight.
    pub fn receive_from_child(&mut self, resources: &[TransferableResource]) {
        for resource in resources {
            let entry = self
                .entries
                .entry(resource.id)
                .or_insert_with(|| ResourceEntry {
                    resource: resource.clone(),
                    refs: 0,
                    receive_count: 0,
                });
            entry.refs += 1;
            entry.receive_count += 1;
        }
    }

    /// Releases one reference on each id in `ids`. Resources whose count
    /// reaches zero are removed and returned to the caller for delivery to
    /// the producer. Unknown ids are ignored; a producer can only be handed
    /// back what it transferred.
    pub fn unref_resources(&mut self, ids: &[ResourceId]) -> Vec<ReturnedResource> {
        let mut returned = Vec::new();
        for id in ids {
            let Some(entry) = self.entries.get_mut(id) else {
                continue;
            };
            entry.refs = entry.refs.saturating_sub(1);
            if entry.refs == 0 {
                let entry = self.entries.remove(id).expect("entry vanished during unref");
                returned.push(ReturnedResource {
                    id: *id,
                    count: entry.receive_count,
                    lost: entry.resource.flags.contains(ResourceFlags::LOST),
                });
            }
        }
        returned
    }

    /// Number of resources currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the holder currently holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
