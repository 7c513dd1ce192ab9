//! Allocation of [`LocalFrameId`]s for one producer.

use crate::id::{FrameSinkId, LocalFrameId, SurfaceId};
use uuid::Uuid;

/// Produces a stream of [`LocalFrameId`]s unique within one producer's
/// namespace.
///
/// The counter starts at 1 and increments on every call; ids are never
/// reused, even after the allocator is destroyed, because every id carries a
/// fresh random nonce. The allocator is a pure generator with no error
/// conditions; it is not thread-safe, the caller serializes access.
#[derive(Debug)]
pub struct SurfaceIdAllocator {
    frame_sink_id: FrameSinkId,
    next_local_id: u64,
}

impl SurfaceIdAllocator {
    /// Creates an allocator for the given frame sink.
    pub fn new(frame_sink_id: FrameSinkId) -> Self {
        SurfaceIdAllocator {
            frame_sink_id,
            next_local_id: 1,
        }
    }

    /// The frame sink this allocator issues ids for.
    pub fn frame_sink_id(&self) -> FrameSinkId {
        self.frame_sink_id
    }

    /// Generates the next local frame id.
    pub fn generate_id(&mut self) -> LocalFrameId {
        let id = LocalFrameId::new(self.next_local_id, Uuid::new_v4());
        self.next_local_id += 1;
        id
    }

    /// Convenience wrapper pairing the next local id with the allocator's
    /// frame sink.
    pub fn generate_surface_id(&mut self) -> SurfaceId {
        SurfaceId::new(self.frame_sink_id, self.generate_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_counters_start_at_one_and_strictly_increase() {
        let mut allocator = SurfaceIdAllocator::new(FrameSinkId::new(1, 0));
        let first = allocator.generate_id();
        assert_eq!(first.local_id(), 1);

        let mut previous = first.local_id();
        for _ in 0..16 {
            let next = allocator.generate_id();
            assert!(next.local_id() > previous);
            previous = next.local_id();
        }
    }

    #[test]
    fn test_generated_ids_are_pairwise_distinct() {
        let mut allocator = SurfaceIdAllocator::new(FrameSinkId::new(1, 0));
        let mut ids = HashSet::new();
        let mut nonces = HashSet::new();
        for _ in 0..64 {
            let id = allocator.generate_id();
            assert!(ids.insert(id), "local frame id reissued");
            assert!(nonces.insert(id.nonce()), "nonce reissued");
        }
    }

    #[test]
    fn test_two_allocators_never_collide() {
        let mut a = SurfaceIdAllocator::new(FrameSinkId::new(1, 0));
        let mut b = SurfaceIdAllocator::new(FrameSinkId::new(1, 0));
        // Same sink, same counters, but nonces keep the ids distinct.
        assert_ne!(a.generate_id(), b.generate_id());
    }

    #[test]
    fn test_generate_surface_id_uses_own_sink() {
        let sink = FrameSinkId::new(4, 2);
        let mut allocator = SurfaceIdAllocator::new(sink);
        let surface_id = allocator.generate_surface_id();
        assert_eq!(surface_id.frame_sink_id(), sink);
        assert_eq!(surface_id.local_frame_id().local_id(), 1);
    }
}
