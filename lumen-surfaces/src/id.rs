//! Identifier value types for frame producers and frame instances.
//!
//! A [`FrameSinkId`] names an endpoint that can produce frames. A
//! [`LocalFrameId`] names one frame generation within that endpoint, and a
//! [`SurfaceId`] is the globally unique combination of the two. The nonce
//! inside a `LocalFrameId` makes surface ids unguessable, so ids issued on
//! behalf of different clients can never collide even when the clients pick
//! their own local counters.

use std::fmt;
use uuid::Uuid;

/// Identifies a frame producer: a pair of (client id, sink id).
///
/// Immutable once issued. The client id names the producing client, the
/// sink id distinguishes multiple sinks owned by one client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameSinkId {
    client_id: u32,
    sink_id: u32,
}

impl FrameSinkId {
    /// Creates a new frame sink id.
    pub const fn new(client_id: u32, sink_id: u32) -> Self {
        FrameSinkId { client_id, sink_id }
    }

    /// The producing client's id.
    pub fn client_id(&self) -> u32 {
        self.client_id
    }

    /// The sink index within the client.
    pub fn sink_id(&self) -> u32 {
        self.sink_id
    }
}

impl fmt::Display for FrameSinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameSinkId({}, {})", self.client_id, self.sink_id)
    }
}

/// Identifies one frame generation within a [`FrameSinkId`].
///
/// The pair of a monotonic counter and an unguessable nonce. Counters are
/// never reused within an allocator; nonces are fresh per id, so a
/// `LocalFrameId` is never reissued for the lifetime of the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalFrameId {
    local_id: u64,
    nonce: Uuid,
}

impl LocalFrameId {
    /// Creates a local frame id from its parts.
    pub const fn new(local_id: u64, nonce: Uuid) -> Self {
        LocalFrameId { local_id, nonce }
    }

    /// The monotonic counter component.
    pub fn local_id(&self) -> u64 {
        self.local_id
    }

    /// The unguessable nonce component.
    pub fn nonce(&self) -> Uuid {
        self.nonce
    }

    /// A valid id has a nonzero counter; the zero counter is reserved for
    /// sentinel ids such as the registry root.
    pub fn is_valid(&self) -> bool {
        self.local_id != 0
    }
}

impl fmt::Display for LocalFrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalFrameId({}, {})", self.local_id, self.nonce)
    }
}

/// A specific frame instance from a specific producer.
///
/// Globally unique for the lifetime of the system; see [`LocalFrameId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId {
    frame_sink_id: FrameSinkId,
    local_frame_id: LocalFrameId,
}

impl SurfaceId {
    /// Creates a surface id from its parts.
    pub const fn new(frame_sink_id: FrameSinkId, local_frame_id: LocalFrameId) -> Self {
        SurfaceId {
            frame_sink_id,
            local_frame_id,
        }
    }

    /// The producing frame sink.
    pub fn frame_sink_id(&self) -> FrameSinkId {
        self.frame_sink_id
    }

    /// The frame generation within the sink.
    pub fn local_frame_id(&self) -> LocalFrameId {
        self.local_frame_id
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceId({}, {})", self.frame_sink_id, self.local_frame_id)
    }
}

/// A destruction dependency: a sequence number issued on behalf of a frame
/// sink that must be satisfied (or the sink invalidated) before a surface
/// holding it may be garbage-collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceSequence {
    /// The frame sink the sequence was issued on behalf of.
    pub frame_sink_id: FrameSinkId,
    /// The sequence number within that sink.
    pub sequence: u32,
}

impl SurfaceSequence {
    /// Creates a surface sequence.
    pub const fn new(frame_sink_id: FrameSinkId, sequence: u32) -> Self {
        SurfaceSequence {
            frame_sink_id,
            sequence,
        }
    }
}
