//! # Lumen Surfaces
//!
//! This crate forms the surface-management core of the Lumen compositor.
//! It includes management of:
//! - Identifiers ([`id`]): frame sinks, local frame ids, surface ids, and
//!   destruction-dependency sequences.
//! - Surfaces ([`surface`]): one versioned instance of content produced by
//!   a frame sink, its current frame, copy requests, and destruction
//!   dependencies.
//! - The registry ([`manager`]): the surface map, the frame-sink hierarchy,
//!   begin-frame-source routing, reference counting, and garbage
//!   collection.
//! - Frame production ([`factory`]): the per-producer façade that creates
//!   surfaces, submits frames into them, and shepherds resource returns.
//!
//! The registry is a single-owner object: every handle it stores is an
//! `Rc`, so a [`manager::SurfaceManager`] cannot be sent across threads and
//! all mutation goes through `&mut`. Callers on other threads hand work to
//! the owning thread themselves.

pub mod allocator;
pub mod begin_frame;
pub mod client;
pub mod factory;
pub mod frame;
pub mod id;
pub mod manager;
pub mod resources;
pub mod surface;

pub use allocator::SurfaceIdAllocator;
pub use begin_frame::{BeginFrameArgs, BeginFrameObserver, BeginFrameSource, BeginFrameSourceHandle, ManualBeginFrameSource};
pub use client::{SurfaceFactoryClient, SurfaceFactoryClientHandle, SurfaceObserver};
pub use factory::SurfaceFactory;
pub use frame::{CompositorFrame, DrawQuad, FrameMetadata, RenderPass, RenderPassId};
pub use id::{FrameSinkId, LocalFrameId, SurfaceId, SurfaceSequence};
pub use manager::{HierarchyError, SurfaceManager};
pub use resources::{ResourceFlags, ResourceId, ReturnedResource, SurfaceResourceHolder, TransferableResource};
pub use surface::{CopyOutputRequest, CopyOutputResult, DrawCallback, DrawStatus, Surface};
