//! # Lumen Display
//!
//! The consumer side of the surface registry: a [`display::Display`] owns
//! the draw/swap cycle for one root surface. On each scheduled draw it asks
//! the [`aggregator::SurfaceAggregator`] to flatten the tree of referenced
//! surfaces into a single render-pass list, hands the result to an
//! [`output::OutputSurface`], and swaps. Pacing comes from a begin-frame
//! source registered with the surface manager; damage arrives through the
//! manager's observer fan-out into the [`scheduler::DisplayScheduler`].

pub mod aggregator;
pub mod display;
pub mod output;
pub mod scheduler;

pub use aggregator::{AggregatedFrame, SurfaceAggregator};
pub use display::{Display, DisplayError, DisplayState};
pub use output::{DisplayClient, OutputSurface, OutputSurfaceError, SoftwareOutputSurface};
pub use scheduler::{DisplayScheduler, DisplaySchedulerConfig};
