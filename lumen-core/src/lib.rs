//! # Lumen Core
//!
//! Foundation layer for the Lumen compositor. This crate carries the
//! infrastructure the higher layers lean on:
//! - Error types ([`error`]): layered `thiserror` enums for configuration,
//!   logging, and general core failures.
//! - Configuration ([`config`]): TOML-backed configuration structures with
//!   defaults and an explicit loader.
//! - Logging ([`logging`]): `tracing`-based setup with console output and
//!   optional file logging.
//! - Geometric primitives ([`types::geometry`]): points, sizes, and
//!   rectangles used for output rects, damage, and quad geometry.
//!
//! Nothing in this crate knows about surfaces or displays; it exists so the
//! surface registry and display layers share one set of foundations.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;
pub mod utils;

pub use config::{ConfigLoader, CoreConfig, LoggingConfig};
pub use error::{ConfigError, CoreError, LoggingError};
pub use types::geometry::{Point, Rect, Size};
