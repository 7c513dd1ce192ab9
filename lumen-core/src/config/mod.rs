//! Configuration Management for Lumen Core.
//!
//! This module provides the structures and mechanisms for handling
//! configuration within the Lumen core library.
//!
//! - [`types`]: the configuration struct definitions ([`CoreConfig`] and
//!   [`LoggingConfig`]). These structs define the schema of the
//!   configuration.
//! - [`defaults`]: functions returning default values for settings that are
//!   absent from the configuration source.
//! - [`loader`]: loading and validation, centered on [`ConfigLoader`].
//!
//! Configuration is loaded from an explicit path handed in by the embedder;
//! this crate performs no directory discovery of its own.

pub mod defaults;
pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{CoreConfig, LoggingConfig};
