//! General-purpose utilities for the Lumen core layer.

pub mod fs;
