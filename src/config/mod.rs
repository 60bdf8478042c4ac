//! Configuration module for md-annotate
//!
//! Highlighting preferences, their JSON serialization, and persistent
//! storage in platform-specific directories.

mod persistence;
mod settings;

pub use persistence::*;
pub use settings::*;
