//! # domains
//!
//! The central domain logic and interface definitions for corkboard: the
//! on-disk document models, the storage port traits, and the shared error
//! type.

pub mod error;
pub mod models;
pub mod ports;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use ports::*;
