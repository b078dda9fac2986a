//! Core types and constants shared across kodbank crates.
//!
//! This crate provides:
//! - Default configuration values
//! - The [`Clock`] abstraction used for every expiry decision
//! - Common project metadata

pub mod clock;
pub mod defaults;

// Re-export commonly used items at crate root
pub use clock::{Clock, ManualClock, SystemClock, expires_after};
pub use defaults::*;

/// Project name.
pub const PROJECT_NAME: &str = "kodbank";
/// Project version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
