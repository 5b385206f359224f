//! Shared utilities for wardend
//!
//! This crate provides:
//! - ID types (PlayerId, ClientId)
//! - Time utilities (monotonic time, minute-window helpers)
//! - Default paths for socket and data directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
