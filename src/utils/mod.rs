//! Utility functions and helpers
//!
//! This module contains timestamp utilities and atomic file helpers.

pub mod atomic;
pub mod time;

pub use atomic::{atomic_write, cleanup_temp_files, truncate_partial_line, truncate_to};
pub use time::current_timestamp_millis;
