//! Baseline capture, partial merge and dirty detection for persisted entities.

pub mod absent;
pub mod tracked;

pub use absent::Absent;
pub use tracked::{ChangeTracked, Tracked};
