//! Diagnostics for the video manager

pub mod metrics;

pub use metrics::{DebugSnapshot, OperationCounters, OperationStats};
