//! Operation counters and debug snapshots for the video manager

use std::sync::atomic::{AtomicU64, Ordering};

use crate::manager::ManagerConfig;

/// Monotonic per-operation counters
///
/// Updated with relaxed atomics; values are diagnostics, not synchronization.
#[derive(Debug, Default)]
pub struct OperationCounters {
    pub(crate) ingested: AtomicU64,
    pub(crate) duplicates_rejected: AtomicU64,
    pub(crate) invalid_rejected: AtomicU64,
    pub(crate) preload_requests: AtomicU64,
    pub(crate) preload_skipped: AtomicU64,
    pub(crate) factory_calls: AtomicU64,
    pub(crate) ready: AtomicU64,
    pub(crate) failures: AtomicU64,
    pub(crate) not_applicable: AtomicU64,
    pub(crate) stale_completions: AtomicU64,
    pub(crate) evictions: AtomicU64,
    pub(crate) memory_pressure_runs: AtomicU64,
    pub(crate) disposals: AtomicU64,
    pub(crate) resets: AtomicU64,
    pub(crate) removals: AtomicU64,
    pub(crate) pruned: AtomicU64,
    pub(crate) controls: AtomicU64,
    pub(crate) rejected_operations: AtomicU64,
    pub(crate) notifications: AtomicU64,
    pub(crate) snapshot_calls: AtomicU64,
}

pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn add(counter: &AtomicU64, n: u64) {
    counter.fetch_add(n, Ordering::Relaxed);
}

impl OperationCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the current values
    pub fn load(&self) -> OperationStats {
        let get = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        OperationStats {
            ingested: get(&self.ingested),
            duplicates_rejected: get(&self.duplicates_rejected),
            invalid_rejected: get(&self.invalid_rejected),
            preload_requests: get(&self.preload_requests),
            preload_skipped: get(&self.preload_skipped),
            factory_calls: get(&self.factory_calls),
            ready: get(&self.ready),
            failures: get(&self.failures),
            not_applicable: get(&self.not_applicable),
            stale_completions: get(&self.stale_completions),
            evictions: get(&self.evictions),
            memory_pressure_runs: get(&self.memory_pressure_runs),
            disposals: get(&self.disposals),
            resets: get(&self.resets),
            removals: get(&self.removals),
            pruned: get(&self.pruned),
            controls: get(&self.controls),
            rejected_operations: get(&self.rejected_operations),
            notifications: get(&self.notifications),
            snapshot_calls: get(&self.snapshot_calls),
        }
    }
}

/// Point-in-time copy of [`OperationCounters`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationStats {
    /// Entries accepted by `ingest`
    pub ingested: u64,
    /// Ingests dropped because the id already existed
    pub duplicates_rejected: u64,
    /// Ingests dropped because the id was empty or malformed
    pub invalid_rejected: u64,
    /// `preload` and `preload_thumbnail` calls, including window preloads
    pub preload_requests: u64,
    /// Preload calls that were no-ops (ready, loading, blacklisted, ...)
    pub preload_skipped: u64,
    /// Factory calls issued
    pub factory_calls: u64,
    /// `Loading → Ready` transitions
    pub ready: u64,
    /// `Loading → Failed` transitions, plus completions for removed entries
    pub failures: u64,
    /// Factory calls that reported the mode as not applicable
    pub not_applicable: u64,
    /// Completions discarded because the attempt was no longer current
    pub stale_completions: u64,
    /// Controllers disposed by eviction
    pub evictions: u64,
    /// Memory-pressure passes, automatic or explicit
    pub memory_pressure_runs: u64,
    /// Explicit per-video disposals
    pub disposals: u64,
    /// `reset` calls that replaced a state
    pub resets: u64,
    /// Explicit entry removals
    pub removals: u64,
    /// Entries dropped by the soft entry limit
    pub pruned: u64,
    /// Playback control calls
    pub controls: u64,
    /// Invalid operations, in either error mode
    pub rejected_operations: u64,
    /// Change notifications sent
    pub notifications: u64,
    /// `debug_snapshot` calls, including the one that produced this value
    pub snapshot_calls: u64,
}

/// Read-only view of the manager for diagnostics and tests
#[derive(Debug, Clone)]
pub struct DebugSnapshot {
    /// Entries in the store
    pub total: usize,
    /// Videos with no controller and nothing in flight
    pub not_loaded: usize,
    /// Videos with an in-flight factory call
    pub loading: usize,
    /// Videos with a controller attached
    pub ready: usize,
    /// Videos whose last attempt failed
    pub failed: usize,
    /// Disposed videos
    pub disposed: usize,
    /// Videos that exhausted their retry budget
    pub permanently_failed: usize,
    /// Last focus index passed to `preload_around_index`
    pub focus_index: Option<usize>,
    /// Whether the manager itself has been disposed
    pub manager_disposed: bool,
    /// Operation counters
    pub operations: OperationStats,
    /// Live configuration
    pub config: ManagerConfig,
}

impl DebugSnapshot {
    /// Number of live controllers
    pub fn live_controllers(&self) -> usize {
        self.ready
    }
}
