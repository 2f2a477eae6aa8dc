//! Manager configuration

use std::time::Duration;

/// How invalid operations are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMode {
    /// Return an error to the caller
    Strict,
    /// Log and silently do nothing
    Lenient,
}

/// Which ready controllers survive a memory-pressure pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Keep the `keep_count` most recently attached controllers
    MostRecentlyAttached,
    /// Keep the `keep_count` controllers closest to the last focus index
    /// passed to `preload_around_index`; ties go to the most recent attach
    NearestToFocus,
}

/// Configuration for a [`VideoManager`](super::VideoManager)
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Strict or lenient handling of invalid operations
    pub error_mode: ErrorMode,

    /// Failures tolerated before a video is permanently failed
    ///
    /// A video gets `max_retries + 1` factory attempts in total.
    pub max_retries: u32,

    /// Live controller count above which eviction runs automatically
    pub max_live_controllers: usize,

    /// Controllers retained by an eviction pass
    pub keep_count: usize,

    /// Soft limit on stored entries
    pub max_entries: usize,

    /// Window radius used by `preload_around_default`
    pub default_preload_range: usize,

    /// Seek offset for thumbnail-only controllers
    pub thumbnail_seek_offset: Duration,

    /// Eviction ranking
    pub eviction_policy: EvictionPolicy,

    /// Capacity of the change-notification channel
    pub notify_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Lenient,
            max_retries: 2,
            max_live_controllers: 3,
            keep_count: 2,
            max_entries: 200,
            default_preload_range: 2,
            thumbnail_seek_offset: Duration::from_millis(500),
            eviction_policy: EvictionPolicy::MostRecentlyAttached,
            notify_capacity: 16,
        }
    }
}

impl ManagerConfig {
    /// Strict-mode config with defaults otherwise
    pub fn strict() -> Self {
        Self::default().error_mode(ErrorMode::Strict)
    }

    /// Set the error mode
    pub fn error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Set the retry budget
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the automatic eviction threshold
    pub fn max_live_controllers(mut self, max: usize) -> Self {
        self.max_live_controllers = max;
        self
    }

    /// Set how many controllers an eviction pass keeps
    pub fn keep_count(mut self, count: usize) -> Self {
        self.keep_count = count;
        self
    }

    /// Set the entry soft limit
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Set the default preload window radius
    pub fn default_preload_range(mut self, range: usize) -> Self {
        self.default_preload_range = range;
        self
    }

    /// Set the thumbnail seek offset
    pub fn thumbnail_seek_offset(mut self, offset: Duration) -> Self {
        self.thumbnail_seek_offset = offset;
        self
    }

    /// Set the eviction policy
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = policy;
        self
    }

    /// Set the notification channel capacity (minimum 1)
    pub fn notify_capacity(mut self, capacity: usize) -> Self {
        self.notify_capacity = capacity.max(1);
        self
    }

    /// Keep count actually applied, capped by the eviction threshold
    pub fn effective_keep_count(&self) -> usize {
        self.keep_count.min(self.max_live_controllers)
    }

    pub(crate) fn is_strict(&self) -> bool {
        self.error_mode == ErrorMode::Strict
    }
}
