//! Video playback resource manager
//!
//! Turns an unbounded stream of feed entries into a small, bounded set of
//! live playback controllers while the user scrolls.
//!
//! # Architecture
//!
//! ```text
//!                         Arc<VideoManager>
//!                  ┌──────────────────────────────┐
//!   ingest() ────► │ store:  EntryStore (newest   │
//!                  │         first, deduped)      │
//!                  │ states: HashMap<VideoId,     │
//!                  │           VideoState {       │
//!                  │             lifecycle,       │
//!                  │             controller,      │
//!                  │           }>                 │
//!                  └──────┬───────────────┬───────┘
//!                         │               │
//!          preload() ─────┘               └───── handle_memory_pressure()
//!              │                                        │
//!              ▼                                        ▼
//!    tokio::spawn(factory.create)            dispose least relevant
//!              │                             controllers
//!              ▼
//!    completion: apply only if the attempt
//!    token still matches (stale → release)
//! ```
//!
//! All state lives behind one `RwLock`. The lock is never held across a
//! factory call, so the manager itself never waits on the platform.
//! Readers only ever get copies ([`VideoStateSnapshot`], [`ControllerInfo`],
//! cloned [`VideoEntry`] values).
//!
//! Every mutation that changes observable state sends a zero-payload signal
//! on the change channel; subscribers re-read what they need.

pub mod config;
pub mod controls;
pub mod error;
pub mod eviction;
pub mod scheduler;
pub mod state;

pub use config::{ErrorMode, EvictionPolicy, ManagerConfig};
pub use error::ManagerError;
pub use state::{ControllerInfo, Lifecycle, TransitionError, VideoStateSnapshot};

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinSet;

use crate::factory::ControllerFactory;
use crate::feed::{EntryStore, InsertOutcome, VideoEntry, VideoId};
use crate::stats::metrics::{add, bump};
use crate::stats::{DebugSnapshot, OperationCounters};

use state::{OwnedController, VideoState};

/// State guarded by the manager lock
struct Inner {
    store: EntryStore,
    states: HashMap<VideoId, VideoState>,
    disposed: bool,
    next_token: u64,
    next_attach_seq: u64,
    focus: Option<usize>,
    /// Failure history of permanently failed ids no longer in the store
    blacklist: HashMap<VideoId, VideoState>,
}

impl Inner {
    fn new() -> Self {
        Self {
            store: EntryStore::new(),
            states: HashMap::new(),
            disposed: false,
            next_token: 1,
            next_attach_seq: 1,
            focus: None,
            blacklist: HashMap::new(),
        }
    }

    /// Drop the state of `id`, keeping a tombstone if it is blacklisted
    ///
    /// Returns the removed state so its controller can be released outside
    /// the lock.
    fn forget(&mut self, id: &VideoId) -> Option<VideoState> {
        let state = self.states.remove(id)?;
        if state.is_permanently_failed() {
            self.blacklist.insert(id.clone(), state.tombstone());
        }
        Some(state)
    }

    /// State for a newly ingested id
    fn fresh_state(&mut self, id: &VideoId) -> VideoState {
        match self.blacklist.remove(id) {
            Some(state) => {
                tracing::debug!(video = %id, "Blacklisted id ingested again");
                state
            }
            None => VideoState::new(),
        }
    }

    fn live_controllers(&self) -> usize {
        self.states
            .values()
            .filter(|state| state.controller().is_some())
            .count()
    }

    /// Drop the oldest idle entries until the store is within `max_entries`
    ///
    /// Entries that hold a controller or have a call in flight are kept, as
    /// is `protect` (the entry that was just ingested).
    fn prune(&mut self, max_entries: usize, protect: &VideoId) -> Vec<VideoId> {
        let excess = self.store.len().saturating_sub(max_entries);
        if excess == 0 {
            return Vec::new();
        }

        let victims: Vec<VideoId> = self
            .store
            .iter_oldest()
            .filter(|id| *id != protect)
            .filter(|id| {
                self.states.get(*id).map_or(true, |state| {
                    !matches!(state.lifecycle(), Lifecycle::Ready | Lifecycle::Loading)
                })
            })
            .take(excess)
            .cloned()
            .collect();

        for id in &victims {
            self.store.remove(id);
            self.forget(id);
        }
        victims
    }
}

/// Owner of every video's state and controller
///
/// Shared as `Arc<VideoManager>`; scheduling methods take `self: &Arc<Self>`
/// because factory calls run in spawned tasks that report back to the
/// manager.
pub struct VideoManager {
    inner: RwLock<Inner>,
    factory: Arc<dyn ControllerFactory>,
    config: ManagerConfig,
    counters: OperationCounters,
    changes: broadcast::Sender<()>,
    tasks: Mutex<JoinSet<()>>,
}

impl VideoManager {
    /// Create a manager with default configuration
    pub fn new(factory: Arc<dyn ControllerFactory>) -> Self {
        Self::with_config(factory, ManagerConfig::default())
    }

    /// Create a manager with custom configuration
    pub fn with_config(factory: Arc<dyn ControllerFactory>, config: ManagerConfig) -> Self {
        let (changes, _) = broadcast::channel(config.notify_capacity.max(1));

        Self {
            inner: RwLock::new(Inner::new()),
            factory,
            config,
            counters: OperationCounters::new(),
            changes,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Get the manager configuration
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Subscribe to change notifications
    ///
    /// The signal carries no payload and is not an event log. A lagged
    /// receiver has simply missed some wakeups; re-read state either way.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }

    fn notify(&self) {
        bump(&self.counters.notifications);
        // No receivers is fine
        let _ = self.changes.send(());
    }

    /// Report an invalid operation according to the error mode
    fn reject<T: Default>(&self, err: ManagerError) -> Result<T, ManagerError> {
        bump(&self.counters.rejected_operations);
        if self.config.is_strict() {
            tracing::warn!(error = %err, "Rejected invalid operation");
            Err(err)
        } else {
            tracing::debug!(error = %err, "Ignoring invalid operation");
            Ok(T::default())
        }
    }

    /// Ingest a feed entry
    ///
    /// Returns `Ok(true)` if the entry was added. Duplicate ids (first write
    /// wins) and invalid ids are dropped with `Ok(false)`. If the store grows
    /// past the soft entry limit, idle old entries are pruned and a
    /// memory-pressure pass runs before returning.
    pub async fn ingest(&self, entry: VideoEntry) -> Result<bool, ManagerError> {
        let id = entry.id.clone();
        let released: Vec<OwnedController>;
        let pruned: Vec<VideoId>;

        {
            let mut inner = self.inner.write().await;
            if inner.disposed {
                return self.reject(ManagerError::ManagerDisposed);
            }

            match inner.store.insert(entry) {
                InsertOutcome::Inserted => {}
                InsertOutcome::Duplicate => {
                    bump(&self.counters.duplicates_rejected);
                    tracing::debug!(video = %id, "Duplicate entry ignored");
                    return Ok(false);
                }
                InsertOutcome::InvalidId => {
                    bump(&self.counters.invalid_rejected);
                    tracing::debug!(video = ?id.as_str(), "Entry with invalid id ignored");
                    return Ok(false);
                }
            }

            let state = inner.fresh_state(&id);
            inner.states.insert(id.clone(), state);
            bump(&self.counters.ingested);

            tracing::info!(video = %id, entries = inner.store.len(), "Entry ingested");

            if inner.store.len() > self.config.max_entries {
                pruned = inner.prune(self.config.max_entries, &id);
                released = self.evict_locked(&mut inner);
            } else {
                pruned = Vec::new();
                released = Vec::new();
            }
        }

        if !pruned.is_empty() {
            add(&self.counters.pruned, pruned.len() as u64);
            tracing::info!(pruned = pruned.len(), "Entry soft limit exceeded, pruned old entries");
        }
        drop(released);

        self.notify();
        Ok(true)
    }

    /// Dispose a single video's state, releasing its controller
    pub async fn dispose_video(&self, id: &VideoId) -> Result<(), ManagerError> {
        let released = {
            let mut inner = self.inner.write().await;
            if inner.disposed {
                return self.reject(ManagerError::ManagerDisposed);
            }
            let Some(state) = inner.states.get_mut(id) else {
                return self.reject(ManagerError::UnknownVideo(id.clone()));
            };
            match state.dispose() {
                Ok(controller) => controller,
                Err(err) => return self.reject(ManagerError::transition(id, err)),
            }
        };

        bump(&self.counters.disposals);
        tracing::info!(video = %id, had_controller = released.is_some(), "Video disposed");
        drop(released);

        self.notify();
        Ok(())
    }

    /// Replace a video's state with a fresh `NotLoaded` state
    ///
    /// Retry history and the permanent-failure flag carry over. Any attached
    /// controller is released and any in-flight attempt becomes stale.
    pub async fn reset(&self, id: &VideoId) -> Result<(), ManagerError> {
        let released = {
            let mut inner = self.inner.write().await;
            if inner.disposed {
                return self.reject(ManagerError::ManagerDisposed);
            }
            let Some(state) = inner.states.get_mut(id) else {
                return self.reject(ManagerError::UnknownVideo(id.clone()));
            };
            if state.lifecycle() == Lifecycle::NotLoaded {
                return Ok(());
            }

            let fresh = state.successor();
            let previous = std::mem::replace(state, fresh);
            tracing::info!(video = %id, from = %previous.lifecycle(), "Video state reset");
            previous
        };

        bump(&self.counters.resets);
        drop(released);

        self.notify();
        Ok(())
    }

    /// Remove an entry from the store
    ///
    /// The entry's controller is released. An in-flight preload for it
    /// completes as a no-op.
    pub async fn remove(&self, id: &VideoId) -> Result<Option<VideoEntry>, ManagerError> {
        let (entry, state) = {
            let mut inner = self.inner.write().await;
            if inner.disposed {
                return self.reject(ManagerError::ManagerDisposed);
            }
            let Some(entry) = inner.store.remove(id) else {
                return self.reject(ManagerError::UnknownVideo(id.clone()));
            };
            (entry, inner.forget(id))
        };

        bump(&self.counters.removals);
        tracing::info!(video = %id, "Entry removed");
        drop(state);

        self.notify();
        Ok(Some(entry))
    }

    /// Dispose the manager
    ///
    /// Every video transitions to `Disposed` and every controller is
    /// released. In-flight factory calls are not cancelled; their results
    /// are released on completion. Read accessors keep working.
    pub async fn dispose(&self) -> Result<(), ManagerError> {
        let released: Vec<OwnedController> = {
            let mut inner = self.inner.write().await;
            if inner.disposed {
                return self.reject(ManagerError::ManagerDisposed);
            }
            inner.disposed = true;

            inner
                .states
                .values_mut()
                .filter_map(|state| state.dispose().ok().flatten())
                .collect()
        };

        tracing::info!(released = released.len(), "Manager disposed");
        drop(released);

        self.notify();
        Ok(())
    }

    /// Wait for every factory call in flight to complete
    pub async fn settle(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.tasks.lock().await);
            if pending.is_empty() {
                return;
            }
            while let Some(result) = pending.join_next().await {
                if let Err(err) = result {
                    tracing::error!(error = %err, "Preload task failed");
                }
            }
        }
    }

    /// Whether the manager has been disposed
    pub async fn is_disposed(&self) -> bool {
        self.inner.read().await.disposed
    }

    /// Number of stored entries
    pub async fn len(&self) -> usize {
        self.inner.read().await.store.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.store.is_empty()
    }

    /// Copy of an entry
    pub async fn get_entry(&self, id: &VideoId) -> Option<VideoEntry> {
        self.inner.read().await.store.get(id).cloned()
    }

    /// Feed index of an entry
    pub async fn index_of(&self, id: &VideoId) -> Option<usize> {
        self.inner.read().await.store.index_of(id)
    }

    /// All entries, newest first
    pub async fn entries(&self) -> Vec<VideoEntry> {
        self.inner.read().await.store.iter().cloned().collect()
    }

    /// Copy of a video's state
    pub async fn get_state(&self, id: &VideoId) -> Option<VideoStateSnapshot> {
        self.inner
            .read()
            .await
            .states
            .get(id)
            .map(VideoState::snapshot)
    }

    /// Description of a video's attached controller
    pub async fn get_controller(&self, id: &VideoId) -> Option<ControllerInfo> {
        let inner = self.inner.read().await;
        let controller = inner.states.get(id)?.controller()?;

        Some(ControllerInfo {
            id: id.clone(),
            source: controller.kind(),
            playing: controller.get().is_playing(),
            attached_seq: controller.attached_seq(),
        })
    }

    /// Poster frame of a ready controller, if it decoded one
    pub async fn thumbnail(&self, id: &VideoId) -> Option<Bytes> {
        let inner = self.inner.read().await;
        inner.states.get(id)?.controller()?.get().thumbnail()
    }

    /// Whether a video has exhausted its retry budget
    ///
    /// Stays true after the entry is pruned or removed from the store.
    pub async fn is_permanently_failed(&self, id: &VideoId) -> bool {
        let inner = self.inner.read().await;
        inner.blacklist.contains_key(id)
            || inner
                .states
                .get(id)
                .is_some_and(VideoState::is_permanently_failed)
    }

    /// Entries with a controller attached, in feed order
    pub async fn list_ready(&self) -> Vec<VideoEntry> {
        let inner = self.inner.read().await;
        inner
            .store
            .iter()
            .filter(|entry| {
                inner
                    .states
                    .get(&entry.id)
                    .is_some_and(|state| state.lifecycle() == Lifecycle::Ready)
            })
            .cloned()
            .collect()
    }

    /// Counts, counters and configuration
    pub async fn debug_snapshot(&self) -> DebugSnapshot {
        bump(&self.counters.snapshot_calls);
        let inner = self.inner.read().await;

        let mut snapshot = DebugSnapshot {
            total: inner.store.len(),
            not_loaded: 0,
            loading: 0,
            ready: 0,
            failed: 0,
            disposed: 0,
            permanently_failed: 0,
            focus_index: inner.focus,
            manager_disposed: inner.disposed,
            operations: self.counters.load(),
            config: self.config.clone(),
        };

        for state in inner.states.values() {
            match state.lifecycle() {
                Lifecycle::NotLoaded => snapshot.not_loaded += 1,
                Lifecycle::Loading => snapshot.loading += 1,
                Lifecycle::Ready => snapshot.ready += 1,
                Lifecycle::Failed => snapshot.failed += 1,
                Lifecycle::Disposed => snapshot.disposed += 1,
            }
            if state.is_permanently_failed() {
                snapshot.permanently_failed += 1;
            }
        }

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::testing::ScriptedFactory;

    fn entry(id: &str) -> VideoEntry {
        VideoEntry::new(id, "author").url(format!("https://cdn.example/{}.mp4", id))
    }

    fn manager(config: ManagerConfig) -> (Arc<VideoManager>, ScriptedFactory) {
        let factory = ScriptedFactory::new();
        let manager = VideoManager::with_config(Arc::new(factory.clone()), config);
        (Arc::new(manager), factory)
    }

    #[tokio::test]
    async fn test_ingest_dedupes_first_write_wins() {
        let (manager, _) = manager(ManagerConfig::default());

        assert!(manager.ingest(entry("a").title("first")).await.unwrap());
        assert!(!manager.ingest(entry("a").title("second")).await.unwrap());

        assert_eq!(manager.len().await, 1);
        let stored = manager.get_entry(&VideoId::new("a")).await.unwrap();
        assert_eq!(stored.title, "first");

        let snapshot = manager.debug_snapshot().await;
        assert_eq!(snapshot.operations.ingested, 1);
        assert_eq!(snapshot.operations.duplicates_rejected, 1);
    }

    #[tokio::test]
    async fn test_ingest_invalid_id() {
        let (manager, _) = manager(ManagerConfig::strict());

        assert!(!manager.ingest(VideoEntry::new("", "author")).await.unwrap());
        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn test_ingest_creates_not_loaded_state() {
        let (manager, _) = manager(ManagerConfig::default());
        manager.ingest(entry("a")).await.unwrap();

        let state = manager.get_state(&VideoId::new("a")).await.unwrap();
        assert_eq!(state.lifecycle, Lifecycle::NotLoaded);
        assert_eq!(state.retry_count, 0);
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn test_ingest_notifies() {
        let (manager, _) = manager(ManagerConfig::default());
        let mut rx = manager.subscribe();

        manager.ingest(entry("a")).await.unwrap();
        assert_ok!(rx.try_recv());

        // Duplicates change nothing
        manager.ingest(entry("a")).await.unwrap();
        assert_err!(rx.try_recv());
    }

    #[tokio::test]
    async fn test_soft_limit_prunes_idle_entries() {
        let (manager, _) = manager(ManagerConfig::default().max_entries(3));

        for id in ["a", "b", "c", "d", "e"] {
            manager.ingest(entry(id)).await.unwrap();
        }

        assert_eq!(manager.len().await, 3);
        let ids: Vec<String> = manager
            .entries()
            .await
            .into_iter()
            .map(|entry| entry.id.to_string())
            .collect();
        assert_eq!(ids, vec!["e", "d", "c"]);
        assert!(manager.get_state(&VideoId::new("a")).await.is_none());
        assert_eq!(manager.debug_snapshot().await.operations.pruned, 2);
    }

    #[tokio::test]
    async fn test_soft_limit_keeps_ready_entries() {
        let config = ManagerConfig::default()
            .max_entries(2)
            .keep_count(3)
            .max_live_controllers(3);
        let (manager, _) = manager(config);

        manager.ingest(entry("a")).await.unwrap();
        manager.preload(&VideoId::new("a")).await.unwrap();
        manager.settle().await;

        manager.ingest(entry("b")).await.unwrap();
        manager.ingest(entry("c")).await.unwrap();

        // "a" holds a controller, so the oldest idle entry goes instead
        assert!(manager.get_entry(&VideoId::new("a")).await.is_some());
        assert!(manager.get_entry(&VideoId::new("b")).await.is_none());
        assert_eq!(manager.len().await, 2);
    }

    #[tokio::test]
    async fn test_pruned_blacklisted_id_stays_blacklisted() {
        let (manager, factory) = manager(ManagerConfig::default().max_entries(2).max_retries(0));
        let id = VideoId::new("a");
        factory.script("a", crate::testing::Script::Fail("codec".into()));
        manager.ingest(entry("a")).await.unwrap();
        manager.preload(&id).await.unwrap();
        manager.settle().await;
        assert!(manager.is_permanently_failed(&id).await);

        manager.ingest(entry("b")).await.unwrap();
        manager.ingest(entry("c")).await.unwrap();
        assert!(manager.get_state(&id).await.is_none());
        assert!(manager.is_permanently_failed(&id).await);

        // The feed delivers it again
        assert!(manager.ingest(entry("a")).await.unwrap());
        manager.preload(&id).await.unwrap();
        manager.preload_around_index(0, 1).await.unwrap();
        manager.settle().await;

        assert_eq!(factory.calls_for("a"), 1);
        let state = manager.get_state(&id).await.unwrap();
        assert_eq!(state.lifecycle, Lifecycle::Failed);
        assert!(state.permanently_failed);
        assert_eq!(state.retry_count, 1);
        assert_eq!(state.last_error.as_deref(), Some("codec"));
    }

    #[tokio::test]
    async fn test_removed_blacklisted_id_stays_blacklisted() {
        let (manager, factory) = manager(ManagerConfig::default().max_retries(0));
        let id = VideoId::new("a");
        factory.script("a", crate::testing::Script::Fail("codec".into()));
        manager.ingest(entry("a")).await.unwrap();
        manager.preload(&id).await.unwrap();
        manager.settle().await;

        manager.remove(&id).await.unwrap();
        manager.ingest(entry("a")).await.unwrap();
        manager.preload(&id).await.unwrap();
        manager.settle().await;

        assert_eq!(factory.calls_for("a"), 1);
        assert!(manager.is_permanently_failed(&id).await);
    }

    #[tokio::test]
    async fn test_removed_healthy_id_starts_fresh() {
        let (manager, factory) = manager(ManagerConfig::default());
        let id = VideoId::new("a");
        factory.script("a", crate::testing::Script::Fail("flaky".into()));
        manager.ingest(entry("a")).await.unwrap();
        manager.preload(&id).await.unwrap();
        manager.settle().await;

        manager.remove(&id).await.unwrap();
        manager.ingest(entry("a")).await.unwrap();

        let state = manager.get_state(&id).await.unwrap();
        assert_eq!(state.lifecycle, Lifecycle::NotLoaded);
        assert_eq!(state.retry_count, 0);
        assert!(!manager.is_permanently_failed(&id).await);
    }

    #[tokio::test]
    async fn test_unknown_id_strict_and_lenient() {
        let (strict, _) = manager(ManagerConfig::strict());
        let missing = VideoId::new("missing");

        assert_eq!(
            strict.dispose_video(&missing).await,
            Err(ManagerError::UnknownVideo(missing.clone()))
        );
        assert_eq!(
            strict.preload(&missing).await,
            Err(ManagerError::UnknownVideo(missing.clone()))
        );

        let (lenient, _) = manager(ManagerConfig::default());
        assert_ok!(lenient.dispose_video(&missing).await);
        assert_ok!(lenient.preload(&missing).await);
        assert_eq!(lenient.debug_snapshot().await.operations.rejected_operations, 2);
    }

    #[tokio::test]
    async fn test_dispose_video_is_terminal() {
        let (manager, factory) = manager(ManagerConfig::strict());
        let id = VideoId::new("a");
        manager.ingest(entry("a")).await.unwrap();
        manager.preload(&id).await.unwrap();
        manager.settle().await;

        manager.dispose_video(&id).await.unwrap();
        assert_eq!(factory.release_count(), 1);
        assert_eq!(
            manager.get_state(&id).await.unwrap().lifecycle,
            Lifecycle::Disposed
        );
        assert!(manager.list_ready().await.is_empty());

        let err = manager.dispose_video(&id).await.unwrap_err();
        assert!(matches!(
            err,
            ManagerError::InvalidTransition {
                from: Lifecycle::Disposed,
                ..
            }
        ));
        let err = manager.preload(&id).await.unwrap_err();
        assert!(matches!(
            err,
            ManagerError::InvalidTransition {
                to: Lifecycle::Loading,
                ..
            }
        ));
        assert_eq!(factory.calls_for("a"), 1);
    }

    #[tokio::test]
    async fn test_reset_allows_reload() {
        let (manager, factory) = manager(ManagerConfig::strict());
        let id = VideoId::new("a");
        manager.ingest(entry("a")).await.unwrap();
        manager.preload(&id).await.unwrap();
        manager.settle().await;
        manager.dispose_video(&id).await.unwrap();

        manager.reset(&id).await.unwrap();
        assert_eq!(
            manager.get_state(&id).await.unwrap().lifecycle,
            Lifecycle::NotLoaded
        );

        manager.preload(&id).await.unwrap();
        manager.settle().await;
        assert_eq!(manager.get_state(&id).await.unwrap().lifecycle, Lifecycle::Ready);
        assert_eq!(factory.calls_for("a"), 2);
    }

    #[tokio::test]
    async fn test_reset_keeps_failure_history() {
        let (manager, factory) = manager(ManagerConfig::default().max_retries(0));
        let id = VideoId::new("a");
        factory.script("a", crate::testing::Script::Fail("codec".into()));
        manager.ingest(entry("a")).await.unwrap();
        manager.preload(&id).await.unwrap();
        manager.settle().await;
        assert!(manager.is_permanently_failed(&id).await);

        manager.reset(&id).await.unwrap();
        let state = manager.get_state(&id).await.unwrap();
        assert_eq!(state.lifecycle, Lifecycle::NotLoaded);
        assert_eq!(state.retry_count, 1);
        assert!(state.permanently_failed);
    }

    #[tokio::test]
    async fn test_remove_entry() {
        let (manager, factory) = manager(ManagerConfig::default());
        let id = VideoId::new("a");
        manager.ingest(entry("a")).await.unwrap();
        manager.preload(&id).await.unwrap();
        manager.settle().await;

        let removed = manager.remove(&id).await.unwrap();
        assert_eq!(removed.map(|entry| entry.id), Some(id.clone()));
        assert!(manager.get_state(&id).await.is_none());
        assert_eq!(factory.release_count(), 1);
    }

    #[tokio::test]
    async fn test_remove_mid_flight() {
        let (manager, factory) = manager(ManagerConfig::default());
        let id = VideoId::new("a");
        let gate = factory.hold("a");
        manager.ingest(entry("a")).await.unwrap();
        manager.preload(&id).await.unwrap();

        manager.remove(&id).await.unwrap();
        gate.open();
        manager.settle().await;

        assert!(manager.get_state(&id).await.is_none());
        assert_eq!(factory.release_count(), 1);
        let operations = manager.debug_snapshot().await.operations;
        assert_eq!(operations.failures, 1);
        assert_eq!(operations.ready, 0);
    }

    #[tokio::test]
    async fn test_dispose_manager_strict() {
        let (manager, factory) = manager(ManagerConfig::strict());
        let id = VideoId::new("a");
        manager.ingest(entry("a")).await.unwrap();
        manager.preload(&id).await.unwrap();
        manager.settle().await;

        manager.dispose().await.unwrap();
        assert!(manager.is_disposed().await);
        assert_eq!(factory.release_count(), 1);

        let disposed: Result<(), ManagerError> = Err(ManagerError::ManagerDisposed);
        assert_eq!(manager.ingest(entry("b")).await, disposed.clone().map(|()| false));
        assert_eq!(manager.preload(&id).await, disposed.clone());
        assert_eq!(manager.preload_around_index(0, 2).await, disposed.clone().map(|()| 0));
        assert_eq!(manager.handle_memory_pressure().await, disposed.clone().map(|()| 0));
        assert_eq!(manager.pause(&id).await, disposed.clone());
        assert_eq!(manager.stop_all().await, disposed.clone().map(|()| 0));
        assert_eq!(manager.reset(&id).await, disposed.clone());
        assert_eq!(manager.dispose().await, disposed);

        // Reads still work
        assert_eq!(manager.get_state(&id).await.unwrap().lifecycle, Lifecycle::Disposed);
    }

    #[tokio::test]
    async fn test_dispose_manager_lenient() {
        let (manager, factory) = manager(ManagerConfig::default());
        let id = VideoId::new("a");
        manager.ingest(entry("a")).await.unwrap();
        manager.dispose().await.unwrap();

        assert_eq!(manager.ingest(entry("b")).await, Ok(false));
        assert_ok!(manager.preload(&id).await);
        assert_eq!(manager.preload_around_index(0, 5).await, Ok(0));
        assert_eq!(manager.handle_memory_pressure().await, Ok(0));
        assert_ok!(manager.resume(&id).await);
        assert_eq!(manager.pause_all().await, Ok(0));
        assert_ok!(manager.dispose().await);
        manager.settle().await;

        assert_eq!(manager.len().await, 1);
        assert_eq!(factory.call_count(), 0);
        assert_eq!(manager.get_state(&id).await.unwrap().lifecycle, Lifecycle::Disposed);
    }

    #[tokio::test]
    async fn test_debug_snapshot_counts() {
        let (manager, factory) = manager(ManagerConfig::default().max_retries(5));
        factory.script("bad", crate::testing::Script::Fail("404".into()));
        for id in ["ok", "bad", "idle"] {
            manager.ingest(entry(id)).await.unwrap();
        }
        manager.preload(&VideoId::new("ok")).await.unwrap();
        manager.preload(&VideoId::new("bad")).await.unwrap();
        manager.settle().await;

        let first = manager.debug_snapshot().await;
        assert_eq!(first.total, 3);
        assert_eq!(first.ready, 1);
        assert_eq!(first.failed, 1);
        assert_eq!(first.not_loaded, 1);
        assert_eq!(first.loading, 0);
        assert_eq!(first.live_controllers(), 1);
        assert_eq!(first.operations.factory_calls, 2);
        assert_eq!(first.config.max_retries, 5);
        assert_eq!(first.operations.snapshot_calls, 1);

        let second = manager.debug_snapshot().await;
        assert_eq!(second.operations.snapshot_calls, 2);
        assert_eq!(second.operations.factory_calls, first.operations.factory_calls);
    }
}
