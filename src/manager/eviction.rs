//! Memory-pressure eviction
//!
//! Decoders are expensive and a scrolling feed only needs a small sliding
//! window of them. An eviction pass ranks the ready controllers, keeps the
//! top `keep_count` and disposes the rest through the normal `→ Disposed`
//! transition. Entry metadata and retry history are never touched.

use crate::feed::VideoId;
use crate::stats::metrics::{add, bump};

use super::config::EvictionPolicy;
use super::error::ManagerError;
use super::state::{Lifecycle, OwnedController};
use super::{Inner, VideoManager};

/// Ranking key for a ready controller
struct Candidate {
    id: VideoId,
    attached_seq: u64,
    distance: Option<usize>,
}

impl VideoManager {
    /// Dispose all but the `keep_count` most relevant controllers
    ///
    /// Runs automatically when the live controller count exceeds
    /// `max_live_controllers`. Returns the number of controllers disposed.
    pub async fn handle_memory_pressure(&self) -> Result<usize, ManagerError> {
        let released = {
            let mut inner = self.inner.write().await;
            if inner.disposed {
                return self.reject(ManagerError::ManagerDisposed);
            }
            self.evict_locked(&mut inner)
        };

        let count = released.len();
        drop(released);

        if count > 0 {
            self.notify();
        }
        Ok(count)
    }

    /// Eviction pass on already-locked state
    ///
    /// Returns the detached controllers so the caller can release them after
    /// dropping the lock.
    pub(super) fn evict_locked(&self, inner: &mut Inner) -> Vec<OwnedController> {
        bump(&self.counters.memory_pressure_runs);

        let keep = self.config.effective_keep_count();
        let mut candidates: Vec<Candidate> = inner
            .states
            .iter()
            .filter(|(_, state)| state.lifecycle() == Lifecycle::Ready)
            .filter_map(|(id, state)| {
                let controller = state.controller()?;
                let distance = inner
                    .focus
                    .zip(inner.store.index_of(id))
                    .map(|(focus, index)| focus.abs_diff(index));
                Some(Candidate {
                    id: id.clone(),
                    attached_seq: controller.attached_seq(),
                    distance,
                })
            })
            .collect();

        if candidates.len() <= keep {
            return Vec::new();
        }

        rank(&mut candidates, self.config.eviction_policy);

        let mut released = Vec::new();
        for candidate in candidates.into_iter().skip(keep) {
            let Some(state) = inner.states.get_mut(&candidate.id) else {
                continue;
            };
            if let Ok(Some(controller)) = state.dispose() {
                tracing::info!(
                    video = %candidate.id,
                    attached_seq = candidate.attached_seq,
                    distance = ?candidate.distance,
                    "Controller evicted"
                );
                released.push(controller);
            }
        }

        add(&self.counters.evictions, released.len() as u64);
        tracing::info!(
            evicted = released.len(),
            kept = keep,
            policy = ?self.config.eviction_policy,
            "Memory pressure handled"
        );

        released
    }
}

/// Sort most relevant first
fn rank(candidates: &mut [Candidate], policy: EvictionPolicy) {
    match policy {
        EvictionPolicy::MostRecentlyAttached => {
            candidates.sort_by(|a, b| b.attached_seq.cmp(&a.attached_seq));
        }
        EvictionPolicy::NearestToFocus => {
            // Without a focus every distance is None and this falls back to recency
            candidates.sort_by(|a, b| {
                let a_distance = a.distance.unwrap_or(usize::MAX);
                let b_distance = b.distance.unwrap_or(usize::MAX);
                a_distance
                    .cmp(&b_distance)
                    .then_with(|| b.attached_seq.cmp(&a.attached_seq))
            });
        }
    }
}
