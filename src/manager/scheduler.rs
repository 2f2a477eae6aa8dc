//! Preload scheduling
//!
//! `preload` moves a video to `Loading` under the lock, then runs the factory
//! call in a spawned task. The completion re-takes the lock and applies its
//! result only if the video is still in the same attempt. Disposal, reset or
//! removal while the call is in flight therefore turns the completion into a
//! no-op, and any controller it produced is released.

use std::sync::Arc;

use crate::factory::{FactoryOutcome, PreloadMode, SourceKind, VideoSource};
use crate::feed::{VideoEntry, VideoId};
use crate::stats::metrics::bump;

use super::error::ManagerError;
use super::state::{Attempt, Lifecycle, OwnedController, TransitionError};
use super::VideoManager;

/// A factory call ready to be issued
struct Job {
    token: u64,
    entry: VideoEntry,
    source: VideoSource,
}

/// Why a preload request did not issue a factory call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    AlreadyReady,
    InFlight,
    PermanentlyFailed,
    Unsupported,
}

impl Skip {
    fn as_str(&self) -> &'static str {
        match self {
            Skip::AlreadyReady => "already_ready",
            Skip::InFlight => "in_flight",
            Skip::PermanentlyFailed => "permanently_failed",
            Skip::Unsupported => "unsupported",
        }
    }
}

impl VideoManager {
    /// Request a playback controller for `id`
    ///
    /// No-op when the video is ready, already loading, permanently failed or
    /// the factory reported playback as not applicable. Factory failures are
    /// recorded on the video, never returned here.
    pub async fn preload(self: &Arc<Self>, id: &VideoId) -> Result<(), ManagerError> {
        self.schedule(id, PreloadMode::Playback).await.map(|_| ())
    }

    /// Request a thumbnail-only controller for `id`
    pub async fn preload_thumbnail(self: &Arc<Self>, id: &VideoId) -> Result<(), ManagerError> {
        self.schedule(id, PreloadMode::Thumbnail).await.map(|_| ())
    }

    /// Preload every schedulable video in `[index - range, index + range]`
    ///
    /// The window is clamped to the feed and walked left to right, so
    /// requests are issued in feed order; completion order is up to the
    /// factory. Returns the number of factory calls issued. `index` is
    /// remembered as the focus for proximity-aware eviction.
    pub async fn preload_around_index(
        self: &Arc<Self>,
        index: usize,
        range: usize,
    ) -> Result<usize, ManagerError> {
        let candidates: Vec<VideoId> = {
            let mut inner = self.inner.write().await;
            if inner.disposed {
                return self.reject(ManagerError::ManagerDisposed);
            }
            inner.focus = Some(index);

            let window = inner.store.window(index, range);
            window
                .into_iter()
                .filter(|id| {
                    inner
                        .states
                        .get(id)
                        .is_some_and(|state| state.is_schedulable(PreloadMode::Playback))
                })
                .collect()
        };

        tracing::debug!(
            index = index,
            range = range,
            candidates = candidates.len(),
            "Preloading around index"
        );

        let mut issued = 0;
        for id in &candidates {
            if self.schedule(id, PreloadMode::Playback).await? {
                issued += 1;
            }
        }
        Ok(issued)
    }

    /// `preload_around_index` with the configured default range
    pub async fn preload_around_default(self: &Arc<Self>, index: usize) -> Result<usize, ManagerError> {
        self.preload_around_index(index, self.config.default_preload_range)
            .await
    }

    /// Start an attempt for `id` in `mode`; true if a factory call was issued
    async fn schedule(self: &Arc<Self>, id: &VideoId, mode: PreloadMode) -> Result<bool, ManagerError> {
        bump(&self.counters.preload_requests);

        let (job, detached) = {
            let mut inner = self.inner.write().await;
            if inner.disposed {
                return self.reject(ManagerError::ManagerDisposed);
            }

            let Some(entry) = inner.store.get(id).cloned() else {
                return self.reject(ManagerError::UnknownVideo(id.clone()));
            };

            let token = inner.next_token;
            let offset = self.config.thumbnail_seek_offset;
            let Some(state) = inner.states.get_mut(id) else {
                return self.reject(ManagerError::UnknownVideo(id.clone()));
            };

            let skip = match state.lifecycle() {
                Lifecycle::Disposed => {
                    return self.reject(ManagerError::transition(
                        id,
                        TransitionError {
                            from: Lifecycle::Disposed,
                            to: Lifecycle::Loading,
                        },
                    ));
                }
                Lifecycle::Loading => Some(Skip::InFlight),
                Lifecycle::Ready if !state.awaits_playback_upgrade(mode) => {
                    Some(Skip::AlreadyReady)
                }
                _ if state.is_permanently_failed() => Some(Skip::PermanentlyFailed),
                _ if state.is_unsupported(mode) => Some(Skip::Unsupported),
                _ => None,
            };

            if let Some(skip) = skip {
                bump(&self.counters.preload_skipped);
                tracing::debug!(video = %id, reason = skip.as_str(), "Preload skipped");
                return Ok(false);
            }

            let Some(source) = VideoSource::select(&entry, mode, offset) else {
                state.mark_unsupported(mode);
                drop(inner);
                bump(&self.counters.not_applicable);
                tracing::debug!(video = %id, "Entry has no locator, preload not applicable");
                self.notify();
                return Ok(false);
            };

            let detached = match state.begin_loading(Attempt { token, mode }) {
                Ok(detached) => detached,
                Err(err) => return self.reject(ManagerError::transition(id, err)),
            };
            inner.next_token += 1;

            if detached.is_some() {
                tracing::info!(video = %id, "Replacing thumbnail controller with playback");
            }
            tracing::debug!(video = %id, source = %source, token = token, "Preload issued");
            (Job { token, entry, source }, detached)
        };

        // Released outside the lock
        drop(detached);
        bump(&self.counters.factory_calls);
        self.notify();

        let manager = Arc::clone(self);
        let mut tasks = self.tasks.lock().await;
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            let outcome = manager.factory.create(&job.entry, &job.source).await;
            tracing::debug!(
                video = %job.entry.id,
                outcome = outcome.label(),
                "Factory call finished"
            );
            let completion = Completion::owned(outcome, job.source.kind());
            manager.complete(job, completion).await;
        });

        Ok(true)
    }

    /// Apply a finished factory call
    async fn complete(&self, job: Job, outcome: Completion) {
        let id = &job.entry.id;
        let mut stale: Option<OwnedController> = None;
        let mut evicted: Vec<OwnedController> = Vec::new();
        let changed;

        {
            let mut inner = self.inner.write().await;
            let attach_seq = inner.next_attach_seq;

            let Some(state) = inner.states.get_mut(id) else {
                // Entry removed while the call was in flight
                bump(&self.counters.failures);
                tracing::warn!(
                    video = %id,
                    outcome = outcome.label(),
                    "Preload completed for removed entry"
                );
                return;
            };

            changed = match outcome {
                Completion::Created(mut controller) => {
                    controller.set_attached_seq(attach_seq);
                    match state.attach(job.token, controller) {
                        Ok(()) => {
                            inner.next_attach_seq += 1;
                            bump(&self.counters.ready);
                            tracing::info!(
                                video = %id,
                                source = %job.source,
                                "Controller ready"
                            );

                            let live = inner.live_controllers();
                            if live > self.config.max_live_controllers {
                                tracing::info!(
                                    live = live,
                                    threshold = self.config.max_live_controllers,
                                    "Live controllers over threshold"
                                );
                                evicted = self.evict_locked(&mut inner);
                            }
                            true
                        }
                        Err(controller) => {
                            stale = Some(controller);
                            false
                        }
                    }
                }
                Completion::NotApplicable => {
                    if state.mark_not_applicable(job.token) {
                        bump(&self.counters.not_applicable);
                        tracing::info!(
                            video = %id,
                            source = %job.source,
                            "Controller not applicable for source"
                        );
                        true
                    } else {
                        false
                    }
                }
                Completion::Failed(reason) => {
                    if state.fail(job.token, reason.clone(), self.config.max_retries) {
                        bump(&self.counters.failures);
                        let snapshot = state.snapshot();
                        tracing::warn!(
                            video = %id,
                            error = %reason,
                            retry_count = snapshot.retry_count,
                            "Preload failed"
                        );
                        if snapshot.permanently_failed {
                            tracing::warn!(
                                video = %id,
                                attempts = snapshot.attempts,
                                "Retry budget exhausted, video permanently failed"
                            );
                        }
                        true
                    } else {
                        false
                    }
                }
            };

            if !changed {
                bump(&self.counters.stale_completions);
                tracing::debug!(
                    video = %id,
                    token = job.token,
                    state = %state_label(inner.states.get(id).map(|s| s.lifecycle())),
                    "Discarding stale preload completion"
                );
            }
        }

        // Released outside the lock
        drop(stale);
        drop(evicted);

        if changed {
            self.notify();
        }
    }
}

/// Factory outcome with the controller already owned by the manager
enum Completion {
    Created(OwnedController),
    NotApplicable,
    Failed(String),
}

impl Completion {
    /// Takes ownership right away so the controller is released on every path
    fn owned(outcome: FactoryOutcome, kind: SourceKind) -> Self {
        match outcome {
            FactoryOutcome::Created(controller) => {
                Completion::Created(OwnedController::new(controller, kind, 0))
            }
            FactoryOutcome::NotApplicable => Completion::NotApplicable,
            FactoryOutcome::Failed(reason) => Completion::Failed(reason),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Completion::Created(_) => "created",
            Completion::NotApplicable => "not_applicable",
            Completion::Failed(_) => "failed",
        }
    }
}

fn state_label(lifecycle: Option<Lifecycle>) -> String {
    lifecycle.map_or_else(|| "removed".to_string(), |lifecycle| lifecycle.to_string())
}
