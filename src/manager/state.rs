//! Per-video state machine
//!
//! Tracks one video's playback readiness from ingestion to disposal.
//!
//! ```text
//!   NotLoaded ──► Loading ──► Ready
//!       ▲            │  ▲ ▲      │
//!       │            ▼  │ └──────┤ (thumbnail → playback)
//!  (not applicable) Failed       │
//!                    │           │
//!    any non-terminal state ──► Disposed (terminal)
//! ```
//!
//! A `Ready` video holding only a thumbnail controller may start a playback
//! attempt. The thumbnail controller is detached when the attempt begins.
//!
//! Every `Loading` phase carries an attempt token. Completions must present
//! the token they were issued with; anything else is a stale completion and
//! is refused.

use crate::factory::{Controller, PreloadMode, SourceKind};
use crate::feed::VideoId;

/// Lifecycle of a video's playback resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// No controller, nothing in flight
    NotLoaded,
    /// A factory call is in flight
    Loading,
    /// Controller attached
    Ready,
    /// Last factory call failed
    Failed,
    /// Disposed; terminal
    Disposed,
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Lifecycle::NotLoaded => "not_loaded",
            Lifecycle::Loading => "loading",
            Lifecycle::Ready => "ready",
            Lifecycle::Failed => "failed",
            Lifecycle::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

/// Illegal state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: Lifecycle,
    pub to: Lifecycle,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Illegal transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for TransitionError {}

/// A controller owned by the manager
///
/// Releases the wrapped controller when dropped, so every controller is
/// released exactly once no matter which path discards it.
pub(crate) struct OwnedController {
    controller: Box<dyn Controller>,
    kind: SourceKind,
    attached_seq: u64,
}

impl OwnedController {
    pub(crate) fn new(controller: Box<dyn Controller>, kind: SourceKind, attached_seq: u64) -> Self {
        Self {
            controller,
            kind,
            attached_seq,
        }
    }

    pub(crate) fn kind(&self) -> SourceKind {
        self.kind
    }

    pub(crate) fn attached_seq(&self) -> u64 {
        self.attached_seq
    }

    pub(crate) fn set_attached_seq(&mut self, seq: u64) {
        self.attached_seq = seq;
    }

    pub(crate) fn get(&self) -> &dyn Controller {
        self.controller.as_ref()
    }

    pub(crate) fn get_mut(&mut self) -> &mut dyn Controller {
        self.controller.as_mut()
    }
}

impl std::fmt::Debug for OwnedController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedController")
            .field("kind", &self.kind)
            .field("attached_seq", &self.attached_seq)
            .finish_non_exhaustive()
    }
}

impl Drop for OwnedController {
    fn drop(&mut self) {
        self.controller.release();
    }
}

/// In-flight attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Attempt {
    pub token: u64,
    pub mode: PreloadMode,
}

/// Mutable state for one video
pub(crate) struct VideoState {
    lifecycle: Lifecycle,
    retry_count: u32,
    last_error: Option<String>,
    permanently_failed: bool,
    thumbnail_unsupported: bool,
    playback_unsupported: bool,
    attempts: u32,
    attempt: Option<Attempt>,
    controller: Option<OwnedController>,
}

impl VideoState {
    pub(crate) fn new() -> Self {
        Self {
            lifecycle: Lifecycle::NotLoaded,
            retry_count: 0,
            last_error: None,
            permanently_failed: false,
            thumbnail_unsupported: false,
            playback_unsupported: false,
            attempts: 0,
            attempt: None,
            controller: None,
        }
    }

    /// Fresh `NotLoaded` state that keeps the failure history of `self`
    pub(crate) fn successor(&self) -> Self {
        Self {
            retry_count: self.retry_count,
            last_error: self.last_error.clone(),
            permanently_failed: self.permanently_failed,
            thumbnail_unsupported: self.thumbnail_unsupported,
            playback_unsupported: self.playback_unsupported,
            attempts: self.attempts,
            ..Self::new()
        }
    }

    /// Failure history kept for an id that leaves the store
    ///
    /// Carries the same history as [`successor`](Self::successor) but stays
    /// `Failed`, so a permanently failed id comes back blacklisted.
    pub(crate) fn tombstone(&self) -> Self {
        Self {
            lifecycle: Lifecycle::Failed,
            ..self.successor()
        }
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub(crate) fn is_permanently_failed(&self) -> bool {
        self.permanently_failed
    }

    pub(crate) fn is_unsupported(&self, mode: PreloadMode) -> bool {
        match mode {
            PreloadMode::Playback => self.playback_unsupported,
            PreloadMode::Thumbnail => self.thumbnail_unsupported,
        }
    }

    pub(crate) fn controller(&self) -> Option<&OwnedController> {
        self.controller.as_ref()
    }

    pub(crate) fn controller_mut(&mut self) -> Option<&mut OwnedController> {
        self.controller.as_mut()
    }

    /// Whether a playback attempt would replace the attached controller
    pub(crate) fn awaits_playback_upgrade(&self, mode: PreloadMode) -> bool {
        mode == PreloadMode::Playback
            && self.lifecycle == Lifecycle::Ready
            && self
                .controller
                .as_ref()
                .is_some_and(|controller| controller.kind() == SourceKind::Thumbnail)
    }

    /// Whether the scheduler may start an attempt in `mode`
    pub(crate) fn is_schedulable(&self, mode: PreloadMode) -> bool {
        (matches!(self.lifecycle, Lifecycle::NotLoaded | Lifecycle::Failed)
            || self.awaits_playback_upgrade(mode))
            && !self.permanently_failed
            && !self.is_unsupported(mode)
    }

    /// Whether `token` is the attempt currently in flight
    pub(crate) fn is_current(&self, token: u64) -> bool {
        self.lifecycle == Lifecycle::Loading
            && self.attempt.map(|attempt| attempt.token) == Some(token)
    }

    /// `NotLoaded | Failed → Loading`, or `Ready → Loading` for a playback
    /// upgrade of a thumbnail controller
    ///
    /// Returns the detached thumbnail controller, if any, for the caller to
    /// drop.
    pub(crate) fn begin_loading(
        &mut self,
        attempt: Attempt,
    ) -> Result<Option<OwnedController>, TransitionError> {
        let allowed = match self.lifecycle {
            Lifecycle::NotLoaded | Lifecycle::Failed => true,
            Lifecycle::Ready => self.awaits_playback_upgrade(attempt.mode),
            Lifecycle::Loading | Lifecycle::Disposed => false,
        };
        if !allowed || self.permanently_failed {
            return Err(TransitionError {
                from: self.lifecycle,
                to: Lifecycle::Loading,
            });
        }

        self.lifecycle = Lifecycle::Loading;
        self.attempt = Some(attempt);
        self.attempts += 1;
        Ok(self.controller.take())
    }

    /// `Loading → Ready`
    ///
    /// Hands the controller back when `token` is stale.
    pub(crate) fn attach(
        &mut self,
        token: u64,
        controller: OwnedController,
    ) -> Result<(), OwnedController> {
        if !self.is_current(token) {
            return Err(controller);
        }
        self.lifecycle = Lifecycle::Ready;
        self.attempt = None;
        self.controller = Some(controller);
        Ok(())
    }

    /// `Loading → Failed`
    ///
    /// Returns false when `token` is stale. Marks the video permanently
    /// failed once `retry_count` exceeds `max_retries`.
    pub(crate) fn fail(&mut self, token: u64, reason: String, max_retries: u32) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.lifecycle = Lifecycle::Failed;
        self.attempt = None;
        self.retry_count = self.retry_count.saturating_add(1);
        self.last_error = Some(reason);
        if self.retry_count > max_retries {
            self.permanently_failed = true;
        }
        true
    }

    /// `Loading → NotLoaded` for a mode the platform cannot serve
    pub(crate) fn mark_not_applicable(&mut self, token: u64) -> bool {
        let Some(attempt) = self.attempt.filter(|_| self.is_current(token)) else {
            return false;
        };
        self.mark_unsupported(attempt.mode);
        self.lifecycle = Lifecycle::NotLoaded;
        self.attempt = None;
        true
    }

    /// Exclude `mode` from scheduling without a factory call
    pub(crate) fn mark_unsupported(&mut self, mode: PreloadMode) {
        match mode {
            PreloadMode::Playback => self.playback_unsupported = true,
            PreloadMode::Thumbnail => self.thumbnail_unsupported = true,
        }
    }

    /// Any non-terminal state `→ Disposed`
    ///
    /// Returns the detached controller, if any, for the caller to drop.
    pub(crate) fn dispose(&mut self) -> Result<Option<OwnedController>, TransitionError> {
        if self.lifecycle == Lifecycle::Disposed {
            return Err(TransitionError {
                from: Lifecycle::Disposed,
                to: Lifecycle::Disposed,
            });
        }
        self.lifecycle = Lifecycle::Disposed;
        self.attempt = None;
        Ok(self.controller.take())
    }

    pub(crate) fn snapshot(&self) -> VideoStateSnapshot {
        VideoStateSnapshot {
            lifecycle: self.lifecycle,
            retry_count: self.retry_count,
            last_error: self.last_error.clone(),
            permanently_failed: self.permanently_failed,
            attempts: self.attempts,
            source: self.controller.as_ref().map(OwnedController::kind),
            thumbnail_unsupported: self.thumbnail_unsupported,
            playback_unsupported: self.playback_unsupported,
        }
    }
}

/// Read-only copy of a video's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoStateSnapshot {
    /// Current lifecycle
    pub lifecycle: Lifecycle,
    /// Total historical failures
    pub retry_count: u32,
    /// Most recent failure reason
    pub last_error: Option<String>,
    /// Retry budget exhausted; never scheduled again
    pub permanently_failed: bool,
    /// Total factory calls issued
    pub attempts: u32,
    /// Kind of the attached controller (Ready only)
    pub source: Option<SourceKind>,
    /// Factory reported thumbnails as not applicable
    pub thumbnail_unsupported: bool,
    /// Factory reported playback as not applicable
    pub playback_unsupported: bool,
}

/// Read-only description of an attached controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerInfo {
    /// Video the controller is bound to
    pub id: VideoId,
    /// Source the controller was built from
    pub source: SourceKind,
    /// Whether it is currently playing
    pub playing: bool,
    /// Attach order; higher is more recent
    pub attached_seq: u64,
}
