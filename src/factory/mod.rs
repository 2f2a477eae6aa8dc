//! Controller factory boundary
//!
//! The platform decoding primitive lives outside this crate. The manager only
//! sees it through two traits:
//!
//! - [`Controller`]: an exclusively owned playback resource for one video
//! - [`ControllerFactory`]: builds a controller for an entry and a source
//!
//! Factory calls are asynchronous and report one of three outcomes, see
//! [`FactoryOutcome`]. "Nothing to build" and "building failed" are separate
//! variants so the scheduler never has to guess which one a `None` meant.

pub mod source;
pub mod timeout;

pub use source::{Locator, PreloadMode, SourceKind, VideoSource};
pub use timeout::TimeoutFactory;

use bytes::Bytes;

use crate::feed::VideoEntry;

/// Platform playback resource bound to a single video
///
/// Controls are synchronous; the manager never awaits a controller.
pub trait Controller: Send + Sync {
    /// Start or resume playback
    fn play(&mut self);

    /// Pause playback, keeping the decoder warm
    fn pause(&mut self);

    /// Stop playback and rewind
    fn stop(&mut self);

    /// Whether the controller is currently playing
    fn is_playing(&self) -> bool;

    /// Decoded poster frame, for thumbnail controllers
    fn thumbnail(&self) -> Option<Bytes> {
        None
    }

    /// Release the underlying decoder
    ///
    /// Called exactly once by the manager, right before the controller is
    /// dropped.
    fn release(&mut self);
}

/// Result of a factory call
pub enum FactoryOutcome {
    /// A controller was built
    Created(Box<dyn Controller>),
    /// The requested mode does not apply (e.g., thumbnails unsupported on
    /// this platform). Not a failure.
    NotApplicable,
    /// Building failed (network, codec, ...)
    Failed(String),
}

impl FactoryOutcome {
    /// Short label for logging
    pub fn label(&self) -> &'static str {
        match self {
            FactoryOutcome::Created(_) => "created",
            FactoryOutcome::NotApplicable => "not_applicable",
            FactoryOutcome::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Debug for FactoryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactoryOutcome::Created(_) => f.write_str("Created(..)"),
            FactoryOutcome::NotApplicable => f.write_str("NotApplicable"),
            FactoryOutcome::Failed(reason) => f.debug_tuple("Failed").field(reason).finish(),
        }
    }
}

/// Produces controllers for feed entries
#[async_trait::async_trait]
pub trait ControllerFactory: Send + Sync {
    /// Build a controller for `entry` from `source`
    ///
    /// May suspend for as long as the platform needs. The manager does not
    /// hold any lock while this runs.
    async fn create(&self, entry: &VideoEntry, source: &VideoSource) -> FactoryOutcome;
}
