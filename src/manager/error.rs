//! Manager error types
//!
//! Only invalid operations surface as errors. Preload failures are recorded
//! on the video's state and never returned to callers.

use crate::feed::VideoId;

use super::state::{Lifecycle, TransitionError};

/// Error type for manager operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerError {
    /// The manager has been disposed
    ManagerDisposed,
    /// Mutating call referenced an id that is not in the store
    UnknownVideo(VideoId),
    /// The video's state does not allow the requested transition
    InvalidTransition {
        id: VideoId,
        from: Lifecycle,
        to: Lifecycle,
    },
}

impl ManagerError {
    pub(crate) fn transition(id: &VideoId, err: TransitionError) -> Self {
        ManagerError::InvalidTransition {
            id: id.clone(),
            from: err.from,
            to: err.to,
        }
    }
}

impl std::fmt::Display for ManagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManagerError::ManagerDisposed => write!(f, "Manager has been disposed"),
            ManagerError::UnknownVideo(id) => write!(f, "Unknown video: {}", id),
            ManagerError::InvalidTransition { id, from, to } => {
                write!(f, "Invalid transition for {}: {} -> {}", id, from, to)
            }
        }
    }
}

impl std::error::Error for ManagerError {}
