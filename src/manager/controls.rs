//! Playback controls
//!
//! Controls only touch `Ready` controllers. A missing or not-yet-ready
//! controller is a routine race while scrolling, so those calls are silent
//! no-ops rather than errors. Only a disposed manager is reported.

use crate::factory::Controller;
use crate::feed::VideoId;
use crate::stats::metrics::bump;

use super::error::ManagerError;
use super::state::Lifecycle;
use super::VideoManager;

impl VideoManager {
    /// Pause one video
    pub async fn pause(&self, id: &VideoId) -> Result<(), ManagerError> {
        self.control_one(id, "pause", |controller| controller.pause())
            .await
    }

    /// Resume one video
    pub async fn resume(&self, id: &VideoId) -> Result<(), ManagerError> {
        self.control_one(id, "resume", |controller| controller.play())
            .await
    }

    /// Pause every ready video; returns how many were paused
    pub async fn pause_all(&self) -> Result<usize, ManagerError> {
        self.control_all("pause_all", |controller| controller.pause())
            .await
    }

    /// Stop every ready video; returns how many were stopped
    pub async fn stop_all(&self) -> Result<usize, ManagerError> {
        self.control_all("stop_all", |controller| controller.stop())
            .await
    }

    async fn control_one<F>(&self, id: &VideoId, action: &'static str, f: F) -> Result<(), ManagerError>
    where
        F: FnOnce(&mut dyn Controller),
    {
        let applied = {
            let mut inner = self.inner.write().await;
            if inner.disposed {
                return self.reject(ManagerError::ManagerDisposed);
            }
            bump(&self.counters.controls);

            match inner
                .states
                .get_mut(id)
                .filter(|state| state.lifecycle() == Lifecycle::Ready)
                .and_then(|state| state.controller_mut())
            {
                Some(controller) => {
                    f(controller.get_mut());
                    true
                }
                None => false,
            }
        };

        if applied {
            tracing::debug!(video = %id, action = action, "Playback control applied");
            self.notify();
        } else {
            tracing::debug!(video = %id, action = action, "No ready controller, control ignored");
        }
        Ok(())
    }

    async fn control_all<F>(&self, action: &'static str, f: F) -> Result<usize, ManagerError>
    where
        F: Fn(&mut dyn Controller),
    {
        let applied = {
            let mut inner = self.inner.write().await;
            if inner.disposed {
                return self.reject(ManagerError::ManagerDisposed);
            }
            bump(&self.counters.controls);

            let mut applied = 0;
            for state in inner.states.values_mut() {
                if state.lifecycle() != Lifecycle::Ready {
                    continue;
                }
                if let Some(controller) = state.controller_mut() {
                    f(controller.get_mut());
                    applied += 1;
                }
            }
            applied
        };

        tracing::debug!(action = action, controllers = applied, "Playback control applied");
        if applied > 0 {
            self.notify();
        }
        Ok(applied)
    }
}
