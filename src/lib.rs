//! Memory-bounded video controller management for scrolling feeds
//!
//! A vertical video feed can deliver entries faster than any device can keep
//! decoders around for them. This crate decides which entries get a live
//! playback controller, when it is created, and how many may exist at once.
//!
//! - [`feed`]: entry descriptors and the newest-first, deduplicated store
//! - [`factory`]: the boundary to the platform decoder (controllers,
//!   factories, source selection, a timeout adapter)
//! - [`manager`]: the per-video state machine, preload scheduler, eviction
//!   policy and playback controls, owned by [`VideoManager`]
//! - [`stats`]: operation counters and debug snapshots
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use feed_preload::{ControllerFactory, ManagerConfig, VideoEntry, VideoManager};
//!
//! async fn scroll(factory: Arc<dyn ControllerFactory>) -> Result<(), feed_preload::ManagerError> {
//!     let manager = Arc::new(VideoManager::with_config(factory, ManagerConfig::default()));
//!
//!     manager
//!         .ingest(VideoEntry::new("note1", "alice").url("https://cdn.example/1.mp4"))
//!         .await?;
//!
//!     // User is looking at the top of the feed
//!     manager.preload_around_index(0, 2).await?;
//!
//!     for entry in manager.list_ready().await {
//!         println!("ready: {}", entry.id);
//!     }
//!     Ok(())
//! }
//! ```

pub mod factory;
pub mod feed;
pub mod manager;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use factory::{
    Controller, ControllerFactory, FactoryOutcome, PreloadMode, SourceKind, TimeoutFactory,
    VideoSource,
};
pub use feed::{VideoEntry, VideoId};
pub use manager::{
    ControllerInfo, ErrorMode, EvictionPolicy, Lifecycle, ManagerConfig, ManagerError,
    VideoManager, VideoStateSnapshot,
};
pub use stats::{DebugSnapshot, OperationStats};
