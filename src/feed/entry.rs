//! Video feed entry types
//!
//! This module defines the identity and descriptor types for entries that
//! arrive from feed collaborators.

use std::path::{Path, PathBuf};

/// Unique identifier for a video feed entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VideoId(String);

impl VideoId {
    /// Create a new video id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the id can be ingested
    ///
    /// Empty ids, whitespace-only ids and ids with embedded control
    /// characters are rejected.
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty() && !self.0.chars().any(char::is_control)
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VideoId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for VideoId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Immutable descriptor for a video in the feed
///
/// Cheap to clone; the manager hands out copies to readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoEntry {
    /// Unique entry id
    pub id: VideoId,
    /// Author identity (e.g., a public key or handle)
    pub author: String,
    /// Remote stream locator
    pub url: Option<String>,
    /// Local file path, preferred over `url` for playback when present
    pub local_path: Option<PathBuf>,
    /// Display title
    pub title: String,
    /// Creation time in seconds since the Unix epoch
    pub created_at: u64,
    /// Time the feed layer first observed the entry, seconds since the Unix epoch
    pub observed_at: u64,
}

impl VideoEntry {
    /// Create an entry with no locators
    pub fn new(id: impl Into<VideoId>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            url: None,
            local_path: None,
            title: String::new(),
            created_at: 0,
            observed_at: 0,
        }
    }

    /// Set the network locator
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the local file path
    pub fn local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    /// Set the title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the creation timestamp
    pub fn created_at(mut self, secs: u64) -> Self {
        self.created_at = secs;
        self
    }

    /// Set the observation timestamp
    pub fn observed_at(mut self, secs: u64) -> Self {
        self.observed_at = secs;
        self
    }

    /// Local path, if any
    pub fn path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    /// Whether the entry has any locator a controller could be built from
    pub fn has_source(&self) -> bool {
        self.url.is_some() || self.local_path.is_some()
    }
}
