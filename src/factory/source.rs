//! Controller source selection
//!
//! Maps an entry and a preload mode to the concrete source the factory is
//! asked to open.

use std::path::PathBuf;
use std::time::Duration;

use crate::feed::VideoEntry;

/// What a preload is meant to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreloadMode {
    /// Full playback controller
    Playback,
    /// Single decoded frame for previews
    Thumbnail,
}

/// Where the bytes of a video come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Remote stream URL
    Url(String),
    /// Local file
    Path(PathBuf),
}

/// Source handed to the controller factory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Network-backed playback
    Network { url: String },
    /// File-backed playback
    File { path: PathBuf },
    /// Thumbnail-only decode of one frame at `offset`
    Thumbnail { locator: Locator, offset: Duration },
}

/// Kind of source a controller was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Network,
    File,
    Thumbnail,
}

impl VideoSource {
    /// Pick a source for `entry`
    ///
    /// Local files win over the network for both modes. Returns `None` when
    /// the entry carries no locator at all.
    pub fn select(entry: &VideoEntry, mode: PreloadMode, thumbnail_offset: Duration) -> Option<Self> {
        let locator = match (&entry.local_path, &entry.url) {
            (Some(path), _) => Locator::Path(path.clone()),
            (None, Some(url)) => Locator::Url(url.clone()),
            (None, None) => return None,
        };

        Some(match mode {
            PreloadMode::Playback => match locator {
                Locator::Path(path) => VideoSource::File { path },
                Locator::Url(url) => VideoSource::Network { url },
            },
            PreloadMode::Thumbnail => VideoSource::Thumbnail {
                locator,
                offset: thumbnail_offset,
            },
        })
    }

    /// Kind of this source
    pub fn kind(&self) -> SourceKind {
        match self {
            VideoSource::Network { .. } => SourceKind::Network,
            VideoSource::File { .. } => SourceKind::File,
            VideoSource::Thumbnail { .. } => SourceKind::Thumbnail,
        }
    }

    /// Mode this source serves
    pub fn mode(&self) -> PreloadMode {
        match self {
            VideoSource::Thumbnail { .. } => PreloadMode::Thumbnail,
            _ => PreloadMode::Playback,
        }
    }
}

impl std::fmt::Display for VideoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoSource::Network { url } => write!(f, "network:{}", url),
            VideoSource::File { path } => write!(f, "file:{}", path.display()),
            VideoSource::Thumbnail { locator, offset } => match locator {
                Locator::Url(url) => write!(f, "thumbnail:{}@{}ms", url, offset.as_millis()),
                Locator::Path(path) => {
                    write!(f, "thumbnail:{}@{}ms", path.display(), offset.as_millis())
                }
            },
        }
    }
}
