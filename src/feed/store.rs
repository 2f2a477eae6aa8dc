//! Ordered, deduplicated entry store
//!
//! Entries are kept newest-first. Index 0 is the most recently ingested
//! entry, which is also the top of the feed.

use std::collections::{HashMap, VecDeque};

use super::entry::{VideoEntry, VideoId};

/// Result of an insert attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Entry was inserted at the head
    Inserted,
    /// An entry with the same id already exists; the first one is kept
    Duplicate,
    /// The entry id is empty or malformed
    InvalidId,
}

/// Newest-first collection of feed entries keyed by id
#[derive(Debug, Default)]
pub struct EntryStore {
    order: VecDeque<VideoId>,
    entries: HashMap<VideoId, VideoEntry>,
}

impl EntryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry at the head of the sequence
    ///
    /// First write wins: an entry whose id is already present is dropped so
    /// that indices stay stable while the user scrolls.
    pub fn insert(&mut self, entry: VideoEntry) -> InsertOutcome {
        if !entry.id.is_valid() {
            return InsertOutcome::InvalidId;
        }
        if self.entries.contains_key(&entry.id) {
            return InsertOutcome::Duplicate;
        }

        self.order.push_front(entry.id.clone());
        self.entries.insert(entry.id.clone(), entry);
        InsertOutcome::Inserted
    }

    /// Remove an entry, returning it if present
    pub fn remove(&mut self, id: &VideoId) -> Option<VideoEntry> {
        let entry = self.entries.remove(id)?;
        if let Some(pos) = self.order.iter().position(|other| other == id) {
            self.order.remove(pos);
        }
        Some(entry)
    }

    /// Get an entry by id
    pub fn get(&self, id: &VideoId) -> Option<&VideoEntry> {
        self.entries.get(id)
    }

    /// Feed index of an id
    pub fn index_of(&self, id: &VideoId) -> Option<usize> {
        self.order.iter().position(|other| other == id)
    }

    /// Id at a feed index
    pub fn id_at(&self, index: usize) -> Option<&VideoId> {
        self.order.get(index)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate entries newest-first
    pub fn iter(&self) -> impl Iterator<Item = &VideoEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// Iterate ids oldest-first
    pub fn iter_oldest(&self) -> impl Iterator<Item = &VideoId> {
        self.order.iter().rev()
    }

    /// Ids in the closed window `[center - range, center + range]`
    ///
    /// The window is clamped to the valid index range and returned left to
    /// right. An empty store or a center past the end yields an empty window.
    pub fn window(&self, center: usize, range: usize) -> Vec<VideoId> {
        if self.order.is_empty() || center >= self.order.len() {
            return Vec::new();
        }

        let start = center.saturating_sub(range);
        let end = center.saturating_add(range).min(self.order.len() - 1);

        self.order
            .range(start..=end)
            .cloned()
            .collect()
    }
}
