//! Feed entry model and the ordered entity store

pub mod entry;
pub mod store;

pub use entry::{VideoEntry, VideoId};
pub use store::{EntryStore, InsertOutcome};
