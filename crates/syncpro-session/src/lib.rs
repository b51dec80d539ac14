//! Conversation persistence for SyncPro.
//!
//! A [`TranscriptStore`] keeps the durable, ordered log of exchanges; a
//! [`SessionCache`] mirrors it in memory for the lifetime of one interactive
//! session; [`render`] turns the cache into the plain-text export.

pub mod cache;
pub mod export;
pub mod sqlite;
pub mod store;

pub use cache::SessionCache;
pub use export::{render, EXPORT_FILE_NAME};
pub use sqlite::{DatabaseLocation, SqliteTranscriptStore};
pub use store::{InMemoryTranscriptStore, TranscriptStore};
