use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use syncpro_core::{Exchange, SyncproResult};

/// Durable, ordered log of exchanges.
///
/// Enumeration order is append order: timestamp ascending, ties broken by
/// insertion sequence. Timestamps are assigned at append time when the
/// exchange carries none, and never go backwards.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Persist one exchange. Visible to `list_all` once this returns `Ok`.
    async fn append(&self, exchange: &Exchange) -> SyncproResult<()>;
    /// Every persisted exchange, oldest first. Empty store yields an empty vec.
    async fn list_all(&self) -> SyncproResult<Vec<Exchange>>;
    /// Delete every exchange. Clearing an empty store succeeds.
    async fn clear_all(&self) -> SyncproResult<()>;
}

/// Process-local store. Nothing survives a restart; used for `--ephemeral` runs
/// and tests.
#[derive(Default)]
pub struct InMemoryTranscriptStore {
    entries: RwLock<Vec<Exchange>>,
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn append(&self, exchange: &Exchange) -> SyncproResult<()> {
        let mut entries = self.entries.write();
        let mut ts = exchange.timestamp.unwrap_or_else(Utc::now);
        if let Some(last) = entries.last().and_then(|e| e.timestamp) {
            ts = ts.max(last);
        }
        entries.push(exchange.clone().with_timestamp(ts));
        Ok(())
    }

    async fn list_all(&self) -> SyncproResult<Vec<Exchange>> {
        Ok(self.entries.read().clone())
    }

    async fn clear_all(&self) -> SyncproResult<()> {
        self.entries.write().clear();
        Ok(())
    }
}
