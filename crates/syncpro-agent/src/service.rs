use crate::config::ModelCatalog;
use crate::orchestrator::Orchestrator;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;
use syncpro_core::{Exchange, SyncproError, SyncproResult};
use syncpro_session::{render, SessionCache, TranscriptStore};
use tracing::{info, warn};

/// Shown when a send is attempted without `GOOGLE_API_KEY`.
pub const MISSING_API_KEY: &str =
    "Google API key not found. Please set GOOGLE_API_KEY in your environment or .env file.";

/// The Send / Clear / Export actions of one interactive session.
///
/// Owns the session cache, hydrated from the store exactly once at
/// construction. An exchange whose store append fails stays visible in the
/// cache and stays queued; the queue is flushed in order on the next send or
/// on [`ChatService::resync`], and dropped by [`ChatService::clear`].
pub struct ChatService {
    orchestrator: Option<Orchestrator>,
    store: Arc<dyn TranscriptStore>,
    catalog: ModelCatalog,
    cache: SessionCache,
    unsaved: VecDeque<Exchange>,
}

impl ChatService {
    /// Starts a session. `orchestrator` is `None` when no API key is
    /// configured; sends then fail with a configuration error.
    pub async fn open(
        orchestrator: Option<Orchestrator>,
        store: Arc<dyn TranscriptStore>,
        catalog: ModelCatalog,
    ) -> SyncproResult<Self> {
        let mut cache = SessionCache::new();
        cache.hydrate(store.list_all().await?)?;
        info!(exchanges = cache.len(), "Session hydrated from transcript store");
        Ok(Self {
            orchestrator,
            store,
            catalog,
            cache,
            unsaved: VecDeque::new(),
        })
    }

    /// Runs one utterance through the pipeline and records the exchange.
    pub async fn send(&mut self, input: &str, model_label: &str) -> SyncproResult<Exchange> {
        self.orchestrator()?;
        if input.trim().is_empty() {
            return Err(SyncproError::Validation(
                "Please enter your message.".into(),
            ));
        }
        let model = self.catalog.get(model_label)?.clone();

        let exchange = self.orchestrator()?.process(input, &model).await?;
        // Stamped here so the cached copy matches what the store lists back.
        let exchange = exchange.with_timestamp(self.cache.next_timestamp(Utc::now()));

        // Queued behind any earlier unsaved exchanges so the store keeps
        // submission order.
        self.cache.append(exchange.clone());
        self.unsaved.push_back(exchange.clone());
        if let Err(e) = self.resync().await {
            warn!(error = %e, pending = self.unsaved.len(), "Exchange kept in session but not persisted");
            return Err(e);
        }
        Ok(exchange)
    }

    fn orchestrator(&self) -> SyncproResult<&Orchestrator> {
        self.orchestrator
            .as_ref()
            .ok_or_else(|| SyncproError::Config(MISSING_API_KEY.into()))
    }

    /// Persists queued exchanges in order. Returns how many were written.
    pub async fn resync(&mut self) -> SyncproResult<usize> {
        let mut written = 0;
        while let Some(exchange) = self.unsaved.front() {
            self.store.append(exchange).await?;
            self.unsaved.pop_front();
            written += 1;
        }
        if written > 1 {
            info!(written, "Unsaved exchanges persisted");
        }
        Ok(written)
    }

    /// Empties the store, then the session. If the store cannot be cleared
    /// the session is left untouched.
    pub async fn clear(&mut self) -> SyncproResult<()> {
        self.store.clear_all().await?;
        self.cache.clear();
        self.unsaved.clear();
        info!("Chat cleared");
        Ok(())
    }

    /// The plain-text transcript, or `None` when there is nothing to export.
    pub fn export(&self) -> Option<String> {
        if self.cache.is_empty() {
            None
        } else {
            Some(render(self.cache.read_all()))
        }
    }

    pub fn history(&self) -> &[Exchange] {
        self.cache.read_all()
    }

    pub fn pending_count(&self) -> usize {
        self.unsaved.len()
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn is_configured(&self) -> bool {
        self.orchestrator.is_some()
    }
}
