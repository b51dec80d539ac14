//! `syncpro.toml` loading and environment overrides.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use syncpro_agent::{GenerationConfig, ModelCatalog, ModelOption, TranslationConfig};
use syncpro_core::{SyncproError, SyncproResult, DEFAULT_USER};
use syncpro_session::{InMemoryTranscriptStore, SqliteTranscriptStore, TranscriptStore};

/// Environment variable holding the Google API key.
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
/// Environment variable holding the transcript database URL.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

#[derive(Debug, Deserialize)]
pub struct SyncproConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Label of the model preselected in a new session.
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    /// Replaces the built-in model catalog when non-empty.
    #[serde(default)]
    pub models: Vec<ModelOption>,
}

fn default_database_url() -> String {
    "sqlite://syncpro.db".to_string()
}
fn default_user() -> String {
    DEFAULT_USER.to_string()
}

impl Default for SyncproConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            default_model: None,
            user: default_user(),
            generation: GenerationConfig::default(),
            translation: TranslationConfig::default(),
            models: Vec::new(),
        }
    }
}

impl SyncproConfig {
    /// Reads `path`, or returns the defaults when the file does not exist.
    pub fn load(path: &Path) -> SyncproResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            SyncproError::Config(format!(
                "Failed to read config '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            SyncproError::Config(format!(
                "Failed to parse config '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies `GOOGLE_API_KEY` and `DATABASE_URL`, which win over the file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_VAR).filter(|k| !k.trim().is_empty()) {
            self.generation.api_key = Some(key);
        }
        if let Some(url) = lookup(DATABASE_URL_VAR).filter(|u| !u.trim().is_empty()) {
            self.database_url = url;
        }
    }

    /// The transcript store for this run. `ephemeral` keeps everything in
    /// memory and never touches `database_url`.
    pub fn open_store(&self, ephemeral: bool) -> SyncproResult<Arc<dyn TranscriptStore>> {
        if ephemeral {
            tracing::info!("Ephemeral run, transcript kept in memory");
            return Ok(Arc::new(InMemoryTranscriptStore::new()));
        }
        let sqlite = SqliteTranscriptStore::open(&self.database_url)?.with_user(self.user.clone());
        tracing::info!(location = ?sqlite.location(), user = %self.user, "Transcript store ready");
        Ok(Arc::new(sqlite))
    }

    pub fn catalog(&self) -> SyncproResult<ModelCatalog> {
        if self.models.is_empty() {
            Ok(ModelCatalog::default())
        } else {
            ModelCatalog::new(self.models.clone())
        }
    }

    /// The configured default model, checked against `catalog`.
    pub fn default_model<'a>(&self, catalog: &'a ModelCatalog) -> SyncproResult<&'a ModelOption> {
        match &self.default_model {
            Some(label) => catalog.get(label).map_err(|_| {
                SyncproError::Config(format!(
                    "default_model '{label}' is not in the model catalog"
                ))
            }),
            None => Ok(catalog.default_model()),
        }
    }
}
