use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use syncpro_core::{SyncproError, SyncproResult};

/// One selectable generation model: what the user sees and what the API gets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOption {
    pub label: String,
    pub id: String,
}

impl ModelOption {
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
        }
    }
}

/// Fixed, ordered set of supported models. The first entry is the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    models: Vec<ModelOption>,
}

impl ModelCatalog {
    /// Builds a catalog from configured entries. Labels must be unique and
    /// the list non-empty.
    pub fn new(models: Vec<ModelOption>) -> SyncproResult<Self> {
        if models.is_empty() {
            return Err(SyncproError::Config("model catalog is empty".into()));
        }
        for (i, m) in models.iter().enumerate() {
            if m.label.trim().is_empty() || m.id.trim().is_empty() {
                return Err(SyncproError::Config(format!(
                    "model entry {} has an empty label or id",
                    i + 1
                )));
            }
            if models[..i].iter().any(|other| other.label == m.label) {
                return Err(SyncproError::Config(format!(
                    "duplicate model label '{}'",
                    m.label
                )));
            }
        }
        Ok(Self { models })
    }

    /// Looks up a model by its display label.
    pub fn get(&self, label: &str) -> SyncproResult<&ModelOption> {
        self.models
            .iter()
            .find(|m| m.label == label)
            .ok_or_else(|| {
                SyncproError::Validation(format!(
                    "unknown model '{label}'; choose one of: {}",
                    self.labels().join(", ")
                ))
            })
    }

    pub fn default_model(&self) -> &ModelOption {
        &self.models[0]
    }

    pub fn labels(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.label.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelOption> {
        self.models.iter()
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: vec![
                ModelOption::new("Gemma 12B Instruct", "models/gemma-3-12b-it"),
                ModelOption::new("Gemini 1.5 Flash", "models/gemini-1.5-flash"),
                ModelOption::new("Gemini 1.5 Pro", "models/gemini-1.5-pro"),
                ModelOption::new(
                    "Gemini 2.5 Pro Preview",
                    "models/gemini-2.5-pro-preview-06-05",
                ),
            ],
        }
    }
}

/// Settings for the generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Filled from `GOOGLE_API_KEY` when absent from the file.
    #[serde(default)]
    pub api_key: Option<String>,
    pub api_base_url: Option<String>,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry_policy: Option<RetryPolicy>,
}

fn default_generation_timeout() -> u64 {
    60
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: None,
            timeout_secs: default_generation_timeout(),
            retry_policy: None,
        }
    }
}

impl GenerationConfig {
    pub fn base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or("https://generativelanguage.googleapis.com")
    }

    /// The API key, if one is configured and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

/// Settings for the detection/translation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    pub api_base_url: Option<String>,
    #[serde(default = "default_translation_timeout")]
    pub timeout_secs: u64,
}

fn default_translation_timeout() -> u64 {
    10
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            timeout_secs: default_translation_timeout(),
        }
    }
}

impl TranslationConfig {
    pub fn base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or("https://translate.googleapis.com")
    }
}
