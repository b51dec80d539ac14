//! Conversation pipeline for SyncPro.
//!
//! Detects the language of a message, routes it through English, asks a
//! Gemini/Gemma model for an answer, translates the answer back, and records
//! the exchange through [`ChatService`].

pub mod backends;
pub mod config;
pub mod orchestrator;
pub mod retry;
pub mod service;
pub mod translate;

pub use backends::gemini::GeminiBackend;
pub use backends::GenerationBackend;
pub use config::{GenerationConfig, ModelCatalog, ModelOption, TranslationConfig};
pub use orchestrator::{Orchestrator, Stage};
pub use retry::{RetryPolicy, RetryingBackend};
pub use service::{ChatService, MISSING_API_KEY};
pub use translate::{GoogleTranslateClient, LanguageDetector, Translator};
