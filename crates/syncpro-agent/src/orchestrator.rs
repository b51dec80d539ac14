use crate::backends::GenerationBackend;
use crate::config::ModelOption;
use crate::translate::{LanguageDetector, Translator};
use std::sync::Arc;
use syncpro_core::{Exchange, SyncproError, SyncproResult, PIVOT_LANGUAGE};
use tracing::{debug, info, warn};

/// Outcome of a pipeline stage that degrades instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage<T> {
    /// The stage produced its value.
    Resolved(T),
    /// The stage failed; `value` is the documented substitute.
    Fallback { value: T, reason: String },
}

impl<T> Stage<T> {
    /// Runs a fallible stage, substituting `fallback` on error.
    pub fn from_result(result: SyncproResult<T>, fallback: impl FnOnce() -> T) -> Self {
        match result {
            Ok(value) => Stage::Resolved(value),
            Err(e) => Stage::Fallback {
                value: fallback(),
                reason: e.to_string(),
            },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Stage::Fallback { .. })
    }

    pub fn into_value(self) -> T {
        match self {
            Stage::Resolved(value) | Stage::Fallback { value, .. } => value,
        }
    }
}

impl Stage<String> {
    /// A translation that came back empty is treated like a failed one.
    fn translated(result: SyncproResult<String>, original: &str) -> Self {
        match result {
            Ok(text) if !text.trim().is_empty() => Stage::Resolved(text),
            Ok(_) => Stage::Fallback {
                value: original.to_string(),
                reason: "empty translation".into(),
            },
            Err(e) => Stage::Fallback {
                value: original.to_string(),
                reason: e.to_string(),
            },
        }
    }
}

/// Turns one utterance into one finished exchange.
///
/// detect → translate to the pivot language → generate → translate back.
/// Only generation can abort the pipeline; the other stages fall back.
/// Nothing is persisted here.
pub struct Orchestrator {
    detector: Arc<dyn LanguageDetector>,
    translator: Arc<dyn Translator>,
    generator: Arc<dyn GenerationBackend>,
}

impl Orchestrator {
    pub fn new(
        detector: Arc<dyn LanguageDetector>,
        translator: Arc<dyn Translator>,
        generator: Arc<dyn GenerationBackend>,
    ) -> Self {
        Self {
            detector,
            translator,
            generator,
        }
    }

    pub async fn process(&self, question: &str, model: &ModelOption) -> SyncproResult<Exchange> {
        if question.trim().is_empty() {
            return Err(SyncproError::Validation("message is empty".into()));
        }

        let language = self.detect(question).await;
        if let Stage::Fallback { reason, .. } = &language {
            warn!(reason = %reason, "Language detection failed, assuming {PIVOT_LANGUAGE}");
        }
        let language = language.into_value();
        let is_pivot = language.eq_ignore_ascii_case(PIVOT_LANGUAGE);

        let prompt = if is_pivot {
            question.to_string()
        } else {
            let stage = self.translate(question, PIVOT_LANGUAGE).await;
            if let Stage::Fallback { reason, .. } = &stage {
                warn!(language = %language, reason = %reason, "Inbound translation failed, sending original text");
            }
            stage.into_value()
        };

        info!(model = %model.id, language = %language, "Generating answer");
        let pivot_answer = self.generator.generate(&model.id, &prompt).await?;

        let answer = if is_pivot {
            pivot_answer
        } else {
            let stage = self.translate(&pivot_answer, &language).await;
            if let Stage::Fallback { reason, .. } = &stage {
                warn!(language = %language, reason = %reason, "Outbound translation failed, keeping untranslated answer");
            }
            stage.into_value()
        };

        debug!(answer_chars = answer.len(), "Exchange assembled");
        Ok(Exchange::new(question, answer, &model.label, language))
    }

    /// Detected language as the service reported it (trimmed, case kept), or
    /// the pivot language when detection fails or returns nothing.
    pub async fn detect(&self, text: &str) -> Stage<String> {
        let result = self
            .detector
            .detect(text)
            .await
            .map(|lang| lang.trim().to_string())
            .and_then(|lang| {
                if lang.is_empty() {
                    Err(SyncproError::Translation("empty language code".into()))
                } else {
                    Ok(lang)
                }
            });
        Stage::from_result(result, || PIVOT_LANGUAGE.to_string())
    }

    /// Translation of `text`, or `text` itself when translation fails or
    /// comes back empty.
    pub async fn translate(&self, text: &str, target_language: &str) -> Stage<String> {
        Stage::translated(self.translator.translate(text, target_language).await, text)
    }
}
