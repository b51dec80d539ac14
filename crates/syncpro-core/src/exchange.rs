use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Language every non-English utterance is routed through before generation.
pub const PIVOT_LANGUAGE: &str = "en";

/// The single implicit user identity stored with every row.
pub const DEFAULT_USER: &str = "default_user";

/// One question/answer turn of a conversation.
///
/// Exchanges are created once by the conversation pipeline and never edited;
/// they disappear only when the whole transcript is cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    /// The user's text exactly as submitted.
    pub question: String,
    /// The final answer, in the language of the question when translation
    /// succeeded. May be empty if the model returned nothing.
    pub answer: String,
    /// Display label of the model that produced the answer.
    pub model_label: String,
    /// Detected language code of the question (`en` when detection failed).
    pub language: String,
    /// Assigned by the transcript store at append time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Exchange {
    /// Creates an exchange that has not been persisted yet.
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        model_label: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            model_label: model_label.into(),
            language: language.into(),
            timestamp: None,
        }
    }

    /// Returns a copy stamped with the given time.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// True when the question was asked in the pivot language.
    pub fn is_pivot_language(&self) -> bool {
        self.language.eq_ignore_ascii_case(PIVOT_LANGUAGE)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_creation() {
        let ex = Exchange::new("Hola", "Hello", "ModelX", "es");
        assert_eq!(ex.question, "Hola");
        assert_eq!(ex.answer, "Hello");
        assert_eq!(ex.model_label, "ModelX");
        assert_eq!(ex.language, "es");
        assert!(ex.timestamp.is_none());
        assert!(!ex.is_pivot_language());
    }

    #[test]
    fn test_unstamped_exchange_omits_timestamp() {
        let ex = Exchange::new("hi", "hello", "ModelX", "en");
        let json = serde_json::to_value(&ex).unwrap();
        assert!(json.get("timestamp").is_none());

        let back: Exchange = serde_json::from_value(json).unwrap();
        assert_eq!(back, ex);
    }
}
