pub mod gemini;

use async_trait::async_trait;
use syncpro_core::{SyncproError, SyncproResult};

const STATUS_PREFIX: &str = "status=";
const TIMEOUT_PREFIX: &str = "timeout: ";

/// Trait for text-generation backends.
///
/// `model_id` is the backend identifier taken from the model catalog, not the
/// display label. Implementations return the generated text, which may be
/// empty; any failure is reported as `SyncproError::Generation`. HTTP
/// backends build those errors with [`status_error`] and [`timeout_error`]
/// so the retry layer can classify them.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, model_id: &str, prompt: &str) -> SyncproResult<String>;
}

/// A generation failure carrying the HTTP status the service answered with.
pub fn status_error(status: u16, detail: impl std::fmt::Display) -> SyncproError {
    SyncproError::Generation(format!("{STATUS_PREFIX}{status} {detail}"))
}

/// A generation failure caused by the request deadline.
pub fn timeout_error(detail: impl std::fmt::Display) -> SyncproError {
    SyncproError::Generation(format!("{TIMEOUT_PREFIX}{detail}"))
}

/// The HTTP status recorded by [`status_error`], if any. Only the leading
/// prefix is read; the rest of the message is free text.
pub fn error_status(err: &SyncproError) -> Option<u16> {
    let SyncproError::Generation(msg) = err else {
        return None;
    };
    let rest = msg.strip_prefix(STATUS_PREFIX)?;
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// Whether the error was built by [`timeout_error`].
pub fn is_timeout(err: &SyncproError) -> bool {
    matches!(err, SyncproError::Generation(msg) if msg.starts_with(TIMEOUT_PREFIX))
}
