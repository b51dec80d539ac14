use thiserror::Error;

/// A convenience `Result` alias using [`SyncproError`].
pub type SyncproResult<T> = Result<T, SyncproError>;

/// Top-level error type for SyncPro.
///
/// The first group of variants mirrors the user-facing taxonomy of the chat
/// actions. `Json` and `Io` come from `?` on serde and filesystem calls.
#[derive(Error, Debug)]
pub enum SyncproError {
    /// Missing credential or invalid configuration. Fatal to the current
    /// action only; no state is mutated.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected user input (empty message, unknown model label).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Language detection or translation failed. The orchestrator always
    /// replaces this with a fallback value; it never reaches the user.
    #[error("Translation error: {0}")]
    Translation(String),

    /// The generation service failed. Aborts the pipeline.
    #[error("Generation error: {0}")]
    Generation(String),

    /// The transcript store could not append, list or clear.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Misuse of the in-memory session (e.g. hydrating twice).
    #[error("Session error: {0}")]
    Session(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
