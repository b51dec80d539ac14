//! Core types and error definitions for SyncPro.
//!
//! This crate provides the foundational types shared across all SyncPro crates:
//! the workspace error type and the [`Exchange`] record that flows from the
//! conversation pipeline into the session cache and the transcript store.
//!
//! # Main types
//!
//! - [`SyncproError`]: Unified error enum for all SyncPro subsystems.
//! - [`SyncproResult`]: Convenience alias for `Result<T, SyncproError>`.
//! - [`Exchange`]: One question/answer turn of a conversation.

/// Error taxonomy shared by every crate in the workspace.
pub mod error;
/// The question/answer record and language constants.
pub mod exchange;

pub use error::{SyncproError, SyncproResult};
pub use exchange::{Exchange, DEFAULT_USER, PIVOT_LANGUAGE};
