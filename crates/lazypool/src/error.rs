//! Error types for the dispatch engine.
//!
//! This module defines the central `Error` enum, which captures every failure
//! the engine can report. Only two of them end a run: a rejected configuration
//! (raised before anything is dispatched) and a Source I/O failure. The
//! remaining variants are scoped to a single item and surface through
//! [`Outcome::Failed`](crate::Outcome::Failed).
//!
//! ## Error Cases
//! - `InvalidConfig`: The pool configuration was rejected.
//! - `Source`: Reading the input stream failed.
//! - `Processing`: The processor returned an error for one item.
//! - `Panicked`: The processor panicked while handling one item.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the dispatch engine.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The pool configuration is unusable (e.g. zero workers).
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The input stream failed; no further items will be produced.
    #[error("Source error: {context}")]
    Source { context: String },

    /// The processor rejected an item.
    #[error("Processing failed: {reason}")]
    Processing { reason: String },

    /// The processor panicked. The worker survives and keeps serving items.
    #[error("Processor panicked: {reason}")]
    Panicked { reason: String },
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Source {
            context: err.to_string(),
        }
    }
}
