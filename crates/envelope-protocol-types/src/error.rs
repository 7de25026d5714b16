//! Protocol error types.

use thiserror::Error;

/// Errors raised while encoding or decoding envelopes and frames.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field is absent from the envelope
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A field is present but carries the wrong value type
    #[error("Field {field} has type {actual}, expected {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    /// A float field is NaN or infinite and has no JSON form
    #[error("Field {0} is not a finite number")]
    NonFinite(&'static str),

    /// Envelope fields disagree with each other
    #[error("Inconsistent envelope: {0}")]
    Inconsistent(String),
}

/// Result type alias using ProtocolError.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
