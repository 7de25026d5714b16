//! Engine error types.

use thiserror::Error;

/// Generic failure code reported by the engine on completion.
pub const E_FAIL: i32 = 0x8000_4005_u32 as i32;

/// Engine error type.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine could not be reached or its data could not be read
    #[error("Assessment engine unavailable: {0}")]
    Unavailable(String),

    /// A specific query failed
    #[error("Assessment query failed: {0}")]
    Query(String),

    /// The rating image could not be produced or read
    #[error("Rendering failed: {0}")]
    Render(String),

    /// A formal assessment could not be started
    #[error("Formal assessment could not start: {0}")]
    Initiation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
