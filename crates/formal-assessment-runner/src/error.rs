//! Runner error types.

use assessment_engine::EngineError;
use thiserror::Error;

/// Exit code when the assessment could not be started.
pub const INITIATION_FAILED_EXIT_CODE: u8 = 2;

/// Runner error type.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The engine refused to start the assessment
    #[error("Could not start the formal assessment: {0}")]
    Initiation(#[from] EngineError),

    /// The engine dropped its events without reporting completion
    #[error("Assessment ended without a completion report")]
    NoCompletion,
}

impl RunnerError {
    pub fn exit_code(&self) -> u8 {
        INITIATION_FAILED_EXIT_CODE
    }
}

/// Result type alias using RunnerError.
pub type RunnerResult<T> = Result<T, RunnerError>;
