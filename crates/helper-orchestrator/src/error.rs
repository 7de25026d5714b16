//! Helper error types.

use assessment_engine::EngineError;
use bridge_channel::ChannelError;
use envelope_protocol_types::ProtocolError;
use thiserror::Error;

/// Helper error type.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// The engine could not answer a query
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(#[from] EngineError),

    /// Sending to the front-end failed
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// An envelope could not be built
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The rating image could not be encoded
    #[error("Image encoding failed: {0}")]
    Encode(String),
}

impl OrchestratorError {
    /// Channel faults end the helper; everything else is reported and survived.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Channel(_))
    }
}

/// Result type alias using OrchestratorError.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
