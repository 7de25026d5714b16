//! Front-end error types.

use bridge_channel::ChannelError;
use envelope_protocol_types::ProtocolError;
use thiserror::Error;

/// Front-end error type.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The channel to the helper failed
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The helper sent an envelope that could not be decoded
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The helper process could not be started
    #[error("Helper launch failed: {0}")]
    Launch(String),
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;
