//! Channel error types.

use envelope_protocol_types::ConnectionStatus;
use std::time::Duration;
use thiserror::Error;

/// Channel error type.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The service refused or could not accept the connection
    #[error("Open failed: {0}")]
    OpenFailed(ConnectionStatus),

    /// The handshake did not finish in time
    #[error("Open timed out after {0:?}")]
    OpenTimeout(Duration),

    /// Peer sent something other than the expected handshake frame
    #[error("Handshake error: {0}")]
    Handshake(String),

    /// A request from this side is still waiting for its response
    #[error("A request is already in flight")]
    RequestInFlight,

    /// The peer did not answer a request in time
    #[error("Request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// Connection closed
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type alias using ChannelError.
pub type ChannelResult<T> = Result<T, ChannelError>;
