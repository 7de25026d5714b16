//! Bidirectional message channel between the helper and the front-end.
//!
//! This crate provides:
//! - Unix domain socket listener hosting a named service
//! - `open` handshake with connection status
//! - Fire-and-forget `notify` and correlated `request`/response
//! - Ordered inbound delivery with per-request responders

mod channel;
mod error;
mod listener;

pub use channel::{Channel, ChannelHandle, ChannelOptions, EnvelopeSink, InboundMessage, Responder};
pub use envelope_protocol_types::{ConnectionStatus, Envelope};
pub use error::{ChannelError, ChannelResult};
pub use listener::ChannelListener;
