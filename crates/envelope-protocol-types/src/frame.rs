//! Transport frames.
//!
//! Frames are newline-delimited JSON objects. A connection starts with an
//! `open`/`opened` handshake; after that either side may send `request`,
//! `response` or `notify` frames.

use crate::Envelope;
use serde::{Deserialize, Serialize};

/// Outcome of opening a connection to a named service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Success,
    /// No endpoint exists for the service.
    AppNotInstalled,
    /// The endpoint exists but nothing is accepting connections.
    AppUnavailable,
    /// The endpoint does not host the requested service.
    AppServiceUnavailable,
    /// The caller's identity was not accepted.
    NotAuthorized,
    Unknown,
}

impl ConnectionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::AppNotInstalled => "app not installed",
            Self::AppUnavailable => "app unavailable",
            Self::AppServiceUnavailable => "app service unavailable",
            Self::NotAuthorized => "not authorized",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One line on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frame {
    /// First frame sent by the connecting side.
    Open {
        service_name: String,
        peer_identity: String,
    },
    /// Listener's answer to `open`.
    Opened { status: ConnectionStatus },
    /// An envelope that expects exactly one correlated response.
    Request { id: String, message: Envelope },
    /// The answer to a request with the same id.
    Response { id: String, message: Envelope },
    /// A fire-and-forget envelope.
    Notify { message: Envelope },
}

impl Frame {
    /// Create a request frame with an auto-generated correlation id.
    pub fn request(message: Envelope) -> Self {
        Self::Request {
            id: uuid::Uuid::new_v4().to_string(),
            message,
        }
    }

    pub fn response(id: &str, message: Envelope) -> Self {
        Self::Response {
            id: id.to_string(),
            message,
        }
    }

    pub fn notify(message: Envelope) -> Self {
        Self::Notify { message }
    }

    /// Correlation id of a request or response frame.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Request { id, .. } | Self::Response { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Short name of the frame kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open",
            Self::Opened { .. } => "opened",
            Self::Request { .. } => "request",
            Self::Response { .. } => "response",
            Self::Notify { .. } => "notify",
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        let a = Frame::request(Envelope::with_verb("assessmentRequest"));
        let b = Frame::request(Envelope::with_verb("assessmentRequest"));

        match (a, b) {
            (Frame::Request { id: a, .. }, Frame::Request { id: b, .. }) => {
                assert_ne!(a, b);
                assert!(!a.is_empty());
            }
            _ => panic!("expected request frames"),
        }
    }

    #[test]
    fn test_id_only_on_correlated_frames() {
        let response = Frame::response("abc", Envelope::new());
        assert_eq!(response.id(), Some("abc"));
        assert!(Frame::request(Envelope::new()).id().is_some());
        assert_eq!(Frame::notify(Envelope::new()).id(), None);
    }

    #[test]
    fn test_frame_json_is_tagged_by_kind() {
        let frame = Frame::notify(Envelope::with_verb("getimageResults"));
        let json = frame.to_json().unwrap();

        assert!(json.starts_with(r#"{"kind":"notify""#));
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_open_frame_from_json() {
        let json = r#"{"kind":"open","service_name":"CommunicationService","peer_identity":"wei"}"#;
        let frame = Frame::from_json(json).unwrap();

        assert_eq!(
            frame,
            Frame::Open {
                service_name: "CommunicationService".to_string(),
                peer_identity: "wei".to_string(),
            }
        );
    }

    #[test]
    fn test_opened_status_serialization() {
        let frame = Frame::Opened {
            status: ConnectionStatus::AppServiceUnavailable,
        };
        let json = frame.to_json().unwrap();
        assert!(json.contains(r#""status":"app_service_unavailable""#));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(Frame::from_json(r#"{"kind":"bogus"}"#).is_err());
        assert!(Frame::from_json("not json").is_err());
    }
}
