//! Pure protocol types shared by the helper and the front-end.
//!
//! This crate provides:
//! - The wire [`Envelope`]: a flat, string-keyed bag of primitive values
//! - Typed verb models decoded from envelopes ([`HelperRequest`], [`FrontendMessage`])
//! - Assessment data shapes carried inside envelopes
//! - NDJSON [`Frame`]s used by the channel transport

mod assessment;
mod envelope;
mod error;
mod frame;
mod messages;
pub mod verbs;

pub use assessment::{
    format_assessment_time, format_score, parse_assessment_time, AssessmentKind,
    AssessmentRecord, AssessmentState, BitmapSize,
};
pub use envelope::{Envelope, Value};
pub use error::{ProtocolError, ProtocolResult};
pub use frame::{ConnectionStatus, Frame};
pub use messages::{
    AssessmentReport, AssessmentResults, FormalAssessmentResponse, FrontendMessage,
    HelperRequest, ImageResults,
};
