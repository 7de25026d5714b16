//! Typed messages decoded from envelopes.
//!
//! Envelopes are turned into these closed sets as soon as they arrive, so
//! dispatch is a `match` instead of string comparison. An unrecognized verb
//! decodes to `None`.

use crate::verbs::{self, fields};
use crate::{AssessmentRecord, AssessmentState, Envelope, ProtocolError, ProtocolResult};

/// Requests the front-end sends to the helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelperRequest {
    /// Render and push the rating image.
    GetImage,
    /// Query the engine and push results, then the rating image.
    Assessment,
    /// Launch the elevated formal assessment and answer with its exit code.
    FormalAssessment,
}

impl HelperRequest {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::GetImage => verbs::GET_IMAGE_REQUEST,
            Self::Assessment => verbs::ASSESSMENT_REQUEST,
            Self::FormalAssessment => verbs::FORMAL_ASSESSMENT_REQUEST,
        }
    }

    /// Decode the verb of an inbound envelope. Unknown or missing verbs yield `None`.
    pub fn from_envelope(envelope: &Envelope) -> Option<Self> {
        match envelope.verb()? {
            verbs::GET_IMAGE_REQUEST => Some(Self::GetImage),
            verbs::ASSESSMENT_REQUEST => Some(Self::Assessment),
            verbs::FORMAL_ASSESSMENT_REQUEST => Some(Self::FormalAssessment),
            _ => None,
        }
    }

    pub fn to_envelope(&self) -> Envelope {
        Envelope::with_verb(self.verb())
    }
}

/// Populated part of an `assessmentResults` envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentReport {
    pub base_score: f32,
    pub rating_state: String,
    pub assessment_time: String,
    pub records: Vec<AssessmentRecord>,
}

/// Contents of an `assessmentResults` envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentResults {
    /// Raw engine state as reported at query time.
    pub engine_state: AssessmentState,
    /// Present only when the engine state carries results.
    pub report: Option<AssessmentReport>,
}

impl AssessmentResults {
    pub fn is_valid(&self) -> bool {
        self.report.is_some()
    }

    pub fn to_envelope(&self) -> ProtocolResult<Envelope> {
        let mut envelope = Envelope::with_verb(verbs::ASSESSMENT_RESULTS)
            .with(fields::ENGINE_STATE, self.engine_state.wire_name());

        match &self.report {
            Some(report) => {
                let count = i32::try_from(report.records.len()).map_err(|_| {
                    ProtocolError::Inconsistent(format!(
                        "too many records: {}",
                        report.records.len()
                    ))
                })?;
                if !report.base_score.is_finite() {
                    return Err(ProtocolError::NonFinite(fields::BASE_SCORE));
                }
                if report.records.iter().any(|record| !record.score.is_finite()) {
                    return Err(ProtocolError::NonFinite(fields::ASSESSMENTS));
                }
                envelope.insert(fields::ASSESSMENT_STATE, verbs::STATE_VALID);
                envelope.insert(fields::ASSESSMENT_COUNT, count);
                envelope.insert(fields::BASE_SCORE, report.base_score);
                envelope.insert(fields::RATING_STATE, report.rating_state.as_str());
                envelope.insert(fields::ASSESSMENT_TIME, report.assessment_time.as_str());
                envelope.insert(fields::ASSESSMENTS, serde_json::to_string(&report.records)?);
            }
            None => {
                envelope.insert(fields::ASSESSMENT_STATE, verbs::STATE_INVALID);
            }
        }

        Ok(envelope)
    }

    pub fn from_envelope(envelope: &Envelope) -> ProtocolResult<Self> {
        let engine_state = envelope
            .get_str(fields::ENGINE_STATE)
            .and_then(AssessmentState::from_wire_name)
            .unwrap_or_default();

        let report = match envelope.require_str(fields::ASSESSMENT_STATE)? {
            verbs::STATE_VALID => {
                let records: Vec<AssessmentRecord> =
                    serde_json::from_str(envelope.require_str(fields::ASSESSMENTS)?)?;
                let count = envelope.require_i32(fields::ASSESSMENT_COUNT)?;
                if usize::try_from(count).ok() != Some(records.len()) {
                    return Err(ProtocolError::Inconsistent(format!(
                        "assessmentCount is {} but {} records were sent",
                        count,
                        records.len()
                    )));
                }
                Some(AssessmentReport {
                    base_score: envelope.require_f32(fields::BASE_SCORE)?,
                    rating_state: envelope.require_str(fields::RATING_STATE)?.to_string(),
                    assessment_time: envelope.require_str(fields::ASSESSMENT_TIME)?.to_string(),
                    records,
                })
            }
            verbs::STATE_INVALID => None,
            other => {
                return Err(ProtocolError::Inconsistent(format!(
                    "unknown assessmentState: {}",
                    other
                )))
            }
        };

        Ok(Self {
            engine_state,
            report,
        })
    }
}

/// Contents of a `getimageResults` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResults {
    /// PNG-encoded rating image.
    pub image_bytes: Vec<u8>,
}

impl ImageResults {
    pub fn to_envelope(&self) -> Envelope {
        Envelope::with_verb(verbs::IMAGE_RESULTS).with(fields::IMAGE_BYTES, self.image_bytes.clone())
    }

    pub fn from_envelope(envelope: &Envelope) -> ProtocolResult<Self> {
        Ok(Self {
            image_bytes: envelope.require_bytes(fields::IMAGE_BYTES)?.to_vec(),
        })
    }
}

/// Messages the helper pushes to the front-end.
#[derive(Debug, Clone, PartialEq)]
pub enum FrontendMessage {
    AssessmentResults(AssessmentResults),
    ImageResults(ImageResults),
}

impl FrontendMessage {
    /// Decode an inbound envelope.
    ///
    /// Returns `Ok(None)` for unknown or missing verbs and an error when a
    /// known verb carries malformed fields.
    pub fn from_envelope(envelope: &Envelope) -> ProtocolResult<Option<Self>> {
        match envelope.verb() {
            Some(verbs::ASSESSMENT_RESULTS) => Ok(Some(Self::AssessmentResults(
                AssessmentResults::from_envelope(envelope)?,
            ))),
            Some(verbs::IMAGE_RESULTS) => Ok(Some(Self::ImageResults(
                ImageResults::from_envelope(envelope)?,
            ))),
            _ => Ok(None),
        }
    }

    pub fn to_envelope(&self) -> ProtocolResult<Envelope> {
        match self {
            Self::AssessmentResults(results) => results.to_envelope(),
            Self::ImageResults(image) => Ok(image.to_envelope()),
        }
    }
}

/// Direct response to `formalWinSatRequest`. Carries no verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormalAssessmentResponse {
    pub exit_code: i32,
}

impl FormalAssessmentResponse {
    pub fn to_envelope(&self) -> Envelope {
        Envelope::new().with(fields::EXIT_CODE, self.exit_code)
    }

    pub fn from_envelope(envelope: &Envelope) -> ProtocolResult<Self> {
        Ok(Self {
            exit_code: envelope.require_i32(fields::EXIT_CODE)?,
        })
    }
}
