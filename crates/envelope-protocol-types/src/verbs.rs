//! Verb and field names used on the wire.

/// Field holding the verb of an envelope.
pub const VERB: &str = "verb";

// Front-end -> helper
pub const GET_IMAGE_REQUEST: &str = "getimageRequest";
pub const ASSESSMENT_REQUEST: &str = "assessmentRequest";
pub const FORMAL_ASSESSMENT_REQUEST: &str = "formalWinSatRequest";

// Helper -> front-end
pub const ASSESSMENT_RESULTS: &str = "assessmentResults";
pub const IMAGE_RESULTS: &str = "getimageResults";

/// Field names carried by `assessmentResults`.
pub mod fields {
    pub const ENGINE_STATE: &str = "winsatAssessmentState";
    pub const ASSESSMENT_STATE: &str = "assessmentState";
    pub const ASSESSMENT_COUNT: &str = "assessmentCount";
    pub const BASE_SCORE: &str = "basescore";
    pub const RATING_STATE: &str = "ratingState";
    pub const ASSESSMENT_TIME: &str = "assessmentTime";
    pub const ASSESSMENTS: &str = "assessments";
    pub const IMAGE_BYTES: &str = "imagebytes";
    pub const EXIT_CODE: &str = "exitcode";
}

/// Value of `assessmentState` when records are present.
pub const STATE_VALID: &str = "valid";
/// Value of `assessmentState` when the engine has nothing to report.
pub const STATE_INVALID: &str = "invalid";
