//! Assessment data shapes.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Long-date form, e.g. `Thursday, October 15, 2026`.
const LONG_DATE_FORMAT: &str = "%A, %B %-d, %Y";
/// Long-time form, e.g. `5:52:10 PM`.
const LONG_TIME_FORMAT: &str = "%-I:%M:%S %p";
/// Parse form for `<long date>  <long time>`.
const ASSESSMENT_TIME_PARSE_FORMAT: &str = "%A, %B %d, %Y %I:%M:%S %p";

/// State of the engine's stored assessment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssessmentState {
    #[default]
    #[serde(rename = "WINSAT_ASSESSMENT_STATE_UNKNOWN")]
    Unknown,
    #[serde(rename = "WINSAT_ASSESSMENT_STATE_VALID")]
    Valid,
    #[serde(rename = "WINSAT_ASSESSMENT_STATE_INCOHERENT_WITH_HARDWARE")]
    IncoherentWithHardware,
    #[serde(rename = "WINSAT_ASSESSMENT_STATE_NOT_AVAILABLE")]
    NotAvailable,
    #[serde(rename = "WINSAT_ASSESSMENT_STATE_INVALID")]
    Invalid,
}

impl AssessmentState {
    /// Name used in the `winsatAssessmentState` field.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Unknown => "WINSAT_ASSESSMENT_STATE_UNKNOWN",
            Self::Valid => "WINSAT_ASSESSMENT_STATE_VALID",
            Self::IncoherentWithHardware => "WINSAT_ASSESSMENT_STATE_INCOHERENT_WITH_HARDWARE",
            Self::NotAvailable => "WINSAT_ASSESSMENT_STATE_NOT_AVAILABLE",
            Self::Invalid => "WINSAT_ASSESSMENT_STATE_INVALID",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "WINSAT_ASSESSMENT_STATE_UNKNOWN" => Some(Self::Unknown),
            "WINSAT_ASSESSMENT_STATE_VALID" => Some(Self::Valid),
            "WINSAT_ASSESSMENT_STATE_INCOHERENT_WITH_HARDWARE" => {
                Some(Self::IncoherentWithHardware)
            }
            "WINSAT_ASSESSMENT_STATE_NOT_AVAILABLE" => Some(Self::NotAvailable),
            "WINSAT_ASSESSMENT_STATE_INVALID" => Some(Self::Invalid),
            _ => None,
        }
    }

    /// Numeric code used by the engine.
    pub fn code(&self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::Valid => 1,
            Self::IncoherentWithHardware => 2,
            Self::NotAvailable => 3,
            Self::Invalid => 4,
        }
    }

    /// Whether records, base score and rating label can be read in this state.
    pub fn has_results(&self) -> bool {
        matches!(self, Self::Valid | Self::IncoherentWithHardware)
    }
}

/// Assessment categories, in the engine's declared order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    Memory,
    Cpu,
    Disk,
    D3d,
    Graphics,
}

impl AssessmentKind {
    /// Every category, in declared order.
    pub const ALL: [AssessmentKind; 5] = [
        AssessmentKind::Memory,
        AssessmentKind::Cpu,
        AssessmentKind::Disk,
        AssessmentKind::D3d,
        AssessmentKind::Graphics,
    ];

    pub fn code(&self) -> i32 {
        match self {
            Self::Memory => 0,
            Self::Cpu => 1,
            Self::Disk => 2,
            Self::D3d => 3,
            Self::Graphics => 4,
        }
    }
}

/// Size of the rendered rating image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitmapSize {
    #[default]
    Normal,
    Small,
}

/// One category's score, title and description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssessmentRecord {
    pub score: f32,
    pub title: String,
    pub description: String,
}

impl AssessmentRecord {
    pub fn new(score: f32, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            score,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Join the engine's assessment date with a wall-clock time.
///
/// The engine only records a date; appending the time of the query lets a
/// receiver tell a fresh result from a repeated one on the same day.
pub fn format_assessment_time(date: NaiveDate, time: NaiveTime) -> String {
    format!(
        "{}  {}",
        date.format(LONG_DATE_FORMAT),
        time.format(LONG_TIME_FORMAT)
    )
}

/// Parse a value produced by [`format_assessment_time`].
pub fn parse_assessment_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), ASSESSMENT_TIME_PARSE_FORMAT).ok()
}

/// Render a score with exactly one decimal place (`6` -> `"6.0"`).
pub fn format_score(score: f32) -> String {
    format!("{:.1}", score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_wire_names_roundtrip() {
        for state in [
            AssessmentState::Unknown,
            AssessmentState::Valid,
            AssessmentState::IncoherentWithHardware,
            AssessmentState::NotAvailable,
            AssessmentState::Invalid,
        ] {
            assert_eq!(AssessmentState::from_wire_name(state.wire_name()), Some(state));
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.wire_name()));
        }
        assert_eq!(AssessmentState::from_wire_name("VALID"), None);
    }

    #[test]
    fn test_only_valid_and_incoherent_have_results() {
        assert!(AssessmentState::Valid.has_results());
        assert!(AssessmentState::IncoherentWithHardware.has_results());
        assert!(!AssessmentState::Unknown.has_results());
        assert!(!AssessmentState::NotAvailable.has_results());
        assert!(!AssessmentState::Invalid.has_results());
    }

    #[test]
    fn test_kinds_in_declared_order() {
        let codes: Vec<i32> = AssessmentKind::ALL.iter().map(|k| k.code()).collect();
        assert_eq!(codes, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_record_uses_pascal_case_fields() {
        let record = AssessmentRecord::new(7.8, "Memory", "Memory operations per second");
        let json = serde_json::to_string(&record).unwrap();

        assert!(json.contains("\"Score\":7.8"));
        assert!(json.contains("\"Title\":\"Memory\""));
        assert!(json.contains("\"Description\":\"Memory operations per second\""));
    }

    #[test]
    fn test_format_assessment_time() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        let time = NaiveTime::from_hms_opt(17, 52, 10).unwrap();

        assert_eq!(
            format_assessment_time(date, time),
            "Thursday, October 15, 2026  5:52:10 PM"
        );
    }

    #[test]
    fn test_parse_assessment_time_reads_formatted_value() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let time = NaiveTime::from_hms_opt(9, 5, 0).unwrap();
        let formatted = format_assessment_time(date, time);

        let parsed = parse_assessment_time(&formatted).unwrap();
        assert_eq!(parsed.date(), date);
        assert_eq!(parsed.time(), time);
    }

    #[test]
    fn test_parse_assessment_time_rejects_garbage() {
        assert!(parse_assessment_time("yesterday").is_none());
        assert!(parse_assessment_time("").is_none());
    }

    #[test]
    fn test_format_score_one_decimal() {
        assert_eq!(format_score(6.0), "6.0");
        assert_eq!(format_score(7.86), "7.9");
        assert_eq!(format_score(0.0), "0.0");
    }
}
