//! What the front-end currently shows.

use chrono::NaiveDateTime;
use envelope_protocol_types::{
    format_assessment_time, format_score, parse_assessment_time, AssessmentRecord,
    AssessmentResults, AssessmentState, ImageResults,
};
use tracing::warn;

/// Latest assessment and rating image received from the helper.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionView {
    pub engine_state: AssessmentState,
    pub records: Vec<AssessmentRecord>,
    pub base_score: Option<f32>,
    pub rating_state: Option<String>,
    pub assessment_time: Option<NaiveDateTime>,
    /// PNG bytes of the rating image.
    pub rating_image: Option<Vec<u8>>,
}

impl SessionView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the assessment part of the view. An invalid result clears it.
    pub fn apply_results(&mut self, results: AssessmentResults) {
        self.engine_state = results.engine_state;
        match results.report {
            Some(report) => {
                self.assessment_time = parse_assessment_time(&report.assessment_time);
                if self.assessment_time.is_none() {
                    warn!(value = %report.assessment_time, "Unparseable assessment time");
                }
                self.records = report.records;
                self.base_score = Some(report.base_score);
                self.rating_state = Some(report.rating_state);
            }
            None => {
                self.records.clear();
                self.base_score = None;
                self.rating_state = None;
                self.assessment_time = None;
            }
        }
    }

    pub fn apply_image(&mut self, image: ImageResults) {
        self.rating_image = Some(image.image_bytes);
    }

    pub fn has_results(&self) -> bool {
        self.base_score.is_some()
    }

    /// Index of the lowest subscore. Ties go to the first one.
    pub fn lowest_subscore_index(&self) -> Option<usize> {
        let mut lowest: Option<(usize, f32)> = None;
        for (index, record) in self.records.iter().enumerate() {
            if lowest.map_or(true, |(_, score)| record.score < score) {
                lowest = Some((index, record.score));
            }
        }
        lowest.map(|(index, _)| index)
    }

    pub fn formatted_time(&self) -> Option<String> {
        self.assessment_time
            .map(|t| format_assessment_time(t.date(), t.time()))
    }

    /// Plain-text rendering for the console.
    pub fn render(&self) -> String {
        let Some(base_score) = self.base_score else {
            return format!("No assessment available ({})", self.engine_state.wire_name());
        };

        let mut out = String::new();
        out.push_str(&format!(
            "{}: {}\n",
            self.rating_state.as_deref().unwrap_or("Rating"),
            format_score(base_score)
        ));
        if let Some(time) = self.formatted_time() {
            out.push_str(&format!("Assessed: {}\n", time));
        }

        let lowest = self.lowest_subscore_index();
        for (index, record) in self.records.iter().enumerate() {
            let marker = if Some(index) == lowest { '>' } else { ' ' };
            out.push_str(&format!(
                "{} {:<10} {:>4}  {}\n",
                marker,
                record.title,
                format_score(record.score),
                record.description
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envelope_protocol_types::AssessmentReport;

    fn report(scores: &[f32]) -> AssessmentResults {
        AssessmentResults {
            engine_state: AssessmentState::Valid,
            report: Some(AssessmentReport {
                base_score: 6.0,
                rating_state: "Windows Experience Index".to_string(),
                assessment_time: "Thursday, October 15, 2026  5:52:10 PM".to_string(),
                records: scores
                    .iter()
                    .enumerate()
                    .map(|(i, s)| AssessmentRecord::new(*s, format!("C{i}"), "desc"))
                    .collect(),
            }),
        }
    }

    #[test]
    fn test_lowest_subscore_prefers_first_minimum() {
        let mut view = SessionView::new();
        view.apply_results(report(&[7.1, 5.9, 6.3, 5.9, 8.0]));
        assert_eq!(view.lowest_subscore_index(), Some(1));
    }

    #[test]
    fn test_lowest_subscore_of_empty_view() {
        assert_eq!(SessionView::new().lowest_subscore_index(), None);
    }

    #[test]
    fn test_apply_results_parses_time() {
        let mut view = SessionView::new();
        view.apply_results(report(&[6.0]));

        assert!(view.has_results());
        assert_eq!(
            view.formatted_time().as_deref(),
            Some("Thursday, October 15, 2026  5:52:10 PM")
        );
    }

    #[test]
    fn test_invalid_results_clear_the_view() {
        let mut view = SessionView::new();
        view.apply_results(report(&[6.0, 7.0]));
        view.apply_results(AssessmentResults {
            engine_state: AssessmentState::NotAvailable,
            report: None,
        });

        assert!(!view.has_results());
        assert!(view.records.is_empty());
        assert_eq!(view.engine_state, AssessmentState::NotAvailable);
        assert!(view.render().starts_with("No assessment available"));
    }

    #[test]
    fn test_render_marks_lowest_and_formats_scores() {
        let mut view = SessionView::new();
        view.apply_results(report(&[7.0, 6.0]));

        let text = view.render();
        assert!(text.starts_with("Windows Experience Index: 6.0\n"));
        assert!(text.contains("> C1"));
        assert!(text.contains(" 7.0 "));
    }
}
