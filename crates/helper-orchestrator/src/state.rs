//! Last assessment observed by the helper.

use envelope_protocol_types::AssessmentState;
use parking_lot::Mutex;

/// State and rating from the most recent query, shared between the
/// assessment and bitmap orchestrators.
#[derive(Debug, Default)]
pub struct LastAssessment {
    inner: Mutex<Option<(AssessmentState, f32)>>,
}

impl LastAssessment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, state: AssessmentState, rating: f32) {
        *self.inner.lock() = Some((state, rating));
    }

    /// `(Unknown, 0.0)` until a query has been made.
    pub fn get(&self) -> (AssessmentState, f32) {
        let last = *self.inner.lock();
        last.unwrap_or((AssessmentState::Unknown, 0.0))
    }

    pub fn has_query(&self) -> bool {
        self.inner.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_before_first_query() {
        let last = LastAssessment::new();
        assert!(!last.has_query());
        assert_eq!(last.get(), (AssessmentState::Unknown, 0.0));

        last.record(AssessmentState::Valid, 5.9);
        assert_eq!(last.get(), (AssessmentState::Valid, 5.9));
    }
}
