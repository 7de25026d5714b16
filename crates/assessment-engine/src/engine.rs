//! Engine traits.

use crate::{EngineResult, NativeBitmap};
use chrono::NaiveDate;
use envelope_protocol_types::{AssessmentKind, AssessmentRecord, AssessmentState, BitmapSize};
use std::sync::Arc;

/// Read access to the stored assessment.
pub trait AssessmentEngine: Send + Sync {
    fn assessment_state(&self) -> EngineResult<AssessmentState>;

    /// Score, title and description for one category.
    fn assessment_info(&self, kind: AssessmentKind) -> EngineResult<AssessmentRecord>;

    /// Overall rating (the lowest subscore).
    fn system_rating(&self) -> EngineResult<f32>;

    /// Human-readable description of the rating state.
    fn rating_state_description(&self) -> EngineResult<String>;

    /// Date the stored assessment was made. The engine keeps no time of day.
    fn assessment_date(&self) -> EngineResult<NaiveDate>;
}

/// Produces the rating badge.
pub trait VisualsEngine: Send + Sync {
    /// Render the badge for `(size, state, rating)`.
    ///
    /// `Ok(None)` means the engine produced no image.
    fn bitmap(
        &self,
        size: BitmapSize,
        state: AssessmentState,
        rating: f32,
    ) -> EngineResult<Option<NativeBitmap>>;
}

/// Callbacks raised while a formal assessment runs. May be called from any thread.
pub trait FormalAssessmentEvents: Send + Sync {
    fn on_update(&self, current_tick: u32, tick_total: u32, current_state: &str);

    /// Called exactly once. `hresult` is 0 on success.
    fn on_complete(&self, hresult: i32, description: &str);
}

/// Starts a new formal assessment.
pub trait FormalAssessmentEngine: Send + Sync {
    /// Begin the assessment and return immediately. Progress and completion
    /// are reported through `events`.
    fn initiate(&self, events: Arc<dyn FormalAssessmentEvents>) -> EngineResult<()>;
}
