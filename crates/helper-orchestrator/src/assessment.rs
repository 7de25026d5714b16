//! Assessment orchestrator: read the engine, publish `assessmentResults`.

use crate::{LastAssessment, OrchestratorResult};
use assessment_engine::AssessmentEngine;
use bridge_channel::EnvelopeSink;
use chrono::NaiveTime;
use envelope_protocol_types::{
    format_assessment_time, AssessmentKind, AssessmentReport, AssessmentResults,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

type Clock = Box<dyn Fn() -> NaiveTime + Send + Sync>;

pub struct AssessmentOrchestrator {
    engine: Arc<dyn AssessmentEngine>,
    engine_lock: Mutex<()>,
    sink: Arc<dyn EnvelopeSink>,
    last: Arc<LastAssessment>,
    clock: Clock,
}

impl AssessmentOrchestrator {
    pub fn new(
        engine: Arc<dyn AssessmentEngine>,
        sink: Arc<dyn EnvelopeSink>,
        last: Arc<LastAssessment>,
    ) -> Self {
        Self {
            engine,
            engine_lock: Mutex::new(()),
            sink,
            last,
            clock: Box::new(|| chrono::Local::now().time()),
        }
    }

    /// Replace the wall clock used for the time part of `assessmentTime`.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveTime + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Read the stored assessment from the engine.
    ///
    /// Records are read only when the state carries results. Any engine
    /// failure is returned as is, never reported as an invalid state.
    pub fn collect(&self) -> OrchestratorResult<AssessmentResults> {
        let _engine = self.engine_lock.lock();

        let state = self.engine.assessment_state()?;
        if !state.has_results() {
            debug!(state = state.wire_name(), "No assessment results available");
            self.last.record(state, 0.0);
            return Ok(AssessmentResults {
                engine_state: state,
                report: None,
            });
        }

        let records = AssessmentKind::ALL
            .iter()
            .map(|kind| self.engine.assessment_info(*kind))
            .collect::<Result<Vec<_>, _>>()?;
        let base_score = self.engine.system_rating()?;
        let rating_state = self.engine.rating_state_description()?;
        let date = self.engine.assessment_date()?;

        self.last.record(state, base_score);

        Ok(AssessmentResults {
            engine_state: state,
            report: Some(AssessmentReport {
                base_score,
                rating_state,
                assessment_time: format_assessment_time(date, (self.clock)()),
                records,
            }),
        })
    }

    /// Query the engine and push `assessmentResults` to the front-end. Not retried.
    pub async fn query_and_publish(&self) -> OrchestratorResult<AssessmentResults> {
        let results = self.collect()?;
        self.sink.notify(results.to_envelope()?).await?;

        info!(
            state = results.engine_state.wire_name(),
            valid = results.is_valid(),
            "Published assessment results"
        );
        Ok(results)
    }
}
