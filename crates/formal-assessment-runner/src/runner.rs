//! Start a formal assessment and wait for it to finish.

use crate::{Completion, ConsoleEvents, RunnerError, RunnerResult};
use assessment_engine::FormalAssessmentEngine;
use std::io::Write;
use std::sync::Arc;
use tracing::info;

/// Initiate the assessment and block until the engine reports completion.
///
/// A completion carrying a failure code is still `Ok`; only a failed start
/// or a missing completion report is an error.
pub async fn run_formal_assessment<W>(
    engine: &dyn FormalAssessmentEngine,
    out: W,
) -> RunnerResult<Completion>
where
    W: Write + Send + 'static,
{
    let (events, done) = ConsoleEvents::new(out);
    engine.initiate(Arc::new(events))?;
    info!("Waiting for the assessment to complete");

    done.await.map_err(|_| RunnerError::NoCompletion)
}
