//! Privileged helper for the assessment bridge.
//!
//! Answers the front-end's verbs: publishes the stored assessment and the
//! rating image, and runs the formal assessment with elevation on request.

mod assessment;
mod bitmap;
mod dispatcher;
mod elevation;
mod error;
mod state;

#[cfg(test)]
mod tests;

pub use assessment::AssessmentOrchestrator;
pub use bitmap::{BitmapOrchestrator, PngEncoder, RgbaPngEncoder};
pub use dispatcher::HelperDispatcher;
pub use elevation::{
    CommandLauncher, ElevatedLauncher, ElevatedProcess, ElevationController, ElevationPhase,
    LaunchError, ProcessExit, DECLINED_EXIT_CODE,
};
pub use error::{OrchestratorError, OrchestratorResult};
pub use state::LastAssessment;
