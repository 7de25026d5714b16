//! Formal assessment runner.
//!
//! Runs in the elevated process: starts the engine's formal assessment,
//! prints its progress to the console and waits for completion. The
//! process exit code is the only thing reported back to the helper.

mod error;
mod events;
mod runner;

pub use error::{RunnerError, RunnerResult, INITIATION_FAILED_EXIT_CODE};
pub use events::{percent_complete, Completion, ConsoleEvents};
pub use runner::run_formal_assessment;
