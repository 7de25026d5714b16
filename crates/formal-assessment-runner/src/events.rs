//! Console progress output and the completion signal.

use assessment_engine::FormalAssessmentEvents;
use parking_lot::{Mutex, MutexGuard};
use std::io::Write;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// How the engine reported the end of the assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub hresult: i32,
    pub description: String,
}

impl Completion {
    pub fn succeeded(&self) -> bool {
        self.hresult == 0
    }
}

/// Whole percentage of `current_tick` out of `tick_total`. `None` without a total.
pub fn percent_complete(current_tick: u32, tick_total: u32) -> Option<u64> {
    (tick_total > 0).then(|| 100 * u64::from(current_tick) / u64::from(tick_total))
}

/// Prints progress to `out` and fires the completion signal once.
pub struct ConsoleEvents<W> {
    out: Mutex<W>,
    done: Mutex<Option<oneshot::Sender<Completion>>>,
}

impl<W: Write + Send> ConsoleEvents<W> {
    pub fn new(out: W) -> (Self, oneshot::Receiver<Completion>) {
        let (tx, rx) = oneshot::channel();
        let events = Self {
            out: Mutex::new(out),
            done: Mutex::new(Some(tx)),
        };
        (events, rx)
    }

    pub fn output(&self) -> MutexGuard<'_, W> {
        self.out.lock()
    }

    fn print(&self, line: &str) {
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            warn!(error = %e, "Could not write progress");
        }
    }
}

impl<W: Write + Send> FormalAssessmentEvents for ConsoleEvents<W> {
    fn on_update(&self, current_tick: u32, tick_total: u32, current_state: &str) {
        let Some(percent) = percent_complete(current_tick, tick_total) else {
            debug!(current_tick, current_state, "Progress without a tick total");
            return;
        };
        debug!(percent, current_state, "Assessment progress");
        self.print(&format!("Percent complete: {}%", percent));
        self.print(&format!("Currently assessing: {}", current_state));
    }

    fn on_complete(&self, hresult: i32, description: &str) {
        if hresult == 0 {
            info!(description, "Assessment complete");
            self.print(&format!("*** {}", description));
        } else {
            warn!(hresult = %format!("{:#010x}", hresult), description, "Assessment failed");
            self.print(&format!(
                "*** The assessment failed with {:#010x}: {}",
                hresult, description
            ));
        }

        let Some(done) = self.done.lock().take() else {
            warn!("Completion reported more than once");
            return;
        };
        let _ = done.send(Completion {
            hresult,
            description: description.to_string(),
        });
    }
}
