//! Elevation controller: launch the formal-assessment process with elevated
//! rights and report its exit code.

use async_trait::async_trait;
use bridge_config_and_utils::Config;
use parking_lot::Mutex;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

/// Exit code reported when the user declines elevation.
pub const DECLINED_EXIT_CODE: i32 = 1;

/// Reported when no status could be obtained.
const DEFAULT_EXIT_CODE: i32 = 0;

/// How an elevated process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    Exited(i32),
    /// The consent prompt was dismissed.
    Declined,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("Elevation declined")]
    Declined,

    #[error("Launch failed: {0}")]
    Failed(String),
}

/// A launched elevated process.
#[async_trait]
pub trait ElevatedProcess: Send {
    /// Wait for the process to end.
    async fn wait(&mut self) -> Result<ProcessExit, LaunchError>;

    /// Exit status if the process has already ended. Never waits.
    fn try_exit(&mut self) -> Option<ProcessExit>;
}

/// Starts the formal-assessment process with elevation.
#[async_trait]
pub trait ElevatedLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn ElevatedProcess>, LaunchError>;
}

/// Runs `<wrapper...> <program> <args...>` with inherited stdio so the
/// console stays visible.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    wrapper: Vec<String>,
    program: String,
    args: Vec<String>,
    declined_exit_codes: Vec<i32>,
}

impl CommandLauncher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            wrapper: Vec::new(),
            program: program.into(),
            args: Vec::new(),
            declined_exit_codes: Vec::new(),
        }
    }

    /// Launcher for the configured program, pointed at the helper's base
    /// directory and snapshot. Elevation may reset `HOME`, so both are
    /// passed explicitly.
    pub fn from_config(config: &Config, base_dir: &Path, snapshot: &Path) -> Self {
        let mut args = vec![
            "--base-dir".to_string(),
            base_dir.display().to_string(),
            "--snapshot".to_string(),
            snapshot.display().to_string(),
        ];
        args.extend(config.formal_assessment_args.iter().cloned());

        Self::new(config.formal_assessment_program.clone())
            .with_wrapper(config.elevation_wrapper.clone())
            .with_args(args)
            .with_declined_exit_codes(config.declined_exit_codes.clone())
    }

    /// Elevation wrapper prepended to the program, e.g. `["pkexec"]`.
    pub fn with_wrapper(mut self, wrapper: Vec<String>) -> Self {
        self.wrapper = wrapper;
        self
    }

    /// Arguments passed to the program after its name.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Wrapper exit codes that mean the user dismissed the consent prompt.
    pub fn with_declined_exit_codes(mut self, codes: Vec<i32>) -> Self {
        self.declined_exit_codes = codes;
        self
    }

    fn argv(&self) -> Vec<&str> {
        self.wrapper
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.program.as_str()))
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

#[async_trait]
impl ElevatedLauncher for CommandLauncher {
    async fn launch(&self) -> Result<Box<dyn ElevatedProcess>, LaunchError> {
        let argv = self.argv();
        info!(command = ?argv, "Launching elevated process");

        let child = Command::new(argv[0])
            .args(&argv[1..])
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| LaunchError::Failed(format!("{}: {}", argv[0], e)))?;

        debug!(pid = ?child.id(), "Elevated process spawned");
        Ok(Box::new(CommandProcess {
            child,
            declined_exit_codes: self.declined_exit_codes.clone(),
        }))
    }
}

struct CommandProcess {
    child: Child,
    declined_exit_codes: Vec<i32>,
}

impl CommandProcess {
    fn classify(&self, status: ExitStatus) -> ProcessExit {
        match status.code() {
            Some(code) if self.declined_exit_codes.contains(&code) => ProcessExit::Declined,
            Some(code) => ProcessExit::Exited(code),
            None => ProcessExit::Exited(128 + status.signal().unwrap_or_default()),
        }
    }
}

#[async_trait]
impl ElevatedProcess for CommandProcess {
    async fn wait(&mut self) -> Result<ProcessExit, LaunchError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| LaunchError::Failed(e.to_string()))?;
        Ok(self.classify(status))
    }

    fn try_exit(&mut self) -> Option<ProcessExit> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(self.classify(status)),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Could not read elevated process status");
                None
            }
        }
    }
}

/// Where the controller is in one elevation round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevationPhase {
    Idle,
    Launching,
    Consented,
    Running,
    Exited,
    Declined,
    Failed,
}

type PhaseObserver = Box<dyn Fn(ElevationPhase) + Send + Sync>;

pub struct ElevationController {
    launcher: Arc<dyn ElevatedLauncher>,
    timeout: Duration,
    phase: Mutex<ElevationPhase>,
    observer: Option<PhaseObserver>,
}

impl ElevationController {
    pub fn new(launcher: Arc<dyn ElevatedLauncher>, timeout: Duration) -> Self {
        Self {
            launcher,
            timeout,
            phase: Mutex::new(ElevationPhase::Idle),
            observer: None,
        }
    }

    /// Called on every phase change.
    pub fn with_phase_observer(
        mut self,
        observer: impl Fn(ElevationPhase) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn phase(&self) -> ElevationPhase {
        *self.phase.lock()
    }

    /// Run the formal assessment elevated and return its exit code.
    ///
    /// A declined prompt yields 1. When the wait times out the status
    /// readable at that moment is used, else 0; the process is left running.
    /// Launch failures are logged and also yield 0. Never pushes anything
    /// to the front-end.
    pub async fn trigger_formal_assessment(&self) -> i32 {
        let mut exit_code = DEFAULT_EXIT_CODE;
        self.enter(ElevationPhase::Launching);

        match self.launcher.launch().await {
            Ok(mut process) => {
                self.enter(ElevationPhase::Consented);
                self.enter(ElevationPhase::Running);

                let outcome = tokio::time::timeout(self.timeout, process.wait()).await;
                match outcome {
                    Ok(Ok(ProcessExit::Exited(code))) => {
                        exit_code = code;
                        self.enter(ElevationPhase::Exited);
                    }
                    Ok(Ok(ProcessExit::Declined)) | Ok(Err(LaunchError::Declined)) => {
                        exit_code = DECLINED_EXIT_CODE;
                        self.declined();
                    }
                    Ok(Err(LaunchError::Failed(reason))) => {
                        error!(error = %reason, "Waiting on elevated process failed");
                        self.enter(ElevationPhase::Failed);
                    }
                    Err(_) => {
                        warn!(
                            timeout_secs = self.timeout.as_secs(),
                            "Elevated process did not exit in time"
                        );
                        match process.try_exit() {
                            Some(ProcessExit::Exited(code)) => {
                                exit_code = code;
                                self.enter(ElevationPhase::Exited);
                            }
                            Some(ProcessExit::Declined) => {
                                exit_code = DECLINED_EXIT_CODE;
                                self.declined();
                            }
                            None => self.enter(ElevationPhase::Failed),
                        }
                    }
                }
            }
            Err(LaunchError::Declined) => {
                exit_code = DECLINED_EXIT_CODE;
                self.declined();
            }
            Err(LaunchError::Failed(reason)) => {
                error!(error = %reason, "Could not launch elevated process");
                self.enter(ElevationPhase::Failed);
            }
        }

        self.enter(ElevationPhase::Idle);
        info!(exit_code, "Formal assessment finished");
        exit_code
    }

    fn declined(&self) {
        info!("User declined elevation");
        self.enter(ElevationPhase::Declined);
        self.enter(ElevationPhase::Failed);
    }

    fn enter(&self, phase: ElevationPhase) {
        *self.phase.lock() = phase;
        debug!(?phase, "Elevation phase");
        if let Some(observer) = &self.observer {
            observer(phase);
        }
    }
}
