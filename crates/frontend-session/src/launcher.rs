//! Starting the helper process.

use crate::{SessionError, SessionResult};
use bridge_config_and_utils::{Config, Paths};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// A running helper. Killed if still running when dropped.
pub struct HelperProcess {
    child: Child,
}

impl HelperProcess {
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the helper to exit on its own, up to `limit`.
    pub async fn wait(mut self, limit: Duration) -> Option<i32> {
        match tokio::time::timeout(limit, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(?status, "Helper exited");
                status.code()
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Could not wait for helper");
                None
            }
            Err(_) => {
                warn!(limit_secs = limit.as_secs(), "Helper did not exit, killing it");
                let _ = self.child.kill().await;
                None
            }
        }
    }
}

/// Launch the configured helper against the same base directory.
pub fn launch_helper(config: &Config, paths: &Paths) -> SessionResult<HelperProcess> {
    let child = Command::new(&config.helper_program)
        .arg("--base-dir")
        .arg(paths.base_dir())
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| SessionError::Launch(format!("{}: {}", config.helper_program, e)))?;

    info!(program = %config.helper_program, pid = ?child.id(), "Helper launched");
    Ok(HelperProcess { child })
}
