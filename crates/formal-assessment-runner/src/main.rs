//! wei-formal-assessment: launched elevated by the helper; exits 0 once the
//! assessment has completed.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use assessment_engine::SnapshotEngine;
use bridge_config_and_utils::{init_logging, Config, Paths};
use clap::Parser;
use formal_assessment_runner::run_formal_assessment;
use tracing::{error, info};

/// Formal assessment runner.
#[derive(Parser, Debug)]
#[command(name = "wei-formal-assessment")]
#[command(about = "Runs a formal system assessment and prints its progress")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(short, long, env = "WEI_LOG_LEVEL")]
    log_level: Option<String>,

    /// Base directory for runtime files (sockets, logs, config). Defaults to ~/.wei-bridge
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Assessment snapshot to refresh. Defaults to <base-dir>/assessment.json
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Pause between progress updates, in milliseconds.
    #[arg(long, default_value = "250")]
    tick_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let paths = match args.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;
    let level = args.log_level.unwrap_or_else(|| config.log_level.clone());
    init_logging(&paths, "wei-formal-assessment", &level)?;

    let snapshot = args.snapshot.unwrap_or_else(|| paths.assessment_file());
    info!(snapshot = %snapshot.display(), "Formal assessment starting");
    let engine =
        SnapshotEngine::new(snapshot).with_update_interval(Duration::from_millis(args.tick_ms));

    match run_formal_assessment(&engine, std::io::stdout()).await {
        Ok(completion) => {
            info!(hresult = completion.hresult, "Formal assessment finished");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(error = %e, "Formal assessment failed");
            eprintln!("{}", e);
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}
