//! wei-helper: connects to the front-end's service and answers its requests.

use std::path::PathBuf;
use std::sync::Arc;

use assessment_engine::SnapshotEngine;
use bridge_channel::{Channel, ChannelOptions, EnvelopeSink};
use bridge_config_and_utils::{init_logging, Config, Paths};
use clap::Parser;
use helper_orchestrator::{
    AssessmentOrchestrator, BitmapOrchestrator, CommandLauncher, ElevationController,
    HelperDispatcher, LastAssessment,
};
use tracing::{info, warn};

/// Assessment helper process.
#[derive(Parser, Debug)]
#[command(name = "wei-helper")]
#[command(about = "Publishes assessment results and the rating image to the front-end")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(short, long, env = "WEI_LOG_LEVEL")]
    log_level: Option<String>,

    /// Base directory for runtime files (sockets, logs, config). Defaults to ~/.wei-bridge
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Assessment snapshot to read. Defaults to <base-dir>/assessment.json
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let paths = match args.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;
    let level = args.log_level.unwrap_or_else(|| config.log_level.clone());
    init_logging(&paths, "wei-helper", &level)?;

    let snapshot = args.snapshot.unwrap_or_else(|| paths.assessment_file());
    info!(snapshot = %snapshot.display(), "Helper starting");
    let launcher = CommandLauncher::from_config(&config, paths.base_dir(), &snapshot);
    let engine = Arc::new(SnapshotEngine::new(snapshot));

    let mut channel = Channel::open(
        &paths,
        &config.service_name,
        &config.peer_identity,
        &ChannelOptions::from(&config),
    )
    .await?;
    let sink: Arc<dyn EnvelopeSink> = Arc::new(channel.handle());

    let last = Arc::new(LastAssessment::new());
    let dispatcher = HelperDispatcher::new(
        AssessmentOrchestrator::new(engine.clone(), sink.clone(), last.clone()),
        BitmapOrchestrator::new(engine, sink, last),
        ElevationController::new(
            Arc::new(launcher),
            config.elevation_timeout(),
        ),
    );

    if let Err(e) = dispatcher.startup().await {
        if e.is_fatal() {
            return Err(e.into());
        }
        warn!(error = %e, "Startup publish failed");
    }

    dispatcher.run(&mut channel).await?;
    info!("Helper exiting");
    Ok(())
}
