//! wei-frontend: hosts the bridge service, launches the helper and prints
//! what it publishes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bridge_channel::{ChannelListener, ChannelOptions};
use bridge_config_and_utils::{init_logging, Config, Paths};
use clap::Parser;
use frontend_session::{launch_helper, FormalRequestOutcome, FrontendSession, ViewUpdate};
use tracing::{info, warn};

const HELPER_EXIT_GRACE: Duration = Duration::from_secs(5);

/// Assessment front-end.
#[derive(Parser, Debug)]
#[command(name = "wei-frontend")]
#[command(about = "Shows the stored system assessment and can re-run it with elevation")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(short, long, env = "WEI_LOG_LEVEL")]
    log_level: Option<String>,

    /// Base directory for runtime files (sockets, logs, config). Defaults to ~/.wei-bridge
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Helper program to launch. Overrides the config file.
    #[arg(long)]
    helper: Option<String>,

    /// Run a new formal assessment once the first results have arrived.
    #[arg(long)]
    reassess: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let paths = match args.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let mut config = Config::load(&paths)?;
    if let Some(helper) = args.helper {
        config.helper_program = helper;
    }
    let level = args.log_level.unwrap_or_else(|| config.log_level.clone());
    init_logging(&paths, "wei-frontend", &level)?;

    let options = ChannelOptions::from(&config);
    let listener = ChannelListener::bind(&paths, &config.service_name, options.clone())?
        .with_authorized_peers(vec![config.peer_identity.clone()]);

    let helper = launch_helper(&config, &paths)?;
    let mut channel = tokio::time::timeout(options.open_timeout, listener.accept())
        .await
        .context("helper did not connect in time")??;
    info!(pid = ?helper.pid(), "Helper connected");

    let session = Arc::new(FrontendSession::new(channel.handle()));

    if args.reassess {
        let session = session.clone();
        tokio::spawn(async move {
            let mut revisions = session.subscribe();
            while !session.view().has_results() {
                if revisions.changed().await.is_err() {
                    return;
                }
            }
            match session.request_formal_assessment().await {
                Ok(FormalRequestOutcome::Refreshed) => println!("Assessment refreshed."),
                Ok(FormalRequestOutcome::NotCompleted { exit_code }) => {
                    println!("Assessment did not complete (exit code {exit_code}).")
                }
                Ok(FormalRequestOutcome::AlreadyMade) => {
                    println!("Only one new assessment can be made per run.")
                }
                Err(e) => warn!(error = %e, "Formal assessment request failed"),
            }
        });
    }

    {
        let session = session.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, closing session");
                session.close();
            }
        });
    }

    session
        .run(&mut channel, |update, view| {
            if update == ViewUpdate::Assessment {
                println!("{}", view.render());
            }
        })
        .await;

    helper.wait(HELPER_EXIT_GRACE).await;
    info!("Front-end exiting");
    Ok(())
}
