//! signlens - stream hand landmarks to a remote sign classifier
//!
//! Replays recorded hand-tracker output through the frame pipeline and prints
//! every display change.

use anyhow::Context;
use clap::{Parser, Subcommand};
use signlens::core::config::Config;
use signlens::core::frame_pipeline::{FrameOutcome, FramePipeline};
use signlens::core::prediction_client::{HttpClassifier, PredictionClient};
use signlens::models::landmark::DetectorError;
use signlens::platform::hands::{HandTracker, ReplayClock, ReplayTracker};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "signlens")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay recorded hand detections through the classifier pipeline
    Run {
        /// JSON-lines file of recorded tracker output
        #[arg(short, long)]
        frames: PathBuf,

        /// Override the classifier endpoint
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Override the throttle interval (ms)
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Drop predictions that resolve after a newer one was shown
        #[arg(long)]
        discard_stale: bool,
    },

    /// Check that the classifier service is reachable
    Health {
        /// Override the classifier endpoint
        #[arg(short, long)]
        endpoint: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Restore default configuration
    Reset,
    /// Print the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            frames,
            endpoint,
            interval_ms,
            discard_stale,
        } => {
            let mut config = load_config(config_path)?;
            if let Some(endpoint) = endpoint {
                config.classifier_endpoint = endpoint;
            }
            if let Some(interval_ms) = interval_ms {
                config.throttle_interval_ms = interval_ms;
            }
            config.discard_stale_predictions |= discard_stale;
            config
                .validate()
                .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

            run_replay(&frames, &config).await?;
        }
        Commands::Health { endpoint } => {
            let mut config = load_config(config_path)?;
            if let Some(endpoint) = endpoint {
                config.classifier_endpoint = endpoint;
            }
            let classifier = HttpClassifier::from_config(&config)?;
            let status = classifier
                .health()
                .await
                .with_context(|| format!("Classifier at {} is not healthy", classifier.endpoint()))?;
            println!("{}: {}", classifier.endpoint(), status);
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = load_config(config_path)?;
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::Reset => {
                match config_path {
                    Some(path) => Config::reset_at(path),
                    None => Config::reset(),
                }
                .map_err(|e| anyhow::anyhow!("Failed to reset configuration: {}", e))?;
                println!("Configuration reset: {}", resolve_config_path(config_path)?.display());
            }
            ConfigAction::Path => {
                println!("{}", resolve_config_path(config_path)?.display());
            }
        },
    }

    Ok(())
}

/// Load from `--config` when given, otherwise from the default location
fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

fn resolve_config_path(path: Option<&Path>) -> anyhow::Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::config_path().map_err(|e| anyhow::anyhow!("{}", e)),
    }
}

async fn run_replay(frames: &Path, config: &Config) -> anyhow::Result<()> {
    let mut tracker = ReplayTracker::open(frames, &config.detector)
        .with_context(|| format!("Failed to open {}", frames.display()))?;
    if !tracker.is_initialized() {
        return Err(DetectorError::NotInitialized.into());
    }
    info!("{}", tracker.get_model_info());

    let classifier = Arc::new(HttpClassifier::from_config(config)?);
    let client = PredictionClient::new(classifier);
    info!(
        classifier = %client.describe(),
        interval_ms = config.throttle_interval_ms,
        "Starting pipeline"
    );
    let mut pipeline = FramePipeline::from_config(client, config);

    let mut updates = pipeline.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            println!("{:>4}  {}", state.label(), state.detail());
        }
    });

    let mut replay_clock: Option<ReplayClock> = None;
    let mut dispatched = 0usize;
    let mut handled = 0usize;

    while let Some(frame) = tracker.next_detection()? {
        // One time base per replay, so the throttle never compares recorded
        // timestamps against the process clock
        let (now_ms, wait) = replay_clock
            .get_or_insert_with(|| ReplayClock::for_first_frame(&frame))
            .advance(&frame);
        if let Some(wait) = wait {
            tokio::time::sleep(wait).await;
        }

        let outcome = pipeline.handle_detection(&frame, now_ms)?;
        if matches!(outcome, FrameOutcome::Dispatched { .. }) {
            dispatched += 1;
        }
        handled += 1;

        // Let resolved classify tasks publish between frames
        tokio::task::yield_now().await;
    }

    if pipeline.in_flight() > 0 {
        info!(in_flight = pipeline.in_flight(), "Waiting for outstanding predictions");
    }
    pipeline.drain().await;

    let final_state = pipeline.current_display();
    drop(pipeline);
    if let Err(e) = printer.await {
        warn!(error = %e, "Display printer stopped unexpectedly");
    }

    info!(
        frames = handled,
        requests = dispatched,
        label = final_state.label(),
        "Replay finished"
    );
    Ok(())
}
