//! vidshield-client - follow a video processing job from the command line
//!
//! Connects to the processing progress stream for one job, logs phase,
//! progress, detections and ETA as they arrive, and exits when the client
//! would navigate away:
//! - exit 0 on the completion redirect
//! - exit 1 on the error fallback redirect or when the stream cannot be
//!   re-established

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vidshield_client::{
    ClientConfig, Collaborators, Navigator, ProcessingClient, ProcessingState, StaticToken,
};
use vidshield_common::config::LoggingConfig;

/// Command-line arguments for vidshield-client
#[derive(Parser, Debug)]
#[command(name = "vidshield-client")]
#[command(about = "Follow a VidShield processing job until it completes")]
#[command(version)]
struct Args {
    /// Job (video) identifier to follow
    job_id: String,

    /// Processing API base URL
    #[arg(long, env = "VIDSHIELD_API_URL")]
    api_url: Option<String>,

    /// Bearer token for the stream and API calls
    #[arg(long, env = "VIDSHIELD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Configuration file (default: ~/.config/vidshield/client.toml)
    #[arg(short, long, env = "VIDSHIELD_CONFIG")]
    config: Option<PathBuf>,
}

/// Forwards redirect routes to `main`
struct ChannelNavigator {
    routes: mpsc::UnboundedSender<String>,
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, route: &str) {
        let _ = self.routes.send(route.to_string());
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config =
        ClientConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(api_url) = args.api_url {
        config.api_base_url = api_url;
    }

    init_tracing(&config.logging)?;

    info!(
        "Starting vidshield-client v{} ({} build {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("VIDSHIELD_BUILD_PROFILE"),
        env!("VIDSHIELD_GIT_HASH"),
        env!("VIDSHIELD_BUILD_TIMESTAMP"),
    );
    info!("API: {}", config.api_base_url);

    let fallback_route = config.redirect.error_fallback_route.clone();
    let (route_tx, mut route_rx) = mpsc::unbounded_channel();
    let collaborators = Collaborators::http(
        &config,
        Arc::new(ChannelNavigator { routes: route_tx }),
        Arc::new(StaticToken::new(args.token)),
    )
    .context("Failed to build HTTP client")?;

    let client = ProcessingClient::spawn(config, collaborators);
    let mut updates = client.subscribe();
    client
        .connect(args.job_id.as_str())
        .await
        .context("Processing client stopped unexpectedly")?;

    let mut reporter = ProgressReporter::default();
    let exit = loop {
        tokio::select! {
            Some(route) = route_rx.recv() => {
                if route == fallback_route {
                    warn!("Job failed, redirecting to {}", route);
                    break ExitCode::FAILURE;
                }
                info!("Job complete, redirecting to {}", route);
                break ExitCode::SUCCESS;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    warn!("Processing client ended");
                    break ExitCode::FAILURE;
                }
                if let Some(code) = reporter.report(&updates) {
                    break code;
                }
            }
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break ExitCode::SUCCESS;
            }
        }
    };

    client.shutdown().await.ok();
    Ok(exit)
}

/// Console + optional file logging; `RUST_LOG` overrides the configured level
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "vidshield_client={level},vidshield_common={level},warn",
            level = logging.level
        ))
    });

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

/// Logs what changed between published states
#[derive(Default)]
struct ProgressReporter {
    phase: Option<String>,
    progress: Option<u8>,
    total_detections: u64,
    latest_update: Option<String>,
}

impl ProgressReporter {
    /// Returns an exit code once the job can no longer make progress
    fn report(&mut self, updates: &watch::Receiver<ProcessingState>) -> Option<ExitCode> {
        let state = updates.borrow();
        let session = &state.session;

        let phase = session.phase.label().to_string();
        if self.phase.as_deref() != Some(phase.as_str()) {
            info!("Phase: {}", phase);
            self.phase = Some(phase);
        }

        if self.progress != Some(session.progress) {
            info!(
                "{}% ({}) elapsed {} eta {}",
                session.progress,
                session.message,
                state.formatted_elapsed(),
                state.eta()
            );
            self.progress = Some(session.progress);
        }

        let total = state.total_detections();
        if total != self.total_detections {
            let breakdown: Vec<String> = state
                .detections_list()
                .iter()
                .map(|d| format!("{} {} {}", d.display_icon, d.category, d.count))
                .collect();
            info!("Detections: {} [{}]", total, breakdown.join(", "));
            self.total_detections = total;
        }

        if let Some(entry) = state.live_updates.latest() {
            let key = format!("{}|{}", entry.timestamp, entry.message);
            if self.latest_update.as_deref() != Some(key.as_str()) {
                info!("> {}", entry.message);
                self.latest_update = Some(key);
            }
        }

        // Connection given up on: no redirect will follow
        if session.is_error && session.redirect_countdown.is_none() {
            warn!(
                "{}",
                session.error_message.as_deref().unwrap_or("Connection lost")
            );
            return Some(ExitCode::FAILURE);
        }
        None
    }
}
