//! AccuRead CLI - Command line interface for the field capture core.
//!
//! This tool exercises geofence checks and the offline capture queue from a
//! terminal: capture readings, inspect the queue and sync it to an outbox.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use accuread_common::Coordinate;
use accuread_geofence::{Geofence, GeofencingService};
use accuread_storage::{create_default_registry, PersistentQueueStore};
use accuread_sync::{
    CaptureGate, DirectoryUploader, ManualConnectivity, SkipReason, SyncOrchestrator, SyncOutcome,
};

use crate::config::{AppConfig, CONFIG_FILENAME};

type Orchestrator = SyncOrchestrator<dyn PersistentQueueStore, DirectoryUploader>;

#[derive(Parser)]
#[command(name = "accuread")]
#[command(about = "AccuRead - Geofenced meter capture with offline sync")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Data directory (default: platform data dir).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (default: <data-dir>/config.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Great-circle distance between two points.
    Distance {
        /// First point as LAT,LON.
        #[arg(long, allow_hyphen_values = true)]
        from: Coordinate,

        /// Second point as LAT,LON.
        #[arg(long, allow_hyphen_values = true)]
        to: Coordinate,
    },

    /// Check whether a position is within range of a target.
    Check {
        /// Current position as LAT,LON.
        #[arg(short, long, allow_hyphen_values = true)]
        current: Coordinate,

        /// Target asset position as LAT,LON.
        #[arg(short, long, allow_hyphen_values = true)]
        target: Coordinate,

        /// Radius in meters (default from config).
        #[arg(short, long)]
        radius: Option<f64>,
    },

    /// Capture a reading, enqueuing it only if within range of the target.
    Capture {
        /// Current position as LAT,LON.
        #[arg(short, long, allow_hyphen_values = true)]
        current: Coordinate,

        /// Target asset position as LAT,LON.
        #[arg(short, long, allow_hyphen_values = true)]
        target: Coordinate,

        /// Radius in meters (default from config).
        #[arg(short, long)]
        radius: Option<f64>,

        /// Reference to the captured payload (file path or URI).
        #[arg(short, long)]
        payload: String,
    },

    /// Add a payload to the offline queue without a geofence check.
    Enqueue {
        /// Reference to the captured payload (file path or URI).
        #[arg(short, long)]
        payload: String,
    },

    /// Upload the offline queue.
    Sync {
        /// Outbox directory receiving uploads (default: <data-dir>/outbox).
        #[arg(short, long)]
        outbox: Option<PathBuf>,

        /// Treat the device as offline.
        #[arg(long)]
        offline: bool,
    },

    /// Discard every queued capture.
    Clear,

    /// Show queue and connectivity status.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let data_dir = config::data_dir(cli.data_dir)?;
    let config_path = cli
        .config
        .unwrap_or_else(|| data_dir.join(CONFIG_FILENAME));
    let config = AppConfig::load(&config_path).await?;

    match cli.command {
        Commands::Distance { from, to } => cmd_distance(&from, &to),

        Commands::Check {
            current,
            target,
            radius,
        } => cmd_check(&config, &current, &target, radius),

        Commands::Capture {
            current,
            target,
            radius,
            payload,
        } => cmd_capture(&config, &data_dir, &current, &target, radius, payload).await,

        Commands::Enqueue { payload } => cmd_enqueue(&config, &data_dir, payload).await,

        Commands::Sync { outbox, offline } => {
            let outbox = outbox.unwrap_or_else(|| data_dir.join("outbox"));
            cmd_sync(&config, &data_dir, outbox, offline).await
        }

        Commands::Clear => cmd_clear(&config, &data_dir).await,

        Commands::Status => cmd_status(&config, &data_dir).await,
    }
}

/// Build an orchestrator over the configured store with its mirror loaded.
async fn open_queue(
    config: &AppConfig,
    data_dir: &std::path::Path,
    outbox: PathBuf,
    online: bool,
) -> Result<Orchestrator> {
    let (kind, options) = config.store.resolve(data_dir);
    let store = create_default_registry()
        .resolve(&kind, options)
        .await
        .with_context(|| format!("Failed to open '{}' queue store", kind))?;

    let orchestrator = SyncOrchestrator::new(
        store,
        Arc::new(DirectoryUploader::new(outbox)),
        config.sync.clone(),
    )
    .with_connectivity(Arc::new(ManualConnectivity::new(online)));

    orchestrator
        .load()
        .await
        .context("Failed to load offline queue")?;
    Ok(orchestrator)
}

fn fence(config: &AppConfig, target: &Coordinate, radius: Option<f64>) -> Result<Geofence> {
    let radius = radius.unwrap_or(config.geofence.default_radius_meters);
    Geofence::new(*target, radius).context("Invalid radius")
}

/// Print the distance between two points.
fn cmd_distance(from: &Coordinate, to: &Coordinate) -> Result<()> {
    let distance = GeofencingService::new().distance_between(from, to);
    println!("Distance: {:.2} m", distance);
    Ok(())
}

/// Print a proximity check.
fn cmd_check(
    config: &AppConfig,
    current: &Coordinate,
    target: &Coordinate,
    radius: Option<f64>,
) -> Result<()> {
    let fence = fence(config, target, radius)?;
    let result = fence.contains(current);

    println!("Distance: {:.2} m", result.distance_meters);
    println!("Radius: {:.2} m", fence.radius_meters());
    println!(
        "Within range: {}",
        if result.is_within_range { "yes" } else { "no" }
    );
    Ok(())
}

/// Gate a capture on the geofence and enqueue it.
async fn cmd_capture(
    config: &AppConfig,
    data_dir: &std::path::Path,
    current: &Coordinate,
    target: &Coordinate,
    radius: Option<f64>,
    payload: String,
) -> Result<()> {
    let fence = fence(config, target, radius)?;
    let orchestrator = Arc::new(open_queue(config, data_dir, data_dir.join("outbox"), true).await?);
    let gate = CaptureGate::new(orchestrator.clone());

    let receipt = gate
        .capture(current, &fence, payload)
        .await
        .context("Capture rejected")?;

    println!("Capture queued: {}", receipt.item.id);
    println!("  Distance: {:.2} m", receipt.proximity.distance_meters);
    println!("  Pending: {}", orchestrator.queue_count());
    Ok(())
}

/// Enqueue a payload.
async fn cmd_enqueue(config: &AppConfig, data_dir: &std::path::Path, payload: String) -> Result<()> {
    let orchestrator = open_queue(config, data_dir, data_dir.join("outbox"), true).await?;
    let item = orchestrator
        .add_to_queue(payload)
        .await
        .context("Failed to enqueue payload")?;

    println!("Queued: {} ({})", item.id, item.payload_ref);
    println!("  Pending: {}", orchestrator.queue_count());
    Ok(())
}

/// Upload the queue.
async fn cmd_sync(
    config: &AppConfig,
    data_dir: &std::path::Path,
    outbox: PathBuf,
    offline: bool,
) -> Result<()> {
    info!("Syncing offline queue to {}", outbox.display());
    let orchestrator = open_queue(config, data_dir, outbox, !offline).await?;

    match orchestrator.sync_offline_data().await.context("Sync failed")? {
        SyncOutcome::Completed { uploaded, duration } => {
            println!("Synced {} captures in {:?}", uploaded, duration);
        }
        SyncOutcome::Skipped(SkipReason::Offline) => {
            println!(
                "Offline: {} captures kept for later",
                orchestrator.queue_count()
            );
        }
        SyncOutcome::Skipped(SkipReason::EmptyQueue) => println!("Nothing to sync."),
        SyncOutcome::Skipped(SkipReason::AlreadyInProgress) => {
            println!("A sync is already in progress.")
        }
    }
    Ok(())
}

/// Discard the queue.
async fn cmd_clear(config: &AppConfig, data_dir: &std::path::Path) -> Result<()> {
    let orchestrator = open_queue(config, data_dir, data_dir.join("outbox"), true).await?;
    let discarded = orchestrator.queue_count();
    orchestrator
        .clear_queue()
        .await
        .context("Failed to clear queue")?;

    println!("Discarded {} captures.", discarded);
    Ok(())
}

/// Show queue status.
async fn cmd_status(config: &AppConfig, data_dir: &std::path::Path) -> Result<()> {
    let orchestrator = open_queue(config, data_dir, data_dir.join("outbox"), true).await?;
    let state = orchestrator.state();

    println!("Queue Status:");
    println!("  Online: {}", state.is_online);
    println!("  Sync in progress: {}", state.sync_in_progress);
    println!("  Pending: {}", state.queue_count);

    for item in orchestrator.queue().await {
        println!(
            "  [{}] {} {}",
            item.enqueued_at.format("%Y-%m-%d %H:%M:%S"),
            item.id,
            item.payload_ref
        );
    }
    Ok(())
}
