// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! RoomHub - Hotel Room Automation Backend
//!
//! Connects to an MQTT broker, ingests room sensor messages, keeps a
//! per-room time series in SQLite and drives AC and lighting setpoints
//! from occupancy and air-quality readings.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use roomhub::simulator;
use roomhub::{Config, Database, Subscriber, VERSION};

/// RoomHub - Hotel Room Automation Backend
#[derive(Parser, Debug)]
#[command(name = "roomhub")]
#[command(author = "RoomHub Project")]
#[command(version = VERSION)]
#[command(about = "Event-driven hotel room automation backend")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Demo mode with simulated sensors
    #[arg(long)]
    demo: bool,

    /// Provision this many sample rooms before starting
    #[arg(long)]
    seed_rooms: Option<u32>,

    /// MQTT broker address
    #[arg(long)]
    mqtt_broker: Option<String>,

    /// Data output directory
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("RoomHub v{} - Hotel Room Automation Backend", VERSION);

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Override with command line args
    if args.demo {
        config.demo_mode = true;
    }
    if let Some(data_dir) = args.data_dir.clone() {
        config.data_dir = data_dir;
    }
    if let Some(broker) = args.mqtt_broker.clone() {
        config.mqtt.broker = broker;
    }

    info!("Configuration loaded from {:?}", config_path);
    info!("Demo mode: {}", config.demo_mode);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config, args))
}

async fn run(config: Config, args: Args) -> Result<()> {
    let db = Arc::new(Database::open(&config.database)?);

    // Provision rooms before the subscriber starts, so the first demo
    // messages already resolve.
    if let Some(count) = args.seed_rooms {
        let rooms = simulator::provision_rooms(&db, count)?;
        info!("Provisioned {} rooms", rooms.len());
    }
    let demo_rooms = if config.demo_mode {
        let existing = db.all_rooms()?;
        if existing.is_empty() {
            simulator::provision_rooms(&db, config.demo.rooms)?
        } else {
            existing
        }
    } else {
        Vec::new()
    };

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(8);

    let (subscriber, bus) = Subscriber::new(&config.mqtt, db.clone());
    let subscriber_task = tokio::spawn(subscriber.run(shutdown_tx.subscribe()));

    let mut producer_tasks = Vec::new();
    if config.demo_mode {
        producer_tasks = simulator::spawn_producers(&bus, &demo_rooms, &config.demo, &shutdown_tx);
        info!("Started {} demo producers", producer_tasks.len());
    }

    info!("RoomHub running - press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received, cleaning up...");
    let _ = shutdown_tx.send(());

    for task in producer_tasks {
        if let Err(err) = task.await {
            warn!("producer task failed: {err}");
        }
    }
    match subscriber_task.await {
        Ok(result) => result?,
        Err(err) => warn!("subscriber task failed: {err}"),
    }

    info!("RoomHub shutdown complete");
    Ok(())
}
