// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

mod channel;
mod config;
mod engine;
mod listener;
mod orchestrator;
mod session;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use ddc_app::{init_logging, ConfigFile};
use ddc_core::retry::FixedAttempts;
use ddc_core::DynResult;

use channel::ProcessChannel;
use config::ServerConfig;
use engine::ControlEngine;
use listener::BroadcastListener;
use orchestrator::{MetadataCatalog, Orchestrator};

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - DDC/CI display control daemon");
const EVENT_CHANNEL_BUFFER: usize = 64;

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print example configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
    /// Helper executable to spawn
    #[arg(long = "helper", value_name = "PATH")]
    helper: Option<String>,
    /// Bus backend the helper should use (e.g. i2cdev, dummy)
    #[arg(short = 'b', long = "backend")]
    backend: Option<String>,
    /// IP address for the JSON TCP listener
    #[arg(short = 'l', long = "listen")]
    listen: Option<IpAddr>,
    /// Port for the JSON TCP listener
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", ServerConfig::example_combined_toml());
        return Ok(());
    }

    let (mut cfg, config_path) = ServerConfig::load(cli.config.as_deref())?;
    if let Some(helper) = cli.helper {
        cfg.helper.path = helper;
    }
    if let Some(backend) = cli.backend {
        cfg.helper.backend = Some(backend);
    }
    if let Some(ip) = cli.listen {
        cfg.listen.listen = ip;
    }
    if let Some(port) = cli.port {
        cfg.listen.port = port;
    }
    cfg.validate()
        .map_err(|e| format!("Invalid server configuration: {}", e))?;

    init_logging(cfg.general.log_level.as_deref());
    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    let helper = ProcessChannel::spawn(&cfg.helper)?;
    if let Some(pid) = helper.pid() {
        info!("Helper started (pid {})", pid);
    }

    let engine = ControlEngine::new(
        Box::new(FixedAttempts::new(
            cfg.behavior.read_attempts,
            cfg.behavior.retry_delay(),
        )),
        cfg.behavior.reply_delay(),
    );
    let catalog = MetadataCatalog::from_config(&cfg.monitors);
    info!(
        "Starting ddcd ({} read attempts, {} monitor metadata entries)",
        engine.max_attempts(),
        cfg.monitors.len()
    );

    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_BUFFER);
    let mut orchestrator = Orchestrator::new(Box::new(helper), engine, catalog)
        .with_write_delay(cfg.behavior.honor_write_delay);
    orchestrator.register_listener(Arc::new(BroadcastListener::new(event_tx.clone())));
    let orchestrator = Arc::new(orchestrator);

    match orchestrator.list_devices().await {
        Ok(devices) if devices.is_empty() => warn!("No DDC/CI capable buses found"),
        Ok(devices) => {
            for device in &devices {
                info!("Found {}", device);
            }
        }
        Err(e) => error!("Initial bus enumeration failed: {}", e),
    }

    let mut task_handles: Vec<JoinHandle<()>> = Vec::new();
    if cfg.listen.enabled {
        let listen_addr = SocketAddr::from((cfg.listen.listen, cfg.listen.port));
        let orch = Arc::clone(&orchestrator);
        let events = event_tx.clone();
        task_handles.push(tokio::spawn(async move {
            if let Err(e) = listener::run_listener(listen_addr, orch, events).await {
                error!("Listener error: {:?}", e);
            }
        }));
    } else {
        warn!("JSON listener disabled in configuration");
    }

    signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down");

    for handle in &task_handles {
        handle.abort();
    }
    for handle in task_handles {
        let _ = handle.await;
    }
    Ok(())
}
