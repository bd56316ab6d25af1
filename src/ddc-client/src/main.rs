// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

mod config;
mod remote;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use ddc_app::{init_stderr_logging, ConfigFile};
use ddc_core::DynResult;
use ddc_protocol::types::{ServiceCommand, ServiceEvent, ServiceResult};

use config::ClientConfig;
use remote::Connection;

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - command line client for ddcd");

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
    /// ddcd address (host, host:port or tcp://host:port)
    #[arg(short = 'u', long = "url")]
    url: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List displays reachable over DDC/CI
    List,
    /// Read a control value
    Get {
        /// Device identifier, e.g. dev:/dev/i2c-4
        device: String,
        /// VCP code, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_number)]
        control: u32,
    },
    /// Write a control value
    Set {
        device: String,
        #[arg(value_parser = parse_number)]
        control: u32,
        #[arg(value_parser = parse_number)]
        value: u32,
    },
    /// Print control changes as they happen
    Watch,
}

fn parse_number(input: &str) -> Result<u32, String> {
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("'{}' is not a number", input))
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", ClientConfig::example_combined_toml());
        return Ok(());
    }
    let Some(command) = cli.command else {
        return Err("no command given (try --help)".into());
    };

    let (mut cfg, config_path) = ClientConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.url {
        cfg.remote.url = url;
    }
    cfg.validate()
        .map_err(|e| format!("Invalid client configuration: {}", e))?;

    init_stderr_logging(cfg.general.log_level.as_deref());
    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    let endpoint = cfg.remote.endpoint()?;
    let mut conn = Connection::connect(&endpoint, cfg.remote.timeout()).await?;

    match command {
        Command::List => {
            if let ServiceResult::Monitors { monitors } =
                conn.request(&ServiceCommand::GetMonitors).await?
            {
                for device in monitors {
                    println!("{}", device);
                }
            }
        }
        Command::Get { device, control } => {
            if let ServiceResult::Control { value, maximum } = conn
                .request(&ServiceCommand::GetControl { device, control })
                .await?
            {
                println!("0x{:02x}: {} / {}", control, value, maximum);
            }
        }
        Command::Set {
            device,
            control,
            value,
        } => {
            conn.request(&ServiceCommand::SetControl {
                device,
                control,
                value,
            })
            .await?;
        }
        Command::Watch => loop {
            match conn.next_event().await? {
                ServiceEvent::ControlChanged {
                    device,
                    control,
                    value,
                } => println!("{} 0x{:02x} = {}", device, control, value),
            }
        },
    }
    Ok(())
}
