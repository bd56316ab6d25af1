// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use ddc_app::{init_stderr_logging, ConfigFile};
use ddc_backend::{register_builtin_backends_on, Dispatcher, RegistrationContext};
use ddc_core::DynResult;

use config::HelperConfig;

const PKG_DESCRIPTION: &str = concat!(
    env!("CARGO_PKG_NAME"),
    " - privileged DDC/CI bus helper (queries on stdin, answers on stdout)"
);

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
    /// List available bus backends and exit
    #[arg(long = "list-backends")]
    list_backends: bool,
    /// Bus backend to use (e.g. i2cdev, dummy)
    #[arg(short = 'b', long = "backend")]
    backend: Option<String>,
    /// Directory holding i2c-N device nodes
    #[arg(long = "dev-dir", value_name = "DIR")]
    dev_dir: Option<PathBuf>,
    /// Number of displays emulated by the dummy backend
    #[arg(long = "monitors")]
    monitors: Option<usize>,
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let mut registry = RegistrationContext::new();
    register_builtin_backends_on(&mut registry);

    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", HelperConfig::example_combined_toml());
        return Ok(());
    }
    if cli.list_backends {
        for name in registry.registered_backends() {
            println!("{}", name);
        }
        return Ok(());
    }

    let (mut cfg, config_path) = HelperConfig::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        cfg.bus.backend = backend;
    }
    if let Some(dir) = cli.dev_dir {
        cfg.bus.dev_dir = dir;
    }
    if let Some(count) = cli.monitors {
        cfg.bus.emulated_monitors = count;
    }
    cfg.validate()
        .map_err(|e| format!("Invalid helper configuration: {}", e))?;

    init_stderr_logging(cfg.general.log_level.as_deref());
    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    if !registry.is_backend_registered(&cfg.bus.backend) {
        return Err(format!(
            "Unknown bus backend '{}' (available: {})",
            cfg.bus.backend,
            registry.registered_backends().join(", ")
        )
        .into());
    }
    let backend = registry.build_backend(&cfg.bus.backend, &cfg.bus.options())?;

    let mut dispatcher = Dispatcher::new(backend);
    dispatcher
        .serve(tokio::io::stdin(), tokio::io::stdout())
        .await?;
    Ok(())
}
