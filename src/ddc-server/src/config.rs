// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for ddcd.
//!
//! Config is loaded from the `[ddcd]` section of `ddc-rs.toml`.
//! Default search order:
//! 1. Path specified via `--config` CLI argument
//! 2. `./ddc-rs.toml`
//! 3. `~/.config/ddc-rs/ddc-rs.toml`
//! 4. `/etc/ddc-rs/ddc-rs.toml`

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ddc_app::ConfigFile;
use ddc_core::{ControlDb, DeviceId, GroupDb, MonitorDb, SubgroupDb};

/// Top-level daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub general: GeneralConfig,
    /// How to start the privileged helper
    pub helper: HelperProcessConfig,
    /// Retry and delay behavior of control access
    pub behavior: BehaviorConfig,
    /// JSON TCP listener
    pub listen: ListenConfig,
    /// Control metadata, one entry per display model or device
    pub monitors: Vec<MonitorConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperProcessConfig {
    /// Helper executable, looked up in PATH when not absolute
    pub path: String,
    /// Bus backend passed to the helper as `--backend`
    pub backend: Option<String>,
    /// Extra helper arguments
    pub args: Vec<String>,
}

impl Default for HelperProcessConfig {
    fn default() -> Self {
        Self {
            path: "ddc-helper".to_string(),
            backend: None,
            args: Vec::new(),
        }
    }
}

impl HelperProcessConfig {
    /// Full argument list for the helper process.
    pub fn command_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.args.len() + 2);
        if let Some(backend) = &self.backend {
            args.push("--backend".to_string());
            args.push(backend.clone());
        }
        args.extend(self.args.iter().cloned());
        args
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Attempts per control read
    pub read_attempts: u32,
    /// Pause between failed read attempts
    pub retry_delay_ms: u64,
    /// Pause between a Get VCP request and reading the reply
    pub reply_delay_ms: u64,
    /// Keep the session open for the control's write delay after a write
    pub honor_write_delay: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            read_attempts: 3,
            retry_delay_ms: 0,
            reply_delay_ms: 40,
            honor_write_delay: true,
        }
    }
}

impl BehaviorConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub enabled: bool,
    pub listen: IpAddr,
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 4590,
        }
    }
}

/// Metadata for one display.
///
/// Without `device` the entry applies to every display that has no entry
/// of its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub groups: Vec<GroupDb>,
}

impl MonitorConfig {
    pub fn database(&self) -> MonitorDb {
        MonitorDb {
            name: self.name.clone(),
            groups: self.groups.clone(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_log_level(self.general.log_level.as_deref())?;

        if self.helper.path.trim().is_empty() {
            return Err("[helper].path must not be empty".to_string());
        }
        if self.behavior.read_attempts == 0 {
            return Err("[behavior].read_attempts must be > 0".to_string());
        }
        if self.listen.enabled && self.listen.port == 0 {
            return Err("[listen].port must be > 0 when listener is enabled".to_string());
        }

        let mut seen_default = false;
        for (idx, monitor) in self.monitors.iter().enumerate() {
            match monitor.device.as_deref() {
                Some(device) => {
                    if !DeviceId::from(device).is_allowed() {
                        return Err(format!(
                            "[[monitors]][{}].device '{}' is not a dev:/dev/i2c-N identifier",
                            idx, device
                        ));
                    }
                }
                None if seen_default => {
                    return Err(
                        "only one [[monitors]] entry may omit the device field".to_string()
                    );
                }
                None => seen_default = true,
            }
        }
        Ok(())
    }

    /// Generate an example configuration wrapped under the `[ddcd]`
    /// section header, suitable for use in a combined `ddc-rs.toml` file.
    pub fn example_combined_toml() -> String {
        #[derive(Serialize)]
        struct Wrapper {
            #[serde(rename = "ddcd")]
            inner: ServerConfig,
        }
        let example = ServerConfig {
            general: GeneralConfig {
                log_level: Some("info".to_string()),
            },
            helper: HelperProcessConfig {
                backend: Some("i2cdev".to_string()),
                ..HelperProcessConfig::default()
            },
            behavior: BehaviorConfig::default(),
            listen: ListenConfig::default(),
            monitors: vec![MonitorConfig {
                device: Some("dev:/dev/i2c-4".to_string()),
                name: Some("Generic VESA display".to_string()),
                groups: vec![GroupDb {
                    name: "Image".to_string(),
                    subgroups: vec![SubgroupDb {
                        name: "Adjustments".to_string(),
                        controls: vec![
                            ControlDb {
                                name: "brightness".to_string(),
                                address: 0x10,
                                delay_ms: None,
                            },
                            ControlDb {
                                name: "input_source".to_string(),
                                address: 0x60,
                                delay_ms: Some(200),
                            },
                        ],
                    }],
                }],
            }],
        };
        toml::to_string_pretty(&Wrapper { inner: example }).unwrap_or_default()
    }
}

fn validate_log_level(level: Option<&str>) -> Result<(), String> {
    if let Some(level) = level {
        match level {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(format!(
                    "[general].log_level '{}' is invalid (expected one of: trace, debug, info, warn, error)",
                    level
                ))
            }
        }
    }
    Ok(())
}

impl ConfigFile for ServerConfig {
    fn section_key() -> &'static str {
        "ddcd"
    }
}
