// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration for ddcctl, read from the `[ddcctl]` section of
//! `ddc-rs.toml`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use ddc_app::ConfigFile;

use crate::remote::{parse_remote_url, RemoteEndpoint, DEFAULT_REMOTE_PORT};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub general: GeneralConfig,
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// ddcd address (host, host:port or tcp://host:port)
    pub url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: format!("127.0.0.1:{}", DEFAULT_REMOTE_PORT),
            timeout_ms: 10_000,
        }
    }
}

impl RemoteConfig {
    pub fn endpoint(&self) -> Result<RemoteEndpoint, String> {
        parse_remote_url(&self.url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(level) = self.general.log_level.as_deref() {
            if level.parse::<tracing::Level>().is_err() {
                return Err(format!("[general].log_level '{}' is invalid", level));
            }
        }
        self.remote
            .endpoint()
            .map_err(|e| format!("[remote].url: {}", e))?;
        if self.remote.timeout_ms == 0 {
            return Err("[remote].timeout_ms must be > 0".to_string());
        }
        Ok(())
    }

    /// Example configuration under the `[ddcctl]` header.
    pub fn example_combined_toml() -> String {
        #[derive(Serialize)]
        struct Wrapper {
            #[serde(rename = "ddcctl")]
            inner: ClientConfig,
        }
        let example = ClientConfig {
            general: GeneralConfig {
                log_level: Some("warn".to_string()),
            },
            remote: RemoteConfig::default(),
        };
        toml::to_string_pretty(&Wrapper { inner: example }).unwrap_or_default()
    }
}

impl ConfigFile for ClientConfig {
    fn section_key() -> &'static str {
        "ddcctl"
    }
}
