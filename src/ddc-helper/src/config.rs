// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration for ddc-helper, read from the `[ddc-helper]` section of
//! `ddc-rs.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use ddc_app::ConfigFile;
use ddc_backend::BackendOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperConfig {
    pub general: GeneralConfig,
    pub bus: BusConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error); logs go to stderr
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Backend name (e.g. "i2cdev", "dummy")
    pub backend: String,
    /// Directory holding `i2c-N` device nodes
    pub dev_dir: PathBuf,
    /// Displays exposed by the dummy backend
    pub emulated_monitors: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        let options = BackendOptions::default();
        Self {
            backend: "i2cdev".to_string(),
            dev_dir: options.dev_dir,
            emulated_monitors: options.emulated_monitors,
        }
    }
}

impl BusConfig {
    pub fn options(&self) -> BackendOptions {
        BackendOptions {
            dev_dir: self.dev_dir.clone(),
            emulated_monitors: self.emulated_monitors,
        }
    }
}

impl HelperConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(level) = self.general.log_level.as_deref() {
            if level.parse::<tracing::Level>().is_err() {
                return Err(format!(
                    "[general].log_level '{}' is invalid (expected one of: trace, debug, info, warn, error)",
                    level
                ));
            }
        }
        if self.bus.backend.trim().is_empty() {
            return Err("[bus].backend must not be empty".to_string());
        }
        Ok(())
    }

    /// Example configuration under the `[ddc-helper]` header.
    pub fn example_combined_toml() -> String {
        #[derive(Serialize)]
        struct Wrapper {
            #[serde(rename = "ddc-helper")]
            inner: HelperConfig,
        }
        let example = HelperConfig {
            general: GeneralConfig {
                log_level: Some("info".to_string()),
            },
            bus: BusConfig::default(),
        };
        toml::to_string_pretty(&Wrapper { inner: example }).unwrap_or_default()
    }
}

impl ConfigFile for HelperConfig {
    fn section_key() -> &'static str {
        "ddc-helper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HelperConfig::default();
        assert_eq!(config.bus.backend, "i2cdev");
        assert_eq!(config.bus.dev_dir, PathBuf::from("/dev"));
        assert_eq!(config.bus.emulated_monitors, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_section() {
        let config = HelperConfig::load_from_str(
            r#"
[ddc-helper.general]
log_level = "debug"

[ddc-helper.bus]
backend = "dummy"
emulated_monitors = 3
"#,
        )
        .unwrap();
        assert_eq!(config.general.log_level.as_deref(), Some("debug"));
        assert_eq!(config.bus.backend, "dummy");
        assert_eq!(config.bus.options().emulated_monitors, 3);
        assert_eq!(config.bus.dev_dir, PathBuf::from("/dev"));
    }

    #[test]
    fn test_validate_rejects_bad_level() {
        let mut config = HelperConfig::default();
        config.general.log_level = Some("chatty".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_example_combined_toml_parses() {
        let text = HelperConfig::example_combined_toml();
        let config = HelperConfig::load_from_str(&text).unwrap();
        assert_eq!(config.bus.backend, "i2cdev");
    }
}
