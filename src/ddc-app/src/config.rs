// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "ddc-rs.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, String),

    #[error("Failed to parse config file {0}: {1}")]
    ParseError(PathBuf, String),
}

/// Returns the default search paths for `ddc-rs.toml`
/// (current directory, XDG config, /etc).
fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("ddc-rs").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from("/etc/ddc-rs").join(CONFIG_FILE_NAME));
    paths
}

/// Extract and deserialize a named section from TOML text.
fn parse_section<T: DeserializeOwned>(
    path: &Path,
    content: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    let table: toml::Table = toml::from_str(content)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

    let Some(section) = table.get(key) else {
        return Ok(None);
    };

    // Round-trip through text so serde defaults apply to missing keys.
    let section_toml = toml::to_string(section)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
    let cfg = toml::from_str::<T>(&section_toml)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
    Ok(Some(cfg))
}

/// Returns `Ok(None)` when the file has no `[key]` section.
fn load_section_from_file<T: DeserializeOwned>(
    path: &Path,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;
    parse_section(path, &content, key)
}

/// Trait for loading configuration from a `ddc-rs.toml` section.
pub trait ConfigFile: Sized + Default + DeserializeOwned {
    /// Section key in `ddc-rs.toml` (e.g. `"ddcd"` or `"ddcctl"`).
    fn section_key() -> &'static str;

    /// Load the section from a specific file path.
    ///
    /// Fails if the file cannot be read, is not valid TOML, or has no
    /// `[<section_key>]` table.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        load_section_from_file::<Self>(path, Self::section_key())?.ok_or_else(|| {
            ConfigError::ParseError(
                path.to_path_buf(),
                format!("missing [{}] section", Self::section_key()),
            )
        })
    }

    /// Parse the section out of an in-memory document.
    fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        let origin = PathBuf::from("<inline>");
        parse_section::<Self>(&origin, content, Self::section_key())?.ok_or_else(|| {
            ConfigError::ParseError(origin, format!("missing [{}] section", Self::section_key()))
        })
    }

    /// Search default paths and load the first file that contains the
    /// expected section.
    ///
    /// Returns `(Default::default(), None)` when no config file is found.
    fn load_from_default_paths() -> Result<(Self, Option<PathBuf>), ConfigError> {
        for path in config_search_paths() {
            if path.exists() {
                if let Some(cfg) = load_section_from_file::<Self>(&path, Self::section_key())? {
                    return Ok((cfg, Some(path)));
                }
            }
        }
        Ok((Self::default(), None))
    }

    /// `--config <path>` if given, the default search otherwise.
    fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match explicit {
            Some(path) => Ok((Self::load_from_file(path)?, Some(path.to_path_buf()))),
            None => Self::load_from_default_paths(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        name: String,
        port: u16,
    }

    impl ConfigFile for Sample {
        fn section_key() -> &'static str {
            "sample"
        }
    }

    fn scratch_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_search_paths_order() {
        let paths = config_search_paths();
        assert_eq!(paths.first(), Some(&PathBuf::from("ddc-rs.toml")));
        assert_eq!(
            paths.last(),
            Some(&PathBuf::from("/etc/ddc-rs/ddc-rs.toml"))
        );
    }

    #[test]
    fn test_load_section_with_defaults() {
        let cfg = Sample::load_from_str("[sample]\nport = 4590\n").unwrap();
        assert_eq!(
            cfg,
            Sample {
                name: String::new(),
                port: 4590
            }
        );
    }

    #[test]
    fn test_missing_section_is_error() {
        let err = Sample::load_from_str("[other]\nport = 1\n").unwrap_err();
        assert!(err.to_string().contains("missing [sample] section"));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(matches!(
            Sample::load_from_str("[sample\n"),
            Err(ConfigError::ParseError(_, _))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let file = scratch_file("[sample]\nname = \"desk\"\n");
        let (cfg, found) = Sample::load(Some(file.path())).unwrap();
        assert_eq!(cfg.name, "desk");
        assert_eq!(found.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_unreadable_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ddc-rs.toml");
        assert!(matches!(
            Sample::load_from_file(&path),
            Err(ConfigError::ReadError(_, _))
        ));
    }
}
