//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/triage.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:8000"
//!
//! [store]
//! enabled = true
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Only `[db]` is required; every other section has defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

/// Whether triage consults the persisted store. When disabled the service
/// runs on request data alone.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Defaults for commands that can run without a config file. The store
    /// is disabled since there is no database path to trust.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/triage.sqlite"),
            },
            server: ServerConfig::default(),
            store: StoreConfig { enabled: false },
            logging: LoggingConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields [`Config::minimal`].
/// A file that exists and fails to parse or validate is still an error.
pub fn load_config_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.db.path.as_os_str().is_empty() {
        anyhow::bail!("db.path must not be empty");
    }
    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        anyhow::bail!(
            "Unknown logging level: '{}'. Must be one of {}.",
            config.logging.level,
            LOG_LEVELS.join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let cfg: Config = toml::from_str("[db]\npath = \"/tmp/t.sqlite\"\n").unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:8000");
        assert!(cfg.store.enabled);
        assert_eq!(cfg.logging.level, "info");
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn test_rejects_unknown_level() {
        let cfg: Config =
            toml::from_str("[db]\npath = \"t.sqlite\"\n[logging]\nlevel = \"loud\"\n").unwrap();
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("Unknown logging level"));
    }

    #[test]
    fn test_rejects_empty_bind() {
        let cfg: Config =
            toml::from_str("[db]\npath = \"t.sqlite\"\n[server]\nbind = \" \"\n").unwrap();
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn test_minimal_disables_store() {
        assert!(!Config::minimal().store.enabled);
    }

    #[test]
    fn test_missing_file_falls_back_to_minimal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = load_config_or_minimal(&tmp.path().join("absent.toml")).unwrap();
        assert!(!cfg.store.enabled);
    }

    #[test]
    fn test_broken_file_is_not_ignored() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("triage.toml");
        std::fs::write(&path, "[db]\npath = \"t.sqlite\"\n[logging]\nlevel = \"loud\"\n").unwrap();
        let err = load_config_or_minimal(&path).unwrap_err();
        assert!(err.to_string().contains("Unknown logging level"));

        std::fs::write(&path, "not toml [").unwrap();
        assert!(load_config_or_minimal(&path).is_err());
    }
}
