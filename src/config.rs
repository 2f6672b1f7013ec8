use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration. Only the `[db]` section belongs to this crate;
/// the surrounding application layers its own sections on top.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
}

/// Database connection settings for either engine family.
///
/// `driver` selects the dialect; the path field applies to SQLite and the
/// host/port/user/password/name fields to MySQL/MariaDB.
#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(default = "default_path")]
    pub path: PathBuf,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_name")]
    pub name: String,
}

fn default_driver() -> String {
    "sqlite".to_string()
}
fn default_path() -> PathBuf {
    PathBuf::from("wavecap.sqlite")
}
fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    3306
}
fn default_name() -> String {
    "wavecap".to_string()
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            path: default_path(),
            host: default_host(),
            port: default_port(),
            user: String::new(),
            password: String::new(),
            name: default_name(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}
