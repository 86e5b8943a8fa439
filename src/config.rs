use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MetaStoreError, Result};
use crate::storage::sqlite::DEFAULT_BUSY_TIMEOUT;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub secret: SecretConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file.
    pub path: PathBuf,
    /// How long to wait on locks held by other connections.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("metastore.db"),
            busy_timeout_ms: u64::try_from(DEFAULT_BUSY_TIMEOUT.as_millis()).unwrap_or(5000),
        }
    }
}

impl DatabaseConfig {
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Meta store table.
    pub table: String,
    /// Revision key written by releases that kept one revision row for all
    /// tables; moved to the table-scoped key before schema preparation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_revision_key: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table: "meta_store".to_string(),
            legacy_revision_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SecretConfig {
    pub key_bits: usize,
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            key_bits: 256,
            max_age: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// The explicit path wins, then `METASTORE_CONFIG`, then
    /// `<config dir>/metastore/config.toml` if present. Environment
    /// overrides apply last.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("METASTORE_CONFIG").ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::load_file(&path)?.ok_or_else(|| {
                MetaStoreError::Config(format!("config file not found: {}", path.display()))
            })?,
            None => match dirs::config_dir() {
                Some(dir) => Self::load_file(&dir.join("metastore/config.toml"))?.unwrap_or_default(),
                None => Self::default(),
            },
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| MetaStoreError::Config(format!("read config {}: {err}", path.display())))?;
        let config = toml::from_str(&raw)
            .map_err(|err| MetaStoreError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(config))
    }

    /// Apply `METASTORE_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("METASTORE_DB_PATH") {
            self.database.path = PathBuf::from(value);
        }
        if let Some(value) = parse_env(&lookup, "METASTORE_BUSY_TIMEOUT_MS")? {
            self.database.busy_timeout_ms = value;
        }
        if let Some(value) = lookup("METASTORE_TABLE") {
            self.store.table = value;
        }
        if let Some(value) = lookup("METASTORE_LEGACY_REVISION_KEY") {
            self.store.legacy_revision_key = Some(value).filter(|v| !v.is_empty());
        }
        if let Some(value) = parse_env(&lookup, "METASTORE_SECRET_KEY_BITS")? {
            self.secret.key_bits = value;
        }
        if let Some(value) = parse_env::<u64, _>(&lookup, "METASTORE_SECRET_MAX_AGE_SECS")? {
            self.secret.max_age = Duration::from_secs(value);
        }
        Ok(())
    }
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| MetaStoreError::Config(format!("{key}: {err}"))),
        None => Ok(None),
    }
}
