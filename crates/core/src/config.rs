//! Docpref configuration
//!
//! Loaded from a YAML file, then overridden by environment variables:
//! - `DOCPREF_DB_PATH`
//! - `DOCPREF_BACKEND` (`memory` or `sqlite`)
//! - `DOCPREF_COLLECTION`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{PrefError, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocprefConfig {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Runtime configuration
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl DocprefConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| PrefError::Config(e.to_string()))
    }

    /// Load from a YAML file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Apply `DOCPREF_*` overrides read through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("DOCPREF_DB_PATH") {
            self.storage.db_path = PathBuf::from(path);
        }
        if let Some(backend) = lookup("DOCPREF_BACKEND") {
            self.storage.backend = backend.parse()?;
        }
        if let Some(collection) = lookup("DOCPREF_COLLECTION") {
            self.storage.collection = collection;
        }
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env_overrides(|name| std::env::var(name).ok())
    }
}

/// Storage engine selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Memory,
    #[default]
    Sqlite,
}

impl std::str::FromStr for Backend {
    type Err = PrefError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Backend::Memory),
            "sqlite" => Ok(Backend::Sqlite),
            other => Err(PrefError::Config(format!("unknown backend: {other}"))),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage engine
    #[serde(default)]
    pub backend: Backend,

    /// Database file path
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Collection (preference file) name
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Enable SQLite WAL journal mode
    #[serde(default = "default_true")]
    pub enable_wal: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".docpref/prefs.db")
}

fn default_collection() -> String {
    "prefs".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            db_path: default_db_path(),
            collection: default_collection(),
            enable_wal: true,
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Notify change listeners after a successful commit
    #[serde(default = "default_true")]
    pub notify_listeners: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            notify_listeners: true,
        }
    }
}
