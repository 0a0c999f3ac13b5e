//! Configuration file loading and storage backend selection.
//!
//! DevTrack reads an optional TOML file. Every value has a default, and the
//! binaries layer command-line flags and environment variables on top.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:5000"
//!
//! [storage]
//! url = "sqlite:data/tickets.db"
//! lock_timeout_ms = 2000
//! ```

use crate::storage::{InMemoryStorage, JsonFileStorage, SqliteStorage, TicketStore};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Storage used when nothing is configured.
pub const DEFAULT_STORAGE_URL: &str = "file:data/tickets.json";

/// Server address used when nothing is configured.
pub const DEFAULT_BIND: &str = "0.0.0.0:5000";

const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DevtrackConfig {
    /// HTTP server settings (optional).
    pub server: Option<ServerConfig>,
    /// Storage backend settings (optional).
    pub storage: Option<StorageSection>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: Option<String>,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    /// Backend URL: `memory`, `file:<path>`, or `sqlite:<path>`.
    pub url: Option<String>,
    /// How long the file backend waits for a contended lock.
    pub lock_timeout_ms: Option<u64>,
}

impl DevtrackConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Load the file if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse TOML")
    }

    /// Server bind address with default fallback.
    pub fn bind(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
    }

    /// Storage URL with default fallback.
    pub fn storage_url(&self) -> String {
        self.storage
            .as_ref()
            .and_then(|s| s.url.clone())
            .unwrap_or_else(|| DEFAULT_STORAGE_URL.to_string())
    }

    pub fn lock_timeout(&self) -> Duration {
        let ms = self
            .storage
            .as_ref()
            .and_then(|s| s.lock_timeout_ms)
            .unwrap_or(DEFAULT_LOCK_TIMEOUT_MS);
        Duration::from_millis(ms)
    }

    /// Resolve the storage backend, letting `override_url` win over the file.
    pub fn storage_config(&self, override_url: Option<&str>) -> Result<StorageConfig> {
        let url = override_url
            .map(str::to_string)
            .unwrap_or_else(|| self.storage_url());
        let mut config: StorageConfig = url.parse()?;
        if let StorageConfig::File { lock_timeout, .. } = &mut config {
            *lock_timeout = self.lock_timeout();
        }
        Ok(config)
    }
}

/// Which backend holds the tickets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// Process-lifetime storage
    Memory,
    /// Single JSON document rewritten on every change
    File { path: PathBuf, lock_timeout: Duration },
    /// SQLite database; `None` means a private in-memory database
    Sqlite { path: Option<PathBuf> },
}

impl FromStr for StorageConfig {
    type Err = anyhow::Error;

    /// Parse a storage URL.
    ///
    /// Accepts `memory`, `file:<path>`, `sqlite:<path>`, `sqlite::memory:`,
    /// and `sqlite://<path>`. A bare path ending in `.json` is a file store.
    fn from_str(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            bail!("Storage URL is empty");
        }

        if url == "memory" || url == "memory:" {
            return Ok(StorageConfig::Memory);
        }
        if let Some(rest) = url.strip_prefix("sqlite:") {
            let rest = rest.strip_prefix("//").unwrap_or(rest);
            if rest.is_empty() {
                bail!("Missing database path in storage URL '{}'", url);
            }
            let path = (rest != ":memory:").then(|| PathBuf::from(rest));
            return Ok(StorageConfig::Sqlite { path });
        }
        if let Some(rest) = url.strip_prefix("file:") {
            let rest = rest.strip_prefix("//").unwrap_or(rest);
            if rest.is_empty() {
                bail!("Missing file path in storage URL '{}'", url);
            }
            return Ok(StorageConfig::file(rest));
        }
        if url.ends_with(".json") {
            return Ok(StorageConfig::file(url));
        }

        bail!(
            "Unsupported storage URL '{}' (expected memory, file:<path>, or sqlite:<path>)",
            url
        )
    }
}

impl fmt::Display for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageConfig::Memory => write!(f, "memory"),
            StorageConfig::File { path, .. } => write!(f, "file:{}", path.display()),
            StorageConfig::Sqlite { path: None } => write!(f, "sqlite::memory:"),
            StorageConfig::Sqlite { path: Some(path) } => write!(f, "sqlite:{}", path.display()),
        }
    }
}

impl StorageConfig {
    fn file(path: impl Into<PathBuf>) -> Self {
        StorageConfig::File {
            path: path.into(),
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
        }
    }

    /// Open and initialize the configured backend.
    pub fn open(&self) -> Result<Arc<dyn TicketStore>> {
        let store: Arc<dyn TicketStore> = match self {
            StorageConfig::Memory => Arc::new(InMemoryStorage::new()),
            StorageConfig::File { path, lock_timeout } => {
                Arc::new(JsonFileStorage::with_lock_timeout(path, *lock_timeout))
            }
            StorageConfig::Sqlite { path: Some(path) } => Arc::new(SqliteStorage::open(path)?),
            StorageConfig::Sqlite { path: None } => Arc::new(SqliteStorage::open_in_memory()?),
        };

        store
            .init()
            .with_context(|| format!("Failed to initialize storage {}", self))?;
        info!(backend = store.backend_name(), storage = %self, "Storage ready");
        Ok(store)
    }
}
