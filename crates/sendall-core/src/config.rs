use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{Compression, Expiry, PasteFormat};

/// Top-level configuration (loaded from sendall.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SendallConfig {
    pub store: StoreConfig,
    pub privatebin: PrivateBinConfig,
    pub transfer: TransferConfig,
    pub pipeline: PipelineConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Link database file (redb)
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivateBinConfig {
    /// PrivateBin instance URL; pastes are POSTed here
    pub host: String,
    pub expire: Expiry,
    pub format: PasteFormat,
    pub open_discussion: bool,
    pub burn_after_reading: bool,
    pub compression: Compression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// transfer.sh instance URL
    pub host: String,
    /// Downloads before the link expires (-1 = unlimited)
    pub max_downloads: i64,
    /// Days before the file is removed
    pub max_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Concurrent submissions/deletions (0 = available parallelism)
    pub workers: usize,
    /// Overall deadline for a batch in seconds (0 = none)
    pub deadline_secs: u64,
    /// Per-request HTTP timeout in seconds (0 = none)
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

/// Upper bound on concurrent submissions/deletions.
pub const MAX_WORKERS: usize = 1024;

impl PipelineConfig {
    /// Effective worker count, in `1..=MAX_WORKERS`.
    pub fn workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers.min(MAX_WORKERS);
        }
        std::thread::available_parallelism()
            .map(|n| n.get().min(MAX_WORKERS))
            .unwrap_or(4)
    }

    pub fn deadline(&self) -> Option<Duration> {
        (self.deadline_secs > 0).then(|| Duration::from_secs(self.deadline_secs))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

impl SendallConfig {
    /// Read a TOML config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> crate::SendallResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::SendallError::Config(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| crate::SendallError::Config(format!("parsing {}: {e}", path.display())))
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("~/.local/share/sendall/sendall.db"),
        }
    }
}

impl Default for PrivateBinConfig {
    fn default() -> Self {
        Self {
            host: "https://bin.fraq.io".into(),
            expire: Expiry::OneWeek,
            format: PasteFormat::PlainText,
            open_discussion: false,
            burn_after_reading: false,
            compression: Compression::None,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            host: "https://transfer.sh".into(),
            max_downloads: -1,
            max_days: 7,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            deadline_secs: 0,
            request_timeout_secs: 60,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}
