//! CLI configuration file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use accuread_geofence::GeofenceConfig;
use accuread_sync::SyncConfig;

/// Default configuration file name inside the data directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Which queue store to use and how to configure it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Registered store name ("local" or "memory").
    pub kind: Option<String>,
    /// Store-specific options; `local` reads `root`.
    pub options: Option<serde_json::Value>,
}

impl StoreConfig {
    /// Resolve store name and options, defaulting to a local store under `data_dir`.
    pub fn resolve(&self, data_dir: &Path) -> (String, serde_json::Value) {
        let kind = self.kind.clone().unwrap_or_else(|| "local".to_string());
        let options = self.options.clone().unwrap_or_else(|| {
            serde_json::json!({ "root": data_dir.join("queue").to_string_lossy() })
        });
        (kind, options)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub geofence: GeofenceConfig,
    pub sync: SyncConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file does not exist.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        config
            .geofence
            .validate()
            .context("Invalid geofence configuration")?;
        Ok(config)
    }
}

/// Resolve the data directory: explicit flag, else the platform data dir.
pub fn data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(dir) => Ok(dir),
        None => dirs::data_dir()
            .map(|dir| dir.join("accuread"))
            .context("No platform data directory; pass --data-dir"),
    }
}
