use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const QUALIFIER: &str = "org";
const ORG: &str = "mamba";
const APP: &str = "gator";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

fn default_base_url() -> String {
    crate::DEFAULT_BASE_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    crate::POLLING_INTERVAL_MS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Server root; the API lives under `<base_url>/conda`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "crate::default_environment_types")]
    pub environment_types: BTreeMap<String, Vec<String>>,
    /// Export environments from their explicit install history by default.
    #[serde(default)]
    pub from_history: bool,
    /// List only whitelisted environments.
    #[serde(default)]
    pub whitelist: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            environment_types: crate::default_environment_types(),
            from_history: false,
            whitelist: false,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ClientSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// `settings.json` inside the platform config directory, if one exists.
pub fn default_settings_path() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORG, APP).map(|dirs| dirs.config_dir().join("settings.json"))
}
