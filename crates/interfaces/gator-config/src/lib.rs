//! Central configuration constants and user-tunable client settings.

use std::collections::BTreeMap;

mod settings;

pub use settings::{default_settings_path, ClientSettings, SettingsError};

/// Delay between two polls of an accepted (202) backend task, in milliseconds.
pub const POLLING_INTERVAL_MS: u64 = 1000;

/// Path segment under which the backend mounts its REST API.
pub const API_NAMESPACE: &str = "conda";

/// Server root used when no URL is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8888/";

/// Built-in environment types: type name -> package specs to create it with.
pub fn default_environment_types() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        (
            "python3".to_string(),
            vec!["python=3".to_string(), "ipykernel".to_string()],
        ),
        (
            "r".to_string(),
            vec!["r-base".to_string(), "r-essentials".to_string()],
        ),
    ])
}
