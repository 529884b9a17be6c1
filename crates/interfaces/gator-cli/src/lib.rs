pub mod commands;

use anyhow::{Context, Result};
use camino::Utf8Path;
use clap::ValueEnum;
use gator_config::ClientSettings;
use gator_core::sorting::{SortDirection, SortKey, SortState};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Debug, Copy)]
pub enum CliSortKey {
    Name,
    Channel,
}

impl From<CliSortKey> for SortKey {
    fn from(k: CliSortKey) -> Self {
        match k {
            CliSortKey::Name => SortKey::Name,
            CliSortKey::Channel => SortKey::Channel,
        }
    }
}

pub fn sort_state(key: CliSortKey, descending: bool) -> SortState {
    SortState {
        sort_by: key.into(),
        direction: if descending {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        },
    }
}

/// Explicit settings file, or the platform default location.
pub fn settings_path(path: Option<&Utf8Path>) -> Option<PathBuf> {
    match path {
        Some(p) => Some(p.as_std_path().to_path_buf()),
        None => gator_config::default_settings_path(),
    }
}

/// Settings from `path` (or the platform default location), with `url`
/// overriding the configured server.
pub fn load_settings(path: Option<&Utf8Path>, url: Option<String>) -> Result<ClientSettings> {
    let mut settings = match settings_path(path) {
        Some(p) => ClientSettings::load(&p)
            .with_context(|| format!("Failed to load settings from {}", p.display()))?,
        None => ClientSettings::default(),
    };
    if let Some(url) = url {
        settings.base_url = url;
    }
    Ok(settings)
}

/// Fields to overwrite in the stored settings. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub base_url: Option<String>,
    pub from_history: Option<bool>,
    pub whitelist: Option<bool>,
    pub poll_interval_ms: Option<u64>,
    pub environment_types: Vec<(String, Vec<String>)>,
}

impl SettingsUpdate {
    pub fn apply(self, settings: &mut ClientSettings) {
        if let Some(url) = self.base_url {
            settings.base_url = url;
        }
        if let Some(from_history) = self.from_history {
            settings.from_history = from_history;
        }
        if let Some(whitelist) = self.whitelist {
            settings.whitelist = whitelist;
        }
        if let Some(ms) = self.poll_interval_ms {
            settings.poll_interval_ms = ms;
        }
        for (name, packages) in self.environment_types {
            settings.environment_types.insert(name, packages);
        }
    }
}

/// Parses `NAME=pkg1 pkg2` into an environment type entry.
pub fn parse_environment_type(value: &str) -> Result<(String, Vec<String>), String> {
    let (name, packages) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PACKAGES, got `{value}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("environment type name is empty".to_string());
    }
    let packages: Vec<String> = packages.split_whitespace().map(str::to_string).collect();
    if packages.is_empty() {
        return Err(format!("environment type `{name}` lists no packages"));
    }
    Ok((name.to_string(), packages))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_type_splits_on_whitespace() {
        let (name, packages) = parse_environment_type("julia= julia  ijulia").unwrap();
        assert_eq!(name, "julia");
        assert_eq!(packages, vec!["julia", "ijulia"]);
    }

    #[test]
    fn environment_type_needs_name_and_packages() {
        assert!(parse_environment_type("julia").is_err());
        assert!(parse_environment_type("=julia").is_err());
        assert!(parse_environment_type("julia=  ").is_err());
    }

    #[test]
    fn update_only_touches_given_fields() {
        let mut settings = ClientSettings {
            whitelist: true,
            ..ClientSettings::default()
        };
        SettingsUpdate {
            poll_interval_ms: Some(250),
            environment_types: vec![("julia".into(), vec!["julia".into()])],
            ..SettingsUpdate::default()
        }
        .apply(&mut settings);

        assert!(settings.whitelist);
        assert_eq!(settings.poll_interval_ms, 250);
        assert_eq!(settings.base_url, gator_config::DEFAULT_BASE_URL);
        assert_eq!(settings.environment_types["julia"], vec!["julia"]);
        assert!(settings.environment_types.contains_key("python3"));
    }
}
