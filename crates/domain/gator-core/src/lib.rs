use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod channel;
pub mod reconcile;
pub mod sorting;

/// Dependency graph answer: package name -> names it depends on.
pub type PackageDependencies = BTreeMap<String, Vec<String>>;

/// Channel name -> channel URLs, as configured for an environment.
pub type Channels = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Environment {
    pub name: String,
    #[serde(rename = "dir")]
    pub directory_path: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Keywords or tags as served by the backend: either a bare string or a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum LabelList {
    One(String),
    Many(Vec<String>),
}

impl LabelList {
    /// Lowercase, comma-joined rendering used for display and search.
    pub fn normalized(&self) -> String {
        match self {
            LabelList::One(s) => s.to_lowercase(),
            LabelList::Many(items) => items.join(",").to_lowercase(),
        }
    }
}

/// Backend wire shape: one entry per installed package, or one entry per
/// available package *version* (adjacent, sorted by name).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawPackage {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub build_number: i64,
    #[serde(default)]
    pub build_string: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<LabelList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<LabelList>,
}

/// Pending user intent for a package row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VersionSelection {
    /// Not selected, or marked for removal when installed.
    None,
    /// Install or update to whatever the solver picks.
    Any,
    Pinned(String),
}

impl VersionSelection {
    pub fn as_str(&self) -> &str {
        match self {
            VersionSelection::None => "none",
            VersionSelection::Any => "",
            VersionSelection::Pinned(v) => v,
        }
    }
}

impl From<String> for VersionSelection {
    fn from(value: String) -> Self {
        match value.as_str() {
            "none" => VersionSelection::None,
            "" => VersionSelection::Any,
            _ => VersionSelection::Pinned(value),
        }
    }
}

impl From<VersionSelection> for String {
    fn from(value: VersionSelection) -> Self {
        value.as_str().to_string()
    }
}

/// Display-ready package row produced by [`reconcile::merge`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Package {
    pub name: String,
    pub version: Vec<String>,
    pub build_number: Vec<i64>,
    pub build_string: Vec<String>,
    pub channel: String,
    pub platform: String,
    pub summary: String,
    pub home: String,
    pub keywords: String,
    pub tags: String,
    pub version_installed: Option<String>,
    pub version_selected: VersionSelection,
    pub updatable: bool,
}

impl Package {
    pub fn is_installed(&self) -> bool {
        self.version_installed.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentChangeKind {
    Clone,
    Create,
    Import,
    Remove,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangeSource {
    /// Package specs an environment was created with.
    Packages(Vec<String>),
    /// Cloned environment name, or imported/updated file content.
    Text(String),
}

/// Emitted once the backend confirmed an environment mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentChange {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EnvironmentChangeKind,
    pub source: Option<ChangeSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageChangeKind {
    Develop,
    Install,
    Update,
    Remove,
}

/// Emitted once the backend confirmed a package mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageChange {
    pub environment: String,
    #[serde(rename = "type")]
    pub kind: PackageChangeKind,
    pub packages: Vec<String>,
}
