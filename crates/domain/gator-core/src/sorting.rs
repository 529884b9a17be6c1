use crate::Package;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Channel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub sort_by: SortKey,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            sort_by: SortKey::Name,
            direction: SortDirection::Asc,
        }
    }
}

/// Returns a sorted copy. Keys compare case-insensitively; ties on the
/// channel column fall back to ascending name order.
pub fn sort_packages(packages: &[Package], state: SortState) -> Vec<Package> {
    let mut items = packages.to_vec();
    items.sort_by(|a, b| {
        let primary = match state.sort_by {
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::Channel => a.channel.to_lowercase().cmp(&b.channel.to_lowercase()),
        };
        let primary = match state.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        match primary {
            Ordering::Equal => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            other => other,
        }
    });
    items
}
