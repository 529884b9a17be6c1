use crate::channel::simplify_channel;
use crate::{Package, RawPackage, VersionSelection};
use std::cmp::Ordering;

enum Step {
    InstalledOnly,
    AvailableOnly,
    Matched,
}

/// Merge installed packages with the available catalog.
///
/// Both inputs must be sorted by name. Consecutive available entries sharing
/// a name are folded into one [`Package`] whose version/build arrays keep the
/// input order. Every name from either side appears exactly once in the
/// output, which stays sorted by name.
pub fn merge(installed: &[RawPackage], available: &[RawPackage]) -> Vec<Package> {
    let mut merged = Vec::with_capacity(installed.len().max(available.len()));
    let mut installed = installed.iter().peekable();
    let mut groups = available
        .chunk_by(|a, b| a.name == b.name)
        .peekable();

    loop {
        let step = match (installed.peek(), groups.peek()) {
            (None, None) => break,
            (Some(_), None) => Step::InstalledOnly,
            (None, Some(_)) => Step::AvailableOnly,
            (Some(local), Some(group)) => match local.name.as_str().cmp(group_name(group)) {
                Ordering::Less => Step::InstalledOnly,
                Ordering::Equal => Step::Matched,
                Ordering::Greater => Step::AvailableOnly,
            },
        };

        let package = match step {
            Step::InstalledOnly => installed
                .next()
                .map(|local| fold(std::slice::from_ref(local)).mark_installed(local)),
            Step::AvailableOnly => groups.next().map(fold),
            Step::Matched => match (installed.next(), groups.next()) {
                (Some(local), Some(group)) => Some(fold(group).mark_installed(local)),
                _ => None,
            },
        };
        merged.extend(package);
    }

    merged
}

fn group_name(group: &[RawPackage]) -> &str {
    group.first().map_or("", |p| p.name.as_str())
}

/// Fold version variants of one package into a single row.
fn fold(group: &[RawPackage]) -> Package {
    let head = &group[0];
    let mut package = Package {
        name: head.name.clone(),
        version: Vec::with_capacity(group.len()),
        build_number: Vec::with_capacity(group.len()),
        build_string: Vec::with_capacity(group.len()),
        channel: simplify_channel(&head.channel),
        platform: head.platform.clone(),
        summary: String::new(),
        home: String::new(),
        keywords: String::new(),
        tags: String::new(),
        version_installed: None,
        version_selected: VersionSelection::None,
        updatable: false,
    };

    for variant in group {
        package.version.push(variant.version.clone());
        package.build_number.push(variant.build_number);
        package.build_string.push(variant.build_string.clone());

        // Descriptions are per package; keep the first one served.
        if package.summary.is_empty() {
            if let Some(summary) = &variant.summary {
                package.summary = summary.clone();
            }
        }
        if package.home.is_empty() {
            if let Some(home) = &variant.home {
                package.home = home.clone();
            }
        }
        if package.keywords.is_empty() {
            if let Some(keywords) = &variant.keywords {
                package.keywords = keywords.normalized();
            }
        }
        if package.tags.is_empty() {
            if let Some(tags) = &variant.tags {
                package.tags = tags.normalized();
            }
        }
    }

    package
}

impl Package {
    fn mark_installed(mut self, local: &RawPackage) -> Self {
        if !self.version.contains(&local.version) {
            self.version.push(local.version.clone());
            self.build_number.push(local.build_number);
            self.build_string.push(local.build_string.clone());
        }
        self.version_installed = Some(local.version.clone());
        self.version_selected = VersionSelection::Pinned(local.version.clone());
        self
    }
}
