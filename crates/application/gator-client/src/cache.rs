use gator_core::RawPackage;
use std::sync::{Arc, OnceLock, RwLock};

/// Available-package catalog as served by `GET /packages`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvailableCatalog {
    pub packages: Vec<RawPackage>,
    pub with_description: bool,
}

static SHARED: OnceLock<Arc<AvailablePackageCache>> = OnceLock::new();

/// Holds the last fetched catalog. Readers get either the previous or the
/// new catalog as a whole; it is swapped in with a single assignment.
#[derive(Debug, Default)]
pub struct AvailablePackageCache {
    slot: RwLock<Option<Arc<AvailableCatalog>>>,
}

impl AvailablePackageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide instance, for callers that want every client to share
    /// one catalog.
    pub fn shared() -> Arc<Self> {
        SHARED.get_or_init(|| Arc::new(Self::new())).clone()
    }

    pub fn get(&self) -> Option<Arc<AvailableCatalog>> {
        self.slot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn replace(&self, catalog: AvailableCatalog) -> Arc<AvailableCatalog> {
        let catalog = Arc::new(catalog);
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = Some(catalog.clone());
        catalog
    }

    pub fn invalidate(&self) {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn has_description(&self) -> bool {
        self.get().is_some_and(|c| c.with_description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(names: &[&str], with_description: bool) -> AvailableCatalog {
        AvailableCatalog {
            packages: names
                .iter()
                .map(|n| RawPackage {
                    name: n.to_string(),
                    version: "1.0".into(),
                    ..Default::default()
                })
                .collect(),
            with_description,
        }
    }

    #[test]
    fn starts_empty() {
        let cache = AvailablePackageCache::new();
        assert!(cache.get().is_none());
        assert!(!cache.has_description());
    }

    #[test]
    fn readers_keep_the_snapshot_they_took() {
        let cache = AvailablePackageCache::new();
        cache.replace(catalog(&["a"], false));
        let before = cache.get().unwrap();

        cache.replace(catalog(&["a", "b"], true));

        assert_eq!(before.packages.len(), 1);
        assert_eq!(cache.get().unwrap().packages.len(), 2);
        assert!(cache.has_description());
    }

    #[test]
    fn invalidate_clears_the_slot() {
        let cache = AvailablePackageCache::new();
        cache.replace(catalog(&["a"], true));
        cache.invalidate();
        assert!(cache.get().is_none());
    }

    #[test]
    fn shared_instance_is_a_singleton() {
        assert!(Arc::ptr_eq(
            &AvailablePackageCache::shared(),
            &AvailablePackageCache::shared()
        ));
    }
}
