use crate::api::{CatalogResponse, CondaApi, InstalledResponse, UpdatesResponse};
use crate::cache::{AvailableCatalog, AvailablePackageCache};
use crate::error::ClientError;
use crate::registry::{CancellableRegistry, TaskKind};
use camino::Utf8Path;
use gator_core::reconcile::merge;
use gator_core::{Package, PackageChange, PackageChangeKind, PackageDependencies};
use gator_infra::{HttpResponse, TaskError, TaskRequest};
use reqwest::Method;
use serde_json::json;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// How a task joins the cancellation registry while it is awaited.
#[derive(Debug, Clone, Copy)]
enum Tracking {
    Untracked,
    /// Tracked alongside whatever else runs in the group.
    Join(TaskKind),
    /// Cancels the group first, atomically with the registration.
    Supersede(TaskKind),
}

/// Package-level operations on one target environment.
///
/// Refreshes and update checks share the `Default` cancellation group: each
/// new one cancels whatever the previous one left in flight, so a slow stale
/// listing can never overwrite a fresher one. Dependency lookups live in
/// their own group.
pub struct PackageClient {
    api: Arc<CondaApi>,
    environment: RwLock<Option<String>>,
    registry: CancellableRegistry,
    cache: Arc<AvailablePackageCache>,
    changes: broadcast::Sender<PackageChange>,
}

impl PackageClient {
    pub fn new(
        api: Arc<CondaApi>,
        cache: Arc<AvailablePackageCache>,
        environment: Option<String>,
    ) -> Self {
        let (changes, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            api,
            environment: RwLock::new(environment),
            registry: CancellableRegistry::new(),
            cache,
            changes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PackageChange> {
        self.changes.subscribe()
    }

    pub fn environment(&self) -> Option<String> {
        self.environment
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_environment(&self, environment: Option<String>) {
        *self.environment.write().unwrap_or_else(|e| e.into_inner()) = environment;
    }

    /// Whether the cached catalog carries package descriptions.
    pub fn has_description(&self) -> bool {
        self.cache.has_description()
    }

    /// Cancel every tracked task of `kind`.
    pub fn cancel_tasks(&self, kind: TaskKind) {
        self.registry.cancel_all(kind);
    }

    /// Cancel every tracked task of `kind` and wait until each one has
    /// stopped talking to the backend, `DELETE` cleanup included.
    pub async fn cancel_tasks_and_wait(&self, kind: TaskKind) {
        for canceller in self.registry.cancel_all(kind) {
            canceller.settled().await;
        }
    }

    fn resolve(&self, environment: Option<&str>) -> Option<String> {
        match environment {
            Some(name) if !name.is_empty() => Some(name.to_string()),
            _ => self.environment().filter(|name| !name.is_empty()),
        }
    }

    /// Await a task, registered in the registry according to `tracking`.
    async fn tracked(
        &self,
        task: TaskRequest,
        tracking: Tracking,
    ) -> Result<HttpResponse, TaskError> {
        let key = match tracking {
            Tracking::Untracked => None,
            Tracking::Join(kind) => Some(self.registry.push(kind, task.canceller())),
            Tracking::Supersede(kind) => Some(self.registry.supersede(kind, task.canceller())),
        };
        let result = task.result().await;
        if let Some(key) = key {
            self.registry.remove(key);
        }
        result
    }

    /// Installed packages of the environment, merged with the available
    /// catalog when `include_available` is set.
    pub async fn refresh(
        &self,
        include_available: bool,
        environment: Option<&str>,
    ) -> Result<Vec<Package>, ClientError> {
        const FAILURE: &str = "An error occurred while retrieving available packages.";

        let Some(environment) = self.resolve(environment) else {
            return Ok(Vec::new());
        };

        let url = self.api.endpoint(&["environments", &environment], &[]);
        let task = self.api.request(Method::GET, url, None);
        let installed: InstalledResponse = self
            .tracked(task, Tracking::Supersede(TaskKind::Default))
            .await
            .and_then(|response| response.json())
            .map_err(|e| ClientError::translate(e, FAILURE))?;

        let catalog = if include_available {
            self.available_packages(false, true)
                .await
                .map_err(|e| ClientError::translate(e, FAILURE))?
        } else {
            Arc::new(AvailableCatalog::default())
        };

        Ok(merge(&installed.packages, &catalog.packages))
    }

    /// Refetch the available catalog into the cache.
    ///
    /// Does not cancel other work. With `cancellable`, the fetch joins the
    /// `Default` group so the next refresh supersedes it.
    pub async fn refresh_available_packages(
        &self,
        force: bool,
        cancellable: bool,
    ) -> Result<(), ClientError> {
        self.available_packages(force, cancellable)
            .await
            .map(|_| ())
            .map_err(|e| {
                ClientError::translate(e, "An error occurred while retrieving available packages.")
            })
    }

    async fn available_packages(
        &self,
        force: bool,
        cancellable: bool,
    ) -> Result<Arc<AvailableCatalog>, TaskError> {
        if !force {
            if let Some(catalog) = self.cache.get() {
                return Ok(catalog);
            }
        }

        let url = self.api.endpoint(&["packages"], &[]);
        let task = self.api.request(Method::GET, url, None);
        let tracking = if cancellable {
            Tracking::Join(TaskKind::Default)
        } else {
            Tracking::Untracked
        };
        let data: CatalogResponse = self
            .tracked(task, tracking)
            .await?
            .json()?;

        Ok(self.cache.replace(AvailableCatalog {
            packages: data.packages,
            with_description: data.with_description,
        }))
    }

    /// Names of installed packages with a newer version available.
    pub async fn check_updates(&self, environment: Option<&str>) -> Result<Vec<String>, ClientError> {
        let Some(environment) = self.resolve(environment) else {
            return Ok(Vec::new());
        };

        let url = self
            .api
            .endpoint(&["environments", &environment], &[("status", "has_update")]);
        let task = self.api.request(Method::GET, url, None);
        let data: UpdatesResponse = self
            .tracked(task, Tracking::Supersede(TaskKind::Default))
            .await
            .and_then(|response| response.json())
            .map_err(|e| {
                ClientError::translate(e, "An error occurred while checking for package updates.")
            })?;

        Ok(data.updates.into_iter().map(|pkg| pkg.name).collect())
    }

    pub async fn install(
        &self,
        packages: &[String],
        environment: Option<&str>,
    ) -> Result<(), ClientError> {
        self.mutate(
            Method::POST,
            PackageChangeKind::Install,
            packages,
            environment,
            "An error occurred while installing packages.",
        )
        .await
    }

    pub async fn update(
        &self,
        packages: &[String],
        environment: Option<&str>,
    ) -> Result<(), ClientError> {
        self.mutate(
            Method::PATCH,
            PackageChangeKind::Update,
            packages,
            environment,
            "An error occurred while updating packages.",
        )
        .await
    }

    pub async fn remove(
        &self,
        packages: &[String],
        environment: Option<&str>,
    ) -> Result<(), ClientError> {
        self.mutate(
            Method::DELETE,
            PackageChangeKind::Remove,
            packages,
            environment,
            "An error occurred while removing packages.",
        )
        .await
    }

    /// Install the package at `path` in development mode.
    pub async fn develop(&self, path: &Utf8Path, environment: Option<&str>) -> Result<(), ClientError> {
        if path.as_str().is_empty() {
            return Ok(());
        }
        let Some(environment) = self.resolve(environment) else {
            return Ok(());
        };

        let packages = vec![path.to_string()];
        let url = self
            .api
            .endpoint(&["environments", &environment, "packages"], &[("develop", "1")]);
        self.api
            .request(Method::POST, url, Some(json!({ "packages": packages })))
            .result()
            .await
            .map_err(|e| {
                ClientError::translate(
                    e,
                    format!("An error occurred while installing in development mode package in {path}."),
                )
            })?;

        self.emit(PackageChange {
            environment,
            kind: PackageChangeKind::Develop,
            packages,
        });
        Ok(())
    }

    /// Dependency graph of `pkg`. Lookups cancel each other but never touch
    /// refreshes.
    pub async fn dependencies(
        &self,
        pkg: &str,
        cancellable: bool,
    ) -> Result<PackageDependencies, ClientError> {
        let url = self
            .api
            .endpoint(&["packages"], &[("dependencies", "1"), ("query", pkg)]);
        let task = self.api.request(Method::GET, url, None);
        let tracking = if cancellable {
            Tracking::Supersede(TaskKind::Dependencies)
        } else {
            self.registry.cancel_all(TaskKind::Dependencies);
            Tracking::Untracked
        };
        self.tracked(task, tracking)
            .await
            .and_then(|response| response.json())
            .map_err(|e| {
                ClientError::translate(
                    e,
                    format!("An error occurred while retrieving dependencies of {pkg}."),
                )
            })
    }

    async fn mutate(
        &self,
        method: Method,
        kind: PackageChangeKind,
        packages: &[String],
        environment: Option<&str>,
        failure: &str,
    ) -> Result<(), ClientError> {
        if packages.is_empty() {
            return Ok(());
        }
        let Some(environment) = self.resolve(environment) else {
            return Ok(());
        };

        let url = self
            .api
            .endpoint(&["environments", &environment, "packages"], &[]);
        self.api
            .request(method, url, Some(json!({ "packages": packages })))
            .result()
            .await
            .map_err(|e| ClientError::translate(e, failure))?;

        self.emit(PackageChange {
            environment,
            kind,
            packages: packages.to_vec(),
        });
        Ok(())
    }

    fn emit(&self, change: PackageChange) {
        let _ = self.changes.send(change);
    }
}
