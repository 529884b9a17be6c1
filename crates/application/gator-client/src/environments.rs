use crate::api::{ChannelsResponse, CondaApi, EnvironmentsResponse};
use crate::cache::AvailablePackageCache;
use crate::error::ClientError;
use crate::packages::PackageClient;
use gator_config::ClientSettings;
use gator_core::{ChangeSource, Channels, Environment, EnvironmentChange, EnvironmentChangeKind};
use gator_infra::{default_http_client, ReqwestTransport};
use reqwest::{Method, Url};
use serde_json::{json, Value};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Environment-level operations against the backend.
pub struct EnvironmentClient {
    api: Arc<CondaApi>,
    settings: RwLock<ClientSettings>,
    environments: RwLock<Vec<Environment>>,
    changes: broadcast::Sender<EnvironmentChange>,
    packages: Arc<PackageClient>,
}

impl EnvironmentClient {
    pub fn new(
        api: Arc<CondaApi>,
        settings: ClientSettings,
        cache: Arc<AvailablePackageCache>,
    ) -> Self {
        let (changes, _) = broadcast::channel(EVENT_CAPACITY);
        let packages = Arc::new(PackageClient::new(api.clone(), cache, None));
        Self {
            api,
            settings: RwLock::new(settings),
            environments: RwLock::new(Vec::new()),
            changes,
            packages,
        }
    }

    /// Client over HTTP using `settings.base_url` and the process-wide
    /// available-package cache.
    pub fn from_settings(settings: ClientSettings) -> Result<Self, ClientError> {
        let client = default_http_client().map_err(|e| ClientError::InvalidUrl {
            url: settings.base_url.clone(),
            reason: e.to_string(),
        })?;
        let api = CondaApi::new(
            Arc::new(ReqwestTransport::new(client)),
            &settings.base_url,
            settings.poll_interval(),
        )?;
        Ok(Self::new(
            Arc::new(api),
            settings,
            AvailablePackageCache::shared(),
        ))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EnvironmentChange> {
        self.changes.subscribe()
    }

    pub fn settings(&self) -> ClientSettings {
        self.settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_settings(&self, settings: ClientSettings) {
        *self.settings.write().unwrap_or_else(|e| e.into_inner()) = settings;
    }

    /// Names of the configured environment types.
    pub fn environment_types(&self) -> Vec<String> {
        self.settings().environment_types.into_keys().collect()
    }

    /// Package specs for an environment type; unknown types are read as a
    /// space-separated package list.
    pub fn environment_from_type(&self, kind: &str) -> Vec<String> {
        match self.settings().environment_types.get(kind) {
            Some(packages) => packages.clone(),
            None => kind.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// The shared package client, retargeted at `name` when given.
    pub fn package_manager(&self, name: Option<&str>) -> Arc<PackageClient> {
        self.packages.set_environment(name.map(str::to_string));
        self.packages.clone()
    }

    /// Environments from the last successful refresh.
    pub fn cached_environments(&self) -> Vec<Environment> {
        self.environments
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Always hits the backend.
    pub async fn environments(&self) -> Result<Vec<Environment>, ClientError> {
        self.refresh().await
    }

    pub async fn refresh(&self) -> Result<Vec<Environment>, ClientError> {
        const FAILURE: &str = "An error occurred while listing Conda environments.";

        let whitelist = if self.settings().whitelist { "1" } else { "0" };
        let url = self
            .api
            .endpoint(&["environments"], &[("whitelist", whitelist)]);
        let data: EnvironmentsResponse = self
            .api
            .request(Method::GET, url, None)
            .result()
            .await
            .and_then(|response| response.json())
            .map_err(|e| ClientError::translate(e, FAILURE))?;

        *self.environments.write().unwrap_or_else(|e| e.into_inner()) =
            data.environments.clone();
        Ok(data.environments)
    }

    pub async fn channels(&self, name: &str) -> Result<Channels, ClientError> {
        let url = self.api.endpoint(&["channels"], &[]);
        let data: ChannelsResponse = self
            .api
            .request(Method::GET, url, None)
            .result()
            .await
            .and_then(|response| response.json())
            .map_err(|e| {
                ClientError::translate(e, format!("Fail to get the channels for environment {name}."))
            })?;
        Ok(data.channels)
    }

    pub async fn clone_environment(&self, target: &str, name: &str) -> Result<(), ClientError> {
        if target.is_empty() || name.is_empty() {
            return Ok(());
        }
        let url = self.api.endpoint(&["environments"], &[]);
        self.mutate(
            Method::POST,
            url,
            json!({ "name": name, "twin": target }),
            EnvironmentChange {
                name: name.to_string(),
                kind: EnvironmentChangeKind::Clone,
                source: Some(ChangeSource::Text(target.to_string())),
            },
            format!("An error occurred while cloning environment \"{target}\"."),
        )
        .await
    }

    pub async fn create(&self, name: &str, kind: Option<&str>) -> Result<(), ClientError> {
        if name.is_empty() {
            return Ok(());
        }
        let packages = self.environment_from_type(kind.unwrap_or_default());
        let url = self.api.endpoint(&["environments"], &[]);
        self.mutate(
            Method::POST,
            url,
            json!({ "name": name, "packages": packages }),
            EnvironmentChange {
                name: name.to_string(),
                kind: EnvironmentChangeKind::Create,
                source: Some(ChangeSource::Packages(packages)),
            },
            format!("An error occurred while creating environment \"{name}\"."),
        )
        .await
    }

    pub async fn import(
        &self,
        name: &str,
        content: &str,
        filename: Option<&str>,
    ) -> Result<(), ClientError> {
        if name.is_empty() {
            return Ok(());
        }
        let mut body = json!({ "name": name, "file": content });
        if let Some(filename) = filename.filter(|f| !f.is_empty()) {
            body["filename"] = Value::from(filename);
        }
        let url = self.api.endpoint(&["environments"], &[]);
        self.mutate(
            Method::POST,
            url,
            body,
            EnvironmentChange {
                name: name.to_string(),
                kind: EnvironmentChangeKind::Import,
                source: Some(ChangeSource::Text(content.to_string())),
            },
            format!("An error occurred while importing \"{name}\"."),
        )
        .await
    }

    pub async fn update(
        &self,
        name: &str,
        content: &str,
        filename: Option<&str>,
    ) -> Result<(), ClientError> {
        if name.is_empty() {
            return Ok(());
        }
        let mut body = json!({ "file": content });
        if let Some(filename) = filename.filter(|f| !f.is_empty()) {
            body["filename"] = Value::from(filename);
        }
        let url = self.api.endpoint(&["environments", name], &[]);
        self.mutate(
            Method::PATCH,
            url,
            body,
            EnvironmentChange {
                name: name.to_string(),
                kind: EnvironmentChangeKind::Update,
                source: Some(ChangeSource::Text(content.to_string())),
            },
            format!("An error occurred while updating \"{name}\"."),
        )
        .await
    }

    /// Environment specification as text. `from_history` defaults to the
    /// configured setting.
    pub async fn export(&self, name: &str, from_history: Option<bool>) -> Result<String, ClientError> {
        let from_history = from_history.unwrap_or_else(|| self.settings().from_history);
        let history = if from_history { "1" } else { "0" };
        let url = self
            .api
            .endpoint(&["environments", name], &[("download", "1"), ("history", history)]);
        self.api
            .request(Method::GET, url, None)
            .result()
            .await
            .and_then(|response| response.text())
            .map_err(|e| {
                ClientError::translate(
                    e,
                    format!("An error occurred while exporting environment \"{name}\"."),
                )
            })
    }

    pub async fn remove(&self, name: &str) -> Result<(), ClientError> {
        if name.is_empty() {
            return Ok(());
        }
        let url = self.api.endpoint(&["environments", name], &[]);
        let failure = format!("An error occurred while removing \"{name}\".");
        self.api
            .request(Method::DELETE, url, None)
            .result()
            .await
            .map_err(|e| ClientError::translate(e, failure))?;
        self.emit(EnvironmentChange {
            name: name.to_string(),
            kind: EnvironmentChangeKind::Remove,
            source: None,
        });
        Ok(())
    }

    async fn mutate(
        &self,
        method: Method,
        url: Url,
        body: Value,
        change: EnvironmentChange,
        failure: String,
    ) -> Result<(), ClientError> {
        self.api
            .request(method, url, Some(body))
            .result()
            .await
            .map_err(|e| ClientError::translate(e, failure))?;
        self.emit(change);
        Ok(())
    }

    fn emit(&self, change: EnvironmentChange) {
        // No subscriber is not an error.
        let _ = self.changes.send(change);
    }
}
