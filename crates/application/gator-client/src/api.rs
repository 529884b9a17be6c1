use crate::error::ClientError;
use gator_core::{Channels, Environment, RawPackage};
use gator_infra::{HttpRequest, TaskRequest, Transport};
use reqwest::{Method, Url};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub(crate) struct EnvironmentsResponse {
    pub environments: Vec<Environment>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InstalledResponse {
    pub packages: Vec<RawPackage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdatesResponse {
    pub updates: Vec<RawPackage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CatalogResponse {
    pub packages: Vec<RawPackage>,
    #[serde(default)]
    pub with_description: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelsResponse {
    pub channels: Channels,
}

/// Builds backend URLs under `<base>/conda/` and starts task requests.
pub struct CondaApi {
    transport: Arc<dyn Transport>,
    base: Url,
    poll_interval: Duration,
}

impl CondaApi {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: &str,
        poll_interval: Duration,
    ) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };

        let mut base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("not a hierarchical url".into()));
        }
        // Treat the input as a directory so the namespace is appended, not substituted.
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        Ok(Self {
            transport,
            base,
            poll_interval,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// `<base>/conda/<segments...>?<query>`; segments are percent-encoded.
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .push(gator_config::API_NAMESPACE)
                .extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    pub fn request(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> TaskRequest {
        let mut request = HttpRequest::new(method, url);
        request.body = body;
        TaskRequest::spawn(self.transport.clone(), request, self.poll_interval)
    }
}
