use bytes::Bytes;
use reqwest::header::LOCATION;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;

pub mod error;
pub mod task;

pub use error::{TaskError, TransportError};
pub use task::{TaskCanceller, TaskRequest};

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            body: None,
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    /// Raw `Location` header, possibly relative to the request URL.
    pub location: Option<String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            location: None,
            body: body.into(),
        }
    }

    pub fn accepted(location: impl Into<String>) -> Self {
        Self {
            status: StatusCode::ACCEPTED,
            location: Some(location.into()),
            body: Bytes::new(),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TaskError> {
        serde_json::from_slice(&self.body).map_err(|e| TaskError::Decode(e.to_string()))
    }

    pub fn text(&self) -> Result<String, TaskError> {
        String::from_utf8(self.body.to_vec()).map_err(|e| TaskError::Decode(e.to_string()))
    }
}

/// One HTTP exchange. Implementations must not interpret status codes.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// reqwest-backed transport.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(request.method, request.url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());
        let body = resp.bytes().await?;

        Ok(HttpResponse {
            status,
            location,
            body,
        })
    }
}

pub fn default_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("gator/", env!("CARGO_PKG_VERSION")))
        .build()
}
