use reqwest::StatusCode;

/// The request never produced an HTTP response.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    #[error("network error: {0}")]
    Network(#[from] TransportError),
    #[error("server answered {status}: {message}")]
    Response { status: StatusCode, message: String },
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("task worker stopped: {0}")]
    Aborted(String),
    #[error("cancelled")]
    Cancelled,
}

impl TaskError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }

    /// Build a response error, preferring the backend's `{"error": ...}` body.
    pub fn from_status(status: StatusCode, body: &[u8]) -> Self {
        #[derive(serde::Deserialize)]
        struct ErrorBody {
            error: Option<String>,
        }

        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string()
            });

        TaskError::Response { status, message }
    }
}
