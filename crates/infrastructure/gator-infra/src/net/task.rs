use super::{HttpRequest, HttpResponse, TaskError, Transport};
use reqwest::{Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

/// Cloneable cancel switch for one [`TaskRequest`]. Cancelling twice, or
/// after the task settled, has no further effect.
#[derive(Debug, Clone, Default)]
pub struct TaskCanceller {
    token: CancellationToken,
    settled: CancellationToken,
}

impl TaskCanceller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the background exchange has stopped, including the
    /// `DELETE` sent for a cancelled task. Never resolves for a canceller
    /// that was not handed out by [`TaskRequest`].
    pub async fn settled(&self) {
        self.settled.cancelled().await;
    }
}

/// A backend call whose long-running variant answers `202 Accepted` with a
/// `Location` to poll.
///
/// The exchange runs on its own tokio task: the initial request is sent, and
/// while the backend keeps answering 202 the loop sleeps one poll interval
/// and re-issues `GET` against the task location. There is no deadline and no
/// retry ceiling. Once cancelled, the next poll tick sends `DELETE` to the
/// task location instead. [`TaskRequest::result`] resolves to
/// [`TaskError::Cancelled`] right away; callers that must not outlive the
/// cleanup await [`TaskCanceller::settled`].
pub struct TaskRequest {
    canceller: TaskCanceller,
    handle: JoinHandle<Result<HttpResponse, TaskError>>,
}

impl TaskRequest {
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        transport: Arc<dyn Transport>,
        request: HttpRequest,
        poll_interval: Duration,
    ) -> Self {
        let canceller = TaskCanceller::new();
        let handle = tokio::spawn(drive(
            transport,
            request,
            poll_interval,
            canceller.token.clone(),
            canceller.settled.clone().drop_guard(),
        ));
        Self { canceller, handle }
    }

    pub fn canceller(&self) -> TaskCanceller {
        self.canceller.clone()
    }

    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    /// Final response of the task. A response that already settled wins over
    /// a later cancellation.
    pub async fn result(self) -> Result<HttpResponse, TaskError> {
        let Self {
            canceller,
            mut handle,
        } = self;

        tokio::select! {
            biased;
            joined = &mut handle => {
                joined.unwrap_or_else(|e| Err(TaskError::Aborted(e.to_string())))
            }
            _ = canceller.token.cancelled() => Err(TaskError::Cancelled),
        }
    }
}

async fn drive(
    transport: Arc<dyn Transport>,
    mut request: HttpRequest,
    poll_interval: Duration,
    token: CancellationToken,
    _settled: DropGuard,
) -> Result<HttpResponse, TaskError> {
    loop {
        let response = transport.execute(request.clone()).await?;

        if !response.status.is_success() {
            return Err(TaskError::from_status(response.status, &response.body));
        }
        if response.status != StatusCode::ACCEPTED {
            return Ok(response);
        }

        let location = response
            .location
            .as_deref()
            .and_then(|l| request.url.join(l).ok())
            .unwrap_or_else(|| request.url.clone());

        tokio::time::sleep(poll_interval).await;

        if token.is_cancelled() {
            debug!("Request cancelled {location}");
            let cleanup = HttpRequest::new(Method::DELETE, location.clone());
            if let Err(e) = transport.execute(cleanup).await {
                warn!("Failed to delete cancelled task {location}: {e}");
            }
            return Err(TaskError::Cancelled);
        }

        debug!("Polling accepted task {location}");
        request = HttpRequest::new(Method::GET, location);
    }
}
