use gator_infra::TaskError;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The operation was superseded or cancelled; not a failure.
    #[error("cancelled")]
    Cancelled,
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: TaskError,
    },
    #[error("invalid server url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ClientError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }

    /// Log a task failure and replace it with a caller-facing message.
    /// Cancellation passes through untouched.
    pub(crate) fn translate(err: TaskError, message: impl Into<String>) -> Self {
        match err {
            TaskError::Cancelled => ClientError::Cancelled,
            source => {
                error!("{source}");
                ClientError::Failed {
                    message: message.into(),
                    source,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_never_reported_as_failure() {
        let err = ClientError::translate(TaskError::Cancelled, "An error occurred.");
        assert!(err.is_cancelled());
    }

    #[test]
    fn failures_carry_the_user_message_and_source() {
        let err = ClientError::translate(
            TaskError::Decode("expected value".into()),
            "An error occurred while listing Conda environments.",
        );
        assert_eq!(
            err.to_string(),
            "An error occurred while listing Conda environments."
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
