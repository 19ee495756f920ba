//! Application error type and the retry-classification scheme that drives §4's broker retries.

/// Application-wide result alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// A classified application error.
///
/// The variant a handler returns decides what the broker does with the task (§4.1, §7): some
/// kinds are worth retrying (the remote collaborator is probably just slow or down), some are
/// permanent (the request will never succeed no matter how many times it's retried), and some are
/// deliberately treated as success so the broker stops redelivering.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("collaborator request failed: {0}")]
    TransientRemote(#[source] reqwest::Error),

    #[error("{0} not ready")]
    NotReady(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InputInvalid(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// How a broker/worker should react to an [`AppError`] returned by a handler (§4.1, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Worth retrying per the back-off schedule: the collaborator is probably transiently down.
    Retryable,
    /// Will never succeed; fail the task immediately without burning retries.
    Permanent,
}

impl AppError {
    /// Classify this error for retry purposes (§4.5's "not ready"/timeout handling and §7's
    /// deterministic-timeout/input-invalid/not-found taxonomy).
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::TransientRemote(_) => ErrorKind::Retryable,
            AppError::NotReady(_) => ErrorKind::Retryable,
            AppError::Store(_) => ErrorKind::Retryable,
            AppError::NotFound(_) => ErrorKind::Permanent,
            AppError::InputInvalid(_) => ErrorKind::Permanent,
            AppError::Other(_) => ErrorKind::Retryable,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Retryable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_permanent() {
        let err = AppError::NotFound("request".to_string());
        assert_eq!(err.kind(), ErrorKind::Permanent);
        assert!(!err.is_retryable());
    }

    #[test]
    fn not_ready_is_retryable() {
        let err = AppError::NotReady("analysis".to_string());
        assert_eq!(err.kind(), ErrorKind::Retryable);
        assert!(err.is_retryable());
    }
}
