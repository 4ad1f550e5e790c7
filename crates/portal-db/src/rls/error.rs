use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid database role name: {0:?}")]
    InvalidRole(String),
}

/// Failure of one scoped call. Every variant after `InvalidIdentity` implies
/// the transaction was rolled back (or never opened).
#[derive(Debug, Error)]
pub enum RlsError<E> {
    /// The user identifier is not a canonical UUID. No connection was taken.
    #[error("invalid identity")]
    InvalidIdentity,
    /// The pool could not hand out a transaction. No caller code ran.
    #[error("transaction acquisition failed: {0}")]
    TransactionAcquisitionFailed(#[source] sqlx_core::Error),
    #[error("setting session context failed: {0}")]
    ContextFailed(#[source] sqlx_core::Error),
    #[error("commit failed: {0}")]
    CommitFailed(#[source] sqlx_core::Error),
    #[error("operation timed out")]
    TimedOut,
    /// The caller's own error, unchanged.
    #[error("operation failed: {0}")]
    OperationFailed(#[source] E),
}

impl<E> RlsError<E> {
    /// Errors an outer layer should report as a generic authorization
    /// failure rather than exposing validation details.
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, Self::InvalidIdentity)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionAcquisitionFailed(_))
    }

    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::OperationFailed(err) => Some(err),
            _ => None,
        }
    }

    pub fn map_operation<F, O>(self, f: F) -> RlsError<O>
    where
        F: FnOnce(E) -> O,
    {
        match self {
            Self::InvalidIdentity => RlsError::InvalidIdentity,
            Self::TransactionAcquisitionFailed(err) => RlsError::TransactionAcquisitionFailed(err),
            Self::ContextFailed(err) => RlsError::ContextFailed(err),
            Self::CommitFailed(err) => RlsError::CommitFailed(err),
            Self::TimedOut => RlsError::TimedOut,
            Self::OperationFailed(err) => RlsError::OperationFailed(f(err)),
        }
    }
}
