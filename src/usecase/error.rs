//! Use-case layer error types.

use thiserror::Error;

use crate::transactor::{find_cause, BoxError, TransactionError};

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Failure injected by a repository built with `error_expected`.
    #[error("expected error")]
    Expected,

    /// The insert statement failed.
    #[error("insert failed: {0}")]
    Insert(#[source] BoxError),

    /// The scan query failed.
    #[error("scan failed: {0}")]
    Scan(#[source] BoxError),
}

/// Errors returned by use cases.
#[derive(Debug, Error)]
pub enum UseCaseError {
    /// A repository call failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Beginning, committing or rolling back the session failed.
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),
}

impl UseCaseError {
    /// Check if the injected repository failure is anywhere in the cause chain.
    pub fn is_expected(&self) -> bool {
        matches!(
            find_cause::<RepositoryError>(self),
            Some(RepositoryError::Expected)
        )
    }
}

/// Result type alias for use-case operations.
pub type UseCaseResult<T> = Result<T, UseCaseError>;
