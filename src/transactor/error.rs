//! Transaction error types.

use std::error::Error as StdError;

use thiserror::Error;

/// Boxed driver or business error.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Failures raised by the transactor itself.
///
/// Business errors returned by the transactional closure are not wrapped
/// unless cleanup also failed; see [`TransactionError::RollbackAfterError`].
#[derive(Debug, Error)]
pub enum TransactionError {
    /// The driver could not start a session.
    #[error("begin transaction: {0}")]
    Begin(#[source] BoxError),

    /// The driver could not commit the session.
    #[error("commit transaction: {0}")]
    Commit(#[source] BoxError),

    /// The driver could not roll the session back.
    ///
    /// [`Transactor`](super::Transactor) never returns this: a failed rollback
    /// after a closure error becomes [`RollbackAfterError`](Self::RollbackAfterError)
    /// and one during a panic is logged. It is for driver adapters and callers
    /// that terminate a session themselves and report the failure in the same
    /// error type.
    #[error("rollback transaction: {0}")]
    Rollback(#[source] BoxError),

    /// The closure failed and the rollback that followed failed too.
    #[error("{cause} (rollback also failed: {rollback})")]
    RollbackAfterError {
        /// The error returned by the closure.
        #[source]
        cause: BoxError,
        /// The error returned by the rollback.
        rollback: BoxError,
    },
}

impl TransactionError {
    /// Check if a rollback failed, alone or after a business error.
    pub fn is_rollback_failure(&self) -> bool {
        matches!(
            self,
            TransactionError::Rollback(_) | TransactionError::RollbackAfterError { .. }
        )
    }

    /// The driver error behind this failure.
    pub fn driver_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        match self {
            TransactionError::Begin(e)
            | TransactionError::Commit(e)
            | TransactionError::Rollback(e) => e.as_ref(),
            TransactionError::RollbackAfterError { rollback, .. } => rollback.as_ref(),
        }
    }

    /// The rollback failure, if any.
    pub fn rollback_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            TransactionError::Rollback(e) => Some(e.as_ref()),
            TransactionError::RollbackAfterError { rollback, .. } => Some(rollback.as_ref()),
            _ => None,
        }
    }

    /// The business error that triggered a failed rollback, if any.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            TransactionError::RollbackAfterError { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

/// Walk `err` and its sources looking for a `T`.
///
/// This is how callers check that a returned error wraps a particular
/// sentinel, including through [`TransactionError::RollbackAfterError`].
pub fn find_cause<'a, T>(err: &'a (dyn StdError + 'static)) -> Option<&'a T>
where
    T: StdError + 'static,
{
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(found) = e.downcast_ref::<T>() {
            return Some(found);
        }
        current = e.source();
    }
    None
}
