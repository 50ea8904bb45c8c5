//! Context error types.

use thiserror::Error;

/// Result type for context checks.
pub type ContextResult<T> = Result<T, ContextError>;

/// Why a context is no longer live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The context, or one of its ancestors, was canceled.
    #[error("context canceled")]
    Canceled,

    /// A deadline attached to the context, or one of its ancestors, has passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}
