//! Driver error types.
//!
//! Every failure the in-memory driver can report is defined here. The
//! transactor boxes these when it wraps begin, commit or rollback failures,
//! so callers can downcast back to [`MemDbError`].

use thiserror::Error;

use crate::context::ContextError;

/// The main error type for driver operations.
#[derive(Debug, Error)]
pub enum MemDbError {
    /// the context was canceled or its deadline passed
    #[error("context error: {0}")]
    Context(#[from] ContextError),

    /// the statement is not valid SQL
    #[error("syntax error: {0}")]
    Syntax(String),

    /// valid SQL this driver does not run
    #[error("unsupported statement: {0}")]
    Unsupported(String),

    /// `query` was called with a statement that produces no rows
    #[error("statement returns no rows: {0}")]
    NotAQuery(String),

    /// the requested table was not found
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// the table already exists
    #[error("table already exists: {0}")]
    TableAlreadyExists(String),

    /// the column does not exist in the table
    #[error("column not found: table={table}, column={column}")]
    ColumnNotFound { table: String, column: String },

    /// an inserted row has the wrong number of values
    #[error("column count mismatch: expected {expected}, found {found}")]
    ColumnCount { expected: usize, found: usize },

    /// a placeholder has no matching parameter
    #[error("missing parameter {0}")]
    MissingParameter(String),

    /// the session was already committed or rolled back
    #[error("session {session_id} is no longer active (state: {state})")]
    SessionClosed { session_id: String, state: String },

    /// a write was attempted in a read-only session or database
    #[error("read-only transaction cannot execute: {0}")]
    ReadOnly(String),

    /// opening another session would exceed the configured limit
    #[error("too many open sessions (limit {0})")]
    TooManySessions(usize),

    /// the session's writes no longer apply to the committed state
    #[error("commit conflict in session {session_id}: {reason}")]
    Conflict { session_id: String, reason: String },

    /// configuration could not be parsed
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// configuration parsed but is not usable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<sqlparser::parser::ParserError> for MemDbError {
    fn from(e: sqlparser::parser::ParserError) -> Self {
        MemDbError::Syntax(e.to_string())
    }
}

impl MemDbError {
    /// check if this error indicates the resource doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            MemDbError::TableNotFound(_) | MemDbError::ColumnNotFound { .. }
        )
    }

    /// check if this error is a conflict
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            MemDbError::TableAlreadyExists(_) | MemDbError::Conflict { .. }
        )
    }

    /// check if this error is recoverable by retrying the whole transaction
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MemDbError::Conflict { .. } | MemDbError::TooManySessions(_)
        )
    }
}

/// result type alias for driver operations
pub type MemDbResult<T> = Result<T, MemDbError>;
