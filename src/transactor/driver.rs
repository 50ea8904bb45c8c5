//! Capabilities a driver adapter provides to the transactor.
//!
//! A driver is a small adapter over a concrete client library. It implements
//! [`Beginner`] on its base handle (a connection or pool), [`Session`] on its
//! open-transaction type, and [`Executor`] on both so repositories can run
//! statements without knowing whether a transaction is open.

use serde_json::Value;

use crate::context::Context;

/// Something that can start a transaction session.
///
/// The base handle is long-lived and shared; `begin` may be called
/// concurrently from independent call chains when the driver supports it.
pub trait Beginner: Send + Sync + 'static {
    /// The open-transaction type produced by [`begin`](Self::begin).
    type Session: Session<Error = Self::Error>;

    /// Driver-specific transaction options (isolation level, read-only, ...).
    type Options: Default;

    /// Driver error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Start a new session.
    fn begin(&self, ctx: &Context, options: Self::Options) -> Result<Self::Session, Self::Error>;
}

/// One open transaction.
///
/// The transactor terminates every session it begins with exactly one call
/// to either [`commit`](Self::commit) or [`rollback`](Self::rollback).
pub trait Session: Send + Sync + 'static {
    /// Driver error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Make the session's writes durable and visible.
    fn commit(&self, ctx: &Context) -> Result<(), Self::Error>;

    /// Discard the session's writes.
    fn rollback(&self, ctx: &Context) -> Result<(), Self::Error>;
}

/// Runs statements and queries.
pub trait Executor {
    /// A row produced by [`query`](Self::query).
    type Row;

    /// Driver error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Execute a statement, returning the number of affected rows.
    fn exec(&self, ctx: &Context, statement: &str, params: &[Value]) -> Result<u64, Self::Error>;

    /// Execute a query, returning its rows.
    fn query(
        &self,
        ctx: &Context,
        statement: &str,
        params: &[Value],
    ) -> Result<Vec<Self::Row>, Self::Error>;
}
