//! Executor resolution for repositories.

use std::sync::Arc;

use serde_json::Value;

use crate::context::Context;
use crate::transactor::driver::{Beginner, Executor};

/// The executor a repository should use for a given context.
///
/// Returned by [`Transactor::get_executor`](super::Transactor::get_executor):
/// the bound session when the context carries one, the base handle
/// otherwise. Repositories run every statement through it and never call
/// begin, commit or rollback themselves.
pub enum ContextExecutor<'a, B: Beginner> {
    /// Statements run inside the session bound to the context.
    Transaction(Arc<B::Session>),
    /// Statements run on the base handle, each in its own implicit transaction.
    Base(&'a B),
}

impl<B: Beginner> ContextExecutor<'_, B> {
    /// Whether statements will run inside a transaction.
    pub fn is_transactional(&self) -> bool {
        matches!(self, ContextExecutor::Transaction(_))
    }

    /// The bound session, if any.
    pub fn session(&self) -> Option<&Arc<B::Session>> {
        match self {
            ContextExecutor::Transaction(session) => Some(session),
            ContextExecutor::Base(_) => None,
        }
    }
}

impl<B, R, E> Executor for ContextExecutor<'_, B>
where
    B: Beginner + Executor<Row = R, Error = E>,
    B::Session: Executor<Row = R, Error = E>,
    E: std::error::Error + Send + Sync + 'static,
{
    type Row = R;
    type Error = E;

    fn exec(&self, ctx: &Context, statement: &str, params: &[Value]) -> Result<u64, E> {
        match self {
            ContextExecutor::Transaction(session) => session.exec(ctx, statement, params),
            ContextExecutor::Base(base) => base.exec(ctx, statement, params),
        }
    }

    fn query(&self, ctx: &Context, statement: &str, params: &[Value]) -> Result<Vec<R>, E> {
        match self {
            ContextExecutor::Transaction(session) => session.query(ctx, statement, params),
            ContextExecutor::Base(base) => base.query(ctx, statement, params),
        }
    }
}
