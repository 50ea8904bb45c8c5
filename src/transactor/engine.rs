//! Transactor - decides whether to begin, join, commit or roll back.
//!
//! The Transactor is the only component that begins and terminates
//! sessions. It handles:
//! - Joining a session already bound to the context (nested calls)
//! - Beginning a session with ordered options when none is bound
//! - Committing on success, rolling back on error or panic
//! - Reporting both errors when a rollback fails after a business error

use std::error::Error as StdError;
use std::sync::Arc;

use tracing::{debug, error, trace, warn};

use crate::context::Context;
use crate::transactor::driver::{Beginner, Session};
use crate::transactor::error::TransactionError;
use crate::transactor::executor::ContextExecutor;
use crate::transactor::option::{apply_options, TxOption};
use crate::transactor::store::HandleStore;

/// Coordinates nested transactional work over a single driver.
///
/// Thread-safe: can be shared across threads via Clone (uses Arc internally).
/// Clones share the same handle store, so a session begun through one clone
/// is joined by calls made through another.
pub struct Transactor<B: Beginner> {
    inner: Arc<TransactorInner<B>>,
}

struct TransactorInner<B: Beginner> {
    /// The base, non-transactional handle.
    beginner: B,
    /// Where sessions are bound to contexts.
    store: HandleStore<B::Session>,
}

impl<B: Beginner> Transactor<B> {
    /// Create a transactor over `beginner`.
    pub fn new(beginner: B) -> Self {
        Self {
            inner: Arc::new(TransactorInner {
                beginner,
                store: HandleStore::new(),
            }),
        }
    }

    /// The session bound to `ctx`, if any.
    pub fn try_get_tx(&self, ctx: &Context) -> Option<Arc<B::Session>> {
        self.inner.store.lookup(ctx)
    }

    /// The base handle, for work that must not join a transaction.
    pub fn tx_beginner(&self) -> &B {
        &self.inner.beginner
    }

    /// The executor repositories should use for `ctx`.
    pub fn get_executor(&self, ctx: &Context) -> ContextExecutor<'_, B> {
        match self.try_get_tx(ctx) {
            Some(session) => ContextExecutor::Transaction(session),
            None => ContextExecutor::Base(&self.inner.beginner),
        }
    }

    /// Run `f` inside a transaction with default options.
    ///
    /// See [`within_transaction_with`](Self::within_transaction_with).
    pub fn within_transaction<T, E, F>(&self, ctx: &Context, f: F) -> Result<T, E>
    where
        F: FnOnce(&Context) -> Result<T, E>,
        E: From<TransactionError> + StdError + Send + Sync + 'static,
    {
        self.within_transaction_with(ctx, &[], f)
    }

    /// Run `f` inside a transaction.
    ///
    /// If `ctx` already carries a session, `f` runs with `ctx` unchanged and
    /// its result is returned as is; the outer call owns commit and rollback,
    /// and `options` are ignored.
    ///
    /// Otherwise a session is begun with `options` applied in order, bound
    /// into a derived context, and `f` runs with that context. The session is
    /// committed if `f` returns `Ok` and rolled back if it returns `Err` or
    /// panics. A panic keeps unwinding after the rollback.
    pub fn within_transaction_with<T, E, F>(
        &self,
        ctx: &Context,
        options: &[&dyn TxOption<B::Options>],
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&Context) -> Result<T, E>,
        E: From<TransactionError> + StdError + Send + Sync + 'static,
    {
        if self.try_get_tx(ctx).is_some() {
            trace!("joining transaction bound to context");
            return f(ctx);
        }

        let session = self
            .inner
            .beginner
            .begin(ctx, apply_options(options))
            .map_err(|e| TransactionError::Begin(Box::new(e)))?;
        let session = Arc::new(session);
        debug!("transaction started");

        let guard = RollbackGuard {
            session: Some(Arc::clone(&session)),
            ctx,
        };
        let tx_ctx = self.inner.store.attach(ctx, Arc::clone(&session));
        let result = f(&tx_ctx);
        guard.disarm();

        match result {
            Ok(value) => {
                session
                    .commit(ctx)
                    .map_err(|e| TransactionError::Commit(Box::new(e)))?;
                debug!("transaction committed");
                Ok(value)
            }
            Err(cause) => match session.rollback(ctx) {
                Ok(()) => {
                    debug!(error = %cause, "transaction rolled back");
                    Err(cause)
                }
                Err(rollback) => {
                    error!(error = %cause, rollback_error = %rollback, "rollback failed");
                    Err(TransactionError::RollbackAfterError {
                        cause: Box::new(cause),
                        rollback: Box::new(rollback),
                    }
                    .into())
                }
            },
        }
    }
}

impl<B: Beginner> Clone for Transactor<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Beginner> std::fmt::Debug for Transactor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transactor")
            .field("store", &self.inner.store)
            .finish()
    }
}

/// Rolls the session back when dropped while still armed.
///
/// Only reached armed when the closure unwinds; normal returns disarm it and
/// terminate the session explicitly.
struct RollbackGuard<'a, S: Session> {
    session: Option<Arc<S>>,
    ctx: &'a Context,
}

impl<S: Session> RollbackGuard<'_, S> {
    fn disarm(mut self) {
        self.session = None;
    }
}

impl<S: Session> Drop for RollbackGuard<'_, S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            warn!(
                panicking = std::thread::panicking(),
                "rolling back unfinished transaction"
            );
            if let Err(e) = session.rollback(self.ctx) {
                error!(error = %e, "rollback of unfinished transaction failed");
            }
        }
    }
}
