//! Binding of the current session to an execution context.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::context::Context;

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Private context key. Only a `HandleStore` can build one, and each store
/// uses its own id, so two stores never see each other's sessions.
#[derive(Debug, PartialEq, Eq)]
struct TxKey {
    store_id: u64,
}

/// Attaches sessions of type `S` to contexts and looks them up again.
pub struct HandleStore<S> {
    id: u64,
    _session: PhantomData<fn() -> S>,
}

impl<S> HandleStore<S>
where
    S: Send + Sync + 'static,
{
    /// Create a store with a fresh, process-unique key.
    pub fn new() -> Self {
        Self {
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
            _session: PhantomData,
        }
    }

    /// Derive a context with `session` bound under this store's key.
    pub fn attach(&self, ctx: &Context, session: Arc<S>) -> Context {
        ctx.with_value(TxKey { store_id: self.id }, session)
    }

    /// The session bound to `ctx` by this store, if any.
    pub fn lookup(&self, ctx: &Context) -> Option<Arc<S>> {
        ctx.value::<_, Arc<S>>(&TxKey { store_id: self.id })
            .cloned()
    }
}

impl<S> Default for HandleStore<S>
where
    S: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for HandleStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleStore").field("id", &self.id).finish()
    }
}
