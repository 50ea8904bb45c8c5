//! Execution context passed explicitly through every call chain.
//!
//! A [`Context`] is an immutable, cheaply clonable carrier of request-scoped
//! data: cancellation, deadlines and typed values stored under keys. Deriving
//! a context never changes the parent; it returns a new node that points back
//! at it, so contexts form a tree.
//!
//! ```text
//!   background
//!       │
//!       ├── with_timeout(5s)
//!       │        │
//!       │        └── with_value(TxKey, session)   <- seen only by this branch
//!       │
//!       └── with_value(RequestId, "abc")
//! ```
//!
//! # Usage
//!
//! ```
//! use std::time::Duration;
//! use transactor::context::Context;
//!
//! #[derive(PartialEq)]
//! struct RequestId;
//!
//! let ctx = Context::background().with_timeout(Duration::from_secs(5));
//! let ctx = ctx.with_value(RequestId, "abc".to_string());
//!
//! assert_eq!(ctx.value::<_, String>(&RequestId).map(String::as_str), Some("abc"));
//! assert!(ctx.check().is_ok());
//! ```

mod cancel;
mod error;

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cancel::CancelState;

pub use cancel::CancelHandle;
pub use error::{ContextError, ContextResult};

/// Immutable, chainable execution context.
#[derive(Clone)]
pub struct Context {
    node: Arc<Node>,
}

struct Node {
    parent: Option<Context>,
    kind: NodeKind,
}

enum NodeKind {
    Root,
    Value {
        key: Box<dyn Any + Send + Sync>,
        value: Box<dyn Any + Send + Sync>,
    },
    Cancel(Arc<CancelState>),
    Deadline(Instant),
}

impl Context {
    /// The empty root context: no values, no deadline, never canceled.
    pub fn background() -> Self {
        Self {
            node: Arc::new(Node {
                parent: None,
                kind: NodeKind::Root,
            }),
        }
    }

    fn derive(&self, kind: NodeKind) -> Self {
        Self {
            node: Arc::new(Node {
                parent: Some(self.clone()),
                kind,
            }),
        }
    }

    /// Derive a context carrying `value` under `key`.
    ///
    /// Keys are compared by type first and then by `PartialEq`, so a private
    /// key type cannot collide with keys defined elsewhere. A later value under
    /// an equal key shadows earlier ones.
    pub fn with_value<K, V>(&self, key: K, value: V) -> Self
    where
        K: PartialEq + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        self.derive(NodeKind::Value {
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    /// Look up the innermost value stored under `key`.
    ///
    /// Returns `None` when the key is absent or when the innermost value under
    /// it is not a `V`.
    pub fn value<K, V>(&self, key: &K) -> Option<&V>
    where
        K: PartialEq + 'static,
        V: 'static,
    {
        let mut current = self;
        loop {
            if let NodeKind::Value { key: k, value } = &current.node.kind {
                if k.downcast_ref::<K>() == Some(key) {
                    return value.downcast_ref::<V>();
                }
            }
            current = current.node.parent.as_ref()?;
        }
    }

    /// Derive a cancelable context.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let (handle, state) = CancelHandle::new();
        (self.derive(NodeKind::Cancel(state)), handle)
    }

    /// Derive a context that expires at `deadline`.
    ///
    /// An earlier deadline inherited from an ancestor still applies.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        self.derive(NodeKind::Deadline(deadline))
    }

    /// Derive a context that expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// The earliest deadline along the chain, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.ancestors()
            .filter_map(|ctx| match &ctx.node.kind {
                NodeKind::Deadline(at) => Some(*at),
                _ => None,
            })
            .min()
    }

    /// Why this context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<ContextError> {
        let now = Instant::now();
        self.ancestors().find_map(|ctx| match &ctx.node.kind {
            NodeKind::Cancel(state) if state.is_canceled() => Some(ContextError::Canceled),
            NodeKind::Deadline(at) if *at <= now => Some(ContextError::DeadlineExceeded),
            _ => None,
        })
    }

    /// [`err`](Self::err) as a `Result`, for use with `?`.
    pub fn check(&self) -> ContextResult<()> {
        match self.err() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn ancestors(&self) -> impl Iterator<Item = &Context> {
        std::iter::successors(Some(self), |ctx| ctx.node.parent.as_ref())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("depth", &self.ancestors().count())
            .field("deadline", &self.deadline())
            .field("err", &self.err())
            .finish()
    }
}
