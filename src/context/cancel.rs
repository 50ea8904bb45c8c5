//! Cancellation signal shared between a context and its handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub(crate) struct CancelState {
    canceled: AtomicBool,
}

impl CancelState {
    pub(crate) fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }
}

/// Handle returned by [`Context::with_cancel`](super::Context::with_cancel).
///
/// Canceling is one-way and affects the context it was created with and
/// every context derived from it afterwards.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    pub(crate) fn new() -> (Self, Arc<CancelState>) {
        let state = Arc::new(CancelState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }

    /// Cancel the associated context.
    pub fn cancel(&self) {
        self.state.canceled.store(true, Ordering::Release);
    }

    /// Check whether [`cancel`](Self::cancel) has been called.
    pub fn is_canceled(&self) -> bool {
        self.state.is_canceled()
    }
}
