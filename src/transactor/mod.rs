//! Nested transaction coordination.
//!
//! This module composes data-access calls into one atomic unit of work
//! without the calling code knowing whether it already runs inside a
//! transaction. The current session travels in the [`Context`]; the
//! outermost [`Transactor::within_transaction`] call begins it and is the only
//! frame that commits or rolls it back.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Transactor                           │
//! │     (begin or join, commit or rollback, panic safety)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │ HandleStore │       │  TxOption   │       │   Driver    │
//!  │ (ctx <-> tx)│       │ (ordered)   │       │  (traits)   │
//!  └─────────────┘       └─────────────┘       └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use transactor::context::Context;
//! use transactor::memdb::{MemDbError, MemoryDatabase};
//! use transactor::transactor::{Executor, TransactionError, Transactor};
//!
//! #[derive(Debug, thiserror::Error)]
//! enum AppError {
//!     #[error(transparent)]
//!     Db(#[from] MemDbError),
//!     #[error(transparent)]
//!     Tx(#[from] TransactionError),
//! }
//!
//! let db = MemoryDatabase::open_default();
//! let ctx = Context::background();
//! db.exec(&ctx, "CREATE TABLE text (val TEXT)", &[]).unwrap();
//!
//! let transactor = Transactor::new(db);
//! let result: Result<(), AppError> = transactor.within_transaction(&ctx, |ctx| {
//!     // Joins the outer session instead of starting a second one.
//!     transactor.within_transaction(ctx, |ctx| {
//!         transactor
//!             .get_executor(ctx)
//!             .exec(ctx, "INSERT INTO text (val) VALUES ($1)", &[serde_json::json!("a")])?;
//!         Ok(())
//!     })
//! });
//! assert!(result.is_ok());
//! ```

mod driver;
mod engine;
mod error;
mod executor;
mod option;
mod store;

pub use driver::{Beginner, Executor, Session};
pub use engine::Transactor;
pub use error::{find_cause, BoxError, TransactionError, TransactionResult};
pub use executor::ContextExecutor;
pub use option::{apply_options, TxOption};
pub use store::HandleStore;
