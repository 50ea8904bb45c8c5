//! Transactor - driver-agnostic nested transaction coordination
//!
//! Business code composes data-access calls into one atomic unit of work
//! without knowing whether it already runs inside a transaction. The open
//! session travels in an explicit [`context::Context`]; the outermost
//! [`transactor::Transactor::within_transaction`] call begins it and is the
//! only frame that commits or rolls it back.
//!
//! # Example
//!
//! ```
//! use transactor::context::Context;
//! use transactor::memdb::MemoryDatabase;
//! use transactor::transactor::{Executor, Transactor};
//! use transactor::usecase::{TextRepository, UseCase, TEXT_TABLE_DDL};
//!
//! let ctx = Context::background();
//! let db = MemoryDatabase::open_default();
//! db.exec(&ctx, TEXT_TABLE_DDL, &[]).unwrap();
//!
//! let transactor = Transactor::new(db);
//! let use_case = UseCase::new(
//!     TextRepository::new(transactor.clone(), false),
//!     TextRepository::new(transactor.clone(), true),
//!     transactor.clone(),
//! );
//!
//! // The second repository fails, so neither insert is kept.
//! assert!(use_case.create_text_records(&ctx, "text_A").is_err());
//! assert!(transactor.tx_beginner().query(&ctx, "SELECT * FROM text", &[]).unwrap().is_empty());
//! ```

pub mod context;
pub mod memdb;
pub mod transactor;
pub mod usecase;
