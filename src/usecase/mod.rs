//! Use-case composition.
//!
//! Repositories resolve their executor from the context and never manage
//! transactions. Use cases wrap repository calls in
//! [`Transactor::within_transaction`](crate::transactor::Transactor::within_transaction),
//! and composing use cases nests those calls: the outermost one owns the
//! session and the rest join it.

mod error;
mod repository;
mod service;

pub use error::{RepositoryError, UseCaseError, UseCaseResult};
pub use repository::{TextRepository, TEXT_TABLE_DDL};
pub use service::{UseCase, UseCases};
