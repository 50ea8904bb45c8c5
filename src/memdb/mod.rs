//! In-memory reference driver.
//!
//! A small SQL database kept entirely in memory, implementing the
//! [`Beginner`](crate::transactor::Beginner),
//! [`Session`](crate::transactor::Session) and
//! [`Executor`](crate::transactor::Executor) capabilities. It exists to
//! exercise the transactor end to end without an external server.
//!
//! Supported statements:
//! - `CREATE TABLE [IF NOT EXISTS]`, `DROP TABLE [IF EXISTS]`
//! - `INSERT INTO t [(cols)] VALUES (...), ...`
//! - `SELECT * | cols FROM t [WHERE col = v AND ...]`
//! - `DELETE FROM t [WHERE ...]`, `TRUNCATE TABLE t`
//!
//! Parameters are bound from `$1`, `$2`, ... or `?` placeholders.

mod config;
mod database;
mod error;
mod isolation;
mod session;
mod statement;
mod table;

pub use config::DatabaseConfig;
pub use database::{DatabaseStats, MemoryDatabase};
pub use error::{MemDbError, MemDbResult};
pub use isolation::{IsolationLevel, ReadOnly, TxOptions};
pub use session::{MemorySession, SessionMetadata, SessionStatus};
pub use table::Row;
