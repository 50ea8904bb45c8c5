//! Repository over the `text` table.

use serde_json::Value;

use crate::context::Context;
use crate::transactor::{Beginner, Executor, Transactor};
use crate::usecase::error::RepositoryError;

/// Schema of the table [`TextRepository`] works on.
pub const TEXT_TABLE_DDL: &str = "CREATE TABLE IF NOT EXISTS text (val TEXT)";

/// Inserts and scans text values.
///
/// Statements go through [`Transactor::get_executor`], so a call joins the
/// transaction bound to the context or autocommits when there is none.
pub struct TextRepository<B: Beginner> {
    transactor: Transactor<B>,
    error_expected: bool,
}

impl<B> TextRepository<B>
where
    B: Beginner + Executor,
    B::Session: Executor<Row = <B as Executor>::Row, Error = <B as Executor>::Error>,
{
    /// Create a repository. With `error_expected` set every insert fails
    /// with [`RepositoryError::Expected`] before touching the database.
    pub fn new(transactor: Transactor<B>, error_expected: bool) -> Self {
        Self {
            transactor,
            error_expected,
        }
    }

    /// Insert one value.
    pub fn insert(&self, ctx: &Context, val: &str) -> Result<(), RepositoryError> {
        if self.error_expected {
            return Err(RepositoryError::Expected);
        }

        self.transactor
            .get_executor(ctx)
            .exec(ctx, "INSERT INTO text (val) VALUES ($1)", &[Value::from(val)])
            .map_err(|e| RepositoryError::Insert(Box::new(e)))?;
        Ok(())
    }

    /// All rows of the table as seen from `ctx`.
    pub fn list(&self, ctx: &Context) -> Result<Vec<<B as Executor>::Row>, RepositoryError> {
        self.transactor
            .get_executor(ctx)
            .query(ctx, "SELECT val FROM text", &[])
            .map_err(|e| RepositoryError::Scan(Box::new(e)))
    }
}

impl<B: Beginner> Clone for TextRepository<B> {
    fn clone(&self) -> Self {
        Self {
            transactor: self.transactor.clone(),
            error_expected: self.error_expected,
        }
    }
}
