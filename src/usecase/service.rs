//! Use cases composed from repositories.

use crate::context::Context;
use crate::transactor::{Beginner, Executor, Transactor};
use crate::usecase::error::UseCaseResult;
use crate::usecase::repository::TextRepository;

/// Writes one value through two repositories as a single unit of work.
pub struct UseCase<B: Beginner> {
    a: TextRepository<B>,
    b: TextRepository<B>,
    transactor: Transactor<B>,
}

impl<B> UseCase<B>
where
    B: Beginner + Executor,
    B::Session: Executor<Row = <B as Executor>::Row, Error = <B as Executor>::Error>,
{
    /// Create a use case writing through `a` then `b`.
    pub fn new(a: TextRepository<B>, b: TextRepository<B>, transactor: Transactor<B>) -> Self {
        Self { a, b, transactor }
    }

    /// Insert `val` through both repositories. Either both rows are written
    /// or neither is.
    pub fn create_text_records(&self, ctx: &Context, val: &str) -> UseCaseResult<()> {
        self.transactor.within_transaction(ctx, |ctx| {
            self.a.insert(ctx, val)?;
            self.b.insert(ctx, val)?;
            Ok(())
        })
    }
}

/// Runs two [`UseCase`]s inside one outer transaction.
///
/// The inner use cases join the outer session, so all four inserts commit
/// or roll back together.
pub struct UseCases<B: Beginner> {
    first: UseCase<B>,
    second: UseCase<B>,
    transactor: Transactor<B>,
}

impl<B> UseCases<B>
where
    B: Beginner + Executor,
    B::Session: Executor<Row = <B as Executor>::Row, Error = <B as Executor>::Error>,
{
    /// Create a composition running `first` then `second`.
    pub fn new(first: UseCase<B>, second: UseCase<B>, transactor: Transactor<B>) -> Self {
        Self {
            first,
            second,
            transactor,
        }
    }

    /// Run both use cases in one session. Any failure discards all four rows.
    pub fn create_text_records(&self, ctx: &Context, val: &str) -> UseCaseResult<()> {
        self.transactor.within_transaction(ctx, |ctx| {
            self.first.create_text_records(ctx, val)?;
            self.second.create_text_records(ctx, val)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::sync::atomic::{AtomicBool, Ordering};

    use tracing_test::traced_test;

    use crate::memdb::{MemDbError, MemoryDatabase, Row};
    use crate::transactor::Session;
    use crate::usecase::error::{RepositoryError, UseCaseError};
    use crate::usecase::repository::TEXT_TABLE_DDL;

    const VAL: &str = "text_A";

    fn setup() -> (Context, Transactor<MemoryDatabase>) {
        let ctx = Context::background();
        let db = MemoryDatabase::open_default();
        db.exec(&ctx, TEXT_TABLE_DDL, &[]).unwrap();
        (ctx, Transactor::new(db))
    }

    fn use_case(
        transactor: &Transactor<MemoryDatabase>,
        a_fails: bool,
        b_fails: bool,
    ) -> UseCase<MemoryDatabase> {
        UseCase::new(
            TextRepository::new(transactor.clone(), a_fails),
            TextRepository::new(transactor.clone(), b_fails),
            transactor.clone(),
        )
    }

    fn rows(transactor: &Transactor<MemoryDatabase>, ctx: &Context) -> Vec<Row> {
        TextRepository::new(transactor.clone(), false)
            .list(ctx)
            .unwrap()
    }

    #[test]
    fn test_use_case_commits_both_rows() {
        let (ctx, transactor) = setup();

        use_case(&transactor, false, false)
            .create_text_records(&ctx, VAL)
            .unwrap();

        let rows = rows(&transactor, &ctx);
        assert_eq!(rows.len(), 2);
        assert!(rows
            .iter()
            .all(|row| row.get("val") == Some(&serde_json::json!(VAL))));
    }

    #[test]
    fn test_use_case_rolls_back_when_b_fails() {
        let (ctx, transactor) = setup();

        let err = use_case(&transactor, false, true)
            .create_text_records(&ctx, VAL)
            .unwrap_err();

        assert!(err.is_expected());
        assert!(matches!(
            err,
            UseCaseError::Repository(RepositoryError::Expected)
        ));
        assert!(rows(&transactor, &ctx).is_empty());
        assert_eq!(transactor.tx_beginner().stats().rolled_back, 1);
    }

    #[test]
    fn test_use_case_rolls_back_when_a_fails() {
        let (ctx, transactor) = setup();

        let err = use_case(&transactor, true, false)
            .create_text_records(&ctx, VAL)
            .unwrap_err();

        assert!(err.is_expected());
        assert!(rows(&transactor, &ctx).is_empty());
    }

    #[test]
    fn test_autocommitted_row_survives_later_rollback() {
        let (ctx, transactor) = setup();
        TextRepository::new(transactor.clone(), false)
            .insert(&ctx, "pre")
            .unwrap();

        let err = use_case(&transactor, false, true)
            .create_text_records(&ctx, VAL)
            .unwrap_err();
        assert!(err.is_expected());

        let rows = rows(&transactor, &ctx);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("val"), Some(&serde_json::json!("pre")));
        assert_eq!(transactor.tx_beginner().stats().rolled_back, 1);
    }

    #[test]
    fn test_use_cases_commit_four_rows_in_one_session() {
        let (ctx, transactor) = setup();
        let use_cases = UseCases::new(
            use_case(&transactor, false, false),
            use_case(&transactor, false, false),
            transactor.clone(),
        );

        use_cases.create_text_records(&ctx, VAL).unwrap();

        assert_eq!(rows(&transactor, &ctx).len(), 4);
        let stats = transactor.tx_beginner().stats();
        assert_eq!(stats.begun, 1);
        assert_eq!(stats.committed, 1);
        assert_eq!(stats.rolled_back, 0);
    }

    #[test]
    fn test_use_cases_roll_back_everything_on_late_failure() {
        let (ctx, transactor) = setup();
        let use_cases = UseCases::new(
            use_case(&transactor, false, false),
            use_case(&transactor, false, true),
            transactor.clone(),
        );

        let err = use_cases.create_text_records(&ctx, VAL).unwrap_err();

        assert!(err.is_expected());
        assert!(rows(&transactor, &ctx).is_empty());
        let stats = transactor.tx_beginner().stats();
        assert_eq!(stats.begun, 1);
        assert_eq!(stats.committed, 0);
        assert_eq!(stats.rolled_back, 1);
        assert_eq!(transactor.tx_beginner().active_count(), 0);
    }

    #[test]
    fn test_pending_rows_invisible_outside_session() {
        let (ctx, transactor) = setup();
        let repo = TextRepository::new(transactor.clone(), false);

        let result: UseCaseResult<()> = transactor.within_transaction(&ctx, |tx_ctx| {
            repo.insert(tx_ctx, VAL)?;

            assert_eq!(repo.list(tx_ctx)?.len(), 1);
            assert!(repo.list(&ctx)?.is_empty());
            assert!(transactor
                .tx_beginner()
                .query(tx_ctx, "SELECT * FROM text", &[])
                .map(|rows| rows.is_empty())
                .unwrap_or(false));
            Ok(())
        });

        result.unwrap();
        assert_eq!(repo.list(&ctx).unwrap().len(), 1);
    }

    #[test]
    fn test_one_session_shared_by_the_whole_tree() {
        let (ctx, transactor) = setup();
        let seen = AtomicBool::new(false);

        let result: UseCaseResult<()> = transactor.within_transaction(&ctx, |outer| {
            let outer_tx = transactor.try_get_tx(outer);
            transactor.within_transaction(outer, |inner| {
                let inner_tx = transactor.try_get_tx(inner);
                let same = match (&outer_tx, &inner_tx) {
                    (Some(a), Some(b)) => std::sync::Arc::ptr_eq(a, b),
                    _ => false,
                };
                seen.store(same, Ordering::SeqCst);
                Ok(())
            })
        });

        result.unwrap();
        assert!(seen.load(Ordering::SeqCst));
        assert_eq!(transactor.tx_beginner().stats().begun, 1);
    }

    #[traced_test]
    #[test]
    fn test_failed_rollback_reports_both_errors() {
        let (ctx, transactor) = setup();
        let repo = TextRepository::new(transactor.clone(), true);

        // Terminating the session early makes the engine's rollback fail.
        let err = transactor
            .within_transaction(&ctx, |tx_ctx| -> UseCaseResult<()> {
                if let Some(session) = transactor.try_get_tx(tx_ctx) {
                    session.rollback(tx_ctx).map_err(|e| RepositoryError::Scan(Box::new(e)))?;
                }
                repo.insert(tx_ctx, VAL)?;
                Ok(())
            })
            .unwrap_err();

        assert!(err.is_expected());
        match &err {
            UseCaseError::Transaction(tx_err) => {
                assert!(tx_err.is_rollback_failure());
                assert!(tx_err
                    .rollback_error()
                    .and_then(|e| e.downcast_ref::<MemDbError>())
                    .is_some_and(|e| matches!(e, MemDbError::SessionClosed { .. })));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.source().is_some());
        assert!(logs_contain("rollback failed"));
    }
}
