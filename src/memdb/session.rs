//! Open transaction sessions.
//!
//! A session buffers its writes in a log of bound commands. Commit replays
//! the log against the latest committed state under the database commit
//! lock and swaps the result in, so a commit applies completely or not at
//! all. Reads see the session's own writes:
//! - ReadCommitted: latest committed tables with the log replayed on top
//! - RepeatableRead: a private working copy taken at begin

use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::Context;
use crate::memdb::database::MemoryDatabase;
use crate::memdb::error::{MemDbError, MemDbResult};
use crate::memdb::isolation::IsolationLevel;
use crate::memdb::statement::Command;
use crate::memdb::table::{Row, Tables};
use crate::transactor::{Executor, Session};

/// Session metadata tracked by the database while the session is open.
#[derive(Debug, Clone)]
pub struct SessionMetadata {
    /// Unique session ID.
    pub session_id: String,
    /// Isolation level for this session.
    pub isolation: IsolationLevel,
    /// Whether writes are rejected.
    pub read_only: bool,
    /// When the session started.
    pub started_at: DateTime<Utc>,
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Committed,
    RolledBack,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Committed => write!(f, "committed"),
            SessionStatus::RolledBack => write!(f, "rolled back"),
        }
    }
}

struct SessionState {
    status: SessionStatus,
    /// RepeatableRead view; unused under ReadCommitted.
    working: Tables,
    /// Writes to apply on commit, in order.
    log: Vec<Command>,
}

/// An open transaction on a [`MemoryDatabase`].
pub struct MemorySession {
    db: MemoryDatabase,
    metadata: SessionMetadata,
    state: Mutex<SessionState>,
}

impl MemorySession {
    pub(crate) fn new(db: MemoryDatabase, metadata: SessionMetadata) -> Self {
        let working = if metadata.isolation.uses_snapshot() {
            db.snapshot()
        } else {
            Tables::default()
        };

        Self {
            db,
            metadata,
            state: Mutex::new(SessionState {
                status: SessionStatus::Active,
                working,
                log: Vec::new(),
            }),
        }
    }

    /// Get the session ID.
    pub fn id(&self) -> &str {
        &self.metadata.session_id
    }

    /// Get the session metadata.
    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    /// Get the current lifecycle state.
    pub fn status(&self) -> SessionStatus {
        self.state.lock().status
    }

    fn ensure_active(&self, state: &SessionState) -> MemDbResult<()> {
        if state.status != SessionStatus::Active {
            return Err(MemDbError::SessionClosed {
                session_id: self.metadata.session_id.clone(),
                state: state.status.to_string(),
            });
        }
        Ok(())
    }

    /// Run `f` against the tables as this session sees them.
    fn with_view<T>(
        &self,
        state: &mut SessionState,
        f: impl FnOnce(&mut Tables) -> MemDbResult<T>,
    ) -> MemDbResult<T> {
        if self.metadata.isolation.uses_snapshot() {
            return f(&mut state.working);
        }

        let mut view = self.db.snapshot();
        for command in &state.log {
            view.execute(command).map_err(|e| MemDbError::Conflict {
                session_id: self.metadata.session_id.clone(),
                reason: e.to_string(),
            })?;
        }
        f(&mut view)
    }

    fn prepare(&self, ctx: &Context, statement: &str, params: &[Value]) -> MemDbResult<Command> {
        ctx.check()?;
        let command = Command::parse(statement, params)?;
        if command.is_write() && self.metadata.read_only {
            return Err(MemDbError::ReadOnly(statement.to_string()));
        }
        Ok(command)
    }
}

impl Session for MemorySession {
    type Error = MemDbError;

    fn commit(&self, ctx: &Context) -> MemDbResult<()> {
        ctx.check()?;

        let mut state = self.state.lock();
        self.ensure_active(&state)?;

        let log = std::mem::take(&mut state.log);
        match self.db.apply_log(&self.metadata.session_id, &log) {
            Ok(()) => {
                state.status = SessionStatus::Committed;
                self.db.mark_completed(&self.metadata.session_id, true);
                debug!(session_id = %self.metadata.session_id, writes = log.len(), "session committed");
                Ok(())
            }
            Err(e) => {
                state.status = SessionStatus::RolledBack;
                self.db.mark_completed(&self.metadata.session_id, false);
                warn!(session_id = %self.metadata.session_id, error = %e, "commit failed, session rolled back");
                Err(e)
            }
        }
    }

    fn rollback(&self, _ctx: &Context) -> MemDbResult<()> {
        let mut state = self.state.lock();
        self.ensure_active(&state)?;

        state.status = SessionStatus::RolledBack;
        state.log.clear();
        self.db.mark_completed(&self.metadata.session_id, false);
        debug!(session_id = %self.metadata.session_id, "session rolled back");
        Ok(())
    }
}

impl Executor for MemorySession {
    type Row = Row;
    type Error = MemDbError;

    fn exec(&self, ctx: &Context, statement: &str, params: &[Value]) -> MemDbResult<u64> {
        let command = self.prepare(ctx, statement, params)?;

        let mut state = self.state.lock();
        self.ensure_active(&state)?;

        if !command.is_write() {
            return self.with_view(&mut state, |tables| {
                tables.query(&command).map(|rows| rows.len() as u64)
            });
        }

        let affected = self.with_view(&mut state, |tables| tables.execute(&command))?;
        state.log.push(command);
        Ok(affected)
    }

    fn query(&self, ctx: &Context, statement: &str, params: &[Value]) -> MemDbResult<Vec<Row>> {
        let command = self.prepare(ctx, statement, params)?;

        let mut state = self.state.lock();
        self.ensure_active(&state)?;
        self.with_view(&mut state, |tables| tables.query(&command))
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if self.state.get_mut().status == SessionStatus::Active {
            self.db.mark_completed(&self.metadata.session_id, false);
            debug!(session_id = %self.metadata.session_id, "session dropped while active");
        }
    }
}

impl fmt::Debug for MemorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySession")
            .field("session_id", &self.metadata.session_id)
            .field("isolation", &self.metadata.isolation)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::memdb::isolation::TxOptions;
    use crate::transactor::Beginner;

    fn setup() -> (Context, MemoryDatabase) {
        let ctx = Context::background();
        let db = MemoryDatabase::open_default();
        db.exec(&ctx, "CREATE TABLE text (val TEXT)", &[]).unwrap();
        (ctx, db)
    }

    fn begin(db: &MemoryDatabase, ctx: &Context, isolation: IsolationLevel) -> MemorySession {
        db.begin(
            ctx,
            TxOptions {
                isolation: Some(isolation),
                read_only: false,
            },
        )
        .unwrap()
    }

    fn count(executor: &impl Executor<Row = Row, Error = MemDbError>, ctx: &Context) -> usize {
        executor.query(ctx, "SELECT * FROM text", &[]).unwrap().len()
    }

    #[test]
    fn test_commit_publishes_writes() {
        let (ctx, db) = setup();
        let session = begin(&db, &ctx, IsolationLevel::ReadCommitted);

        session
            .exec(&ctx, "INSERT INTO text (val) VALUES ($1)", &[json!("a")])
            .unwrap();
        assert_eq!(count(&session, &ctx), 1);
        assert_eq!(count(&db, &ctx), 0);

        session.commit(&ctx).unwrap();
        assert_eq!(count(&db, &ctx), 1);
        assert_eq!(session.status(), SessionStatus::Committed);
        assert!(!db.is_active(session.id()));
    }

    #[test]
    fn test_rollback_discards_writes() {
        let (ctx, db) = setup();
        let session = begin(&db, &ctx, IsolationLevel::RepeatableRead);

        session.exec(&ctx, "INSERT INTO text VALUES ('a')", &[]).unwrap();
        session.rollback(&ctx).unwrap();

        assert_eq!(count(&db, &ctx), 0);
        assert_eq!(db.stats().rolled_back, 1);
    }

    #[test]
    fn test_read_committed_sees_new_commits() {
        let (ctx, db) = setup();
        let session = begin(&db, &ctx, IsolationLevel::ReadCommitted);

        db.exec(&ctx, "INSERT INTO text VALUES ('outside')", &[]).unwrap();
        assert_eq!(count(&session, &ctx), 1);
    }

    #[test]
    fn test_repeatable_read_keeps_snapshot() {
        let (ctx, db) = setup();
        let session = begin(&db, &ctx, IsolationLevel::RepeatableRead);

        db.exec(&ctx, "INSERT INTO text VALUES ('outside')", &[]).unwrap();
        assert_eq!(count(&session, &ctx), 0);

        session.exec(&ctx, "INSERT INTO text VALUES ('inside')", &[]).unwrap();
        session.commit(&ctx).unwrap();
        assert_eq!(count(&db, &ctx), 2);
    }

    #[test]
    fn test_terminated_session_rejects_calls() {
        let (ctx, db) = setup();
        let session = begin(&db, &ctx, IsolationLevel::ReadCommitted);
        session.commit(&ctx).unwrap();

        assert!(matches!(
            session.exec(&ctx, "INSERT INTO text VALUES ('a')", &[]),
            Err(MemDbError::SessionClosed { .. })
        ));
        assert!(matches!(
            session.rollback(&ctx),
            Err(MemDbError::SessionClosed { .. })
        ));
        assert!(matches!(
            session.commit(&ctx),
            Err(MemDbError::SessionClosed { .. })
        ));
    }

    #[test]
    fn test_read_only_session() {
        let (ctx, db) = setup();
        let session = db
            .begin(
                &ctx,
                TxOptions {
                    isolation: None,
                    read_only: true,
                },
            )
            .unwrap();

        assert!(matches!(
            session.exec(&ctx, "DELETE FROM text", &[]),
            Err(MemDbError::ReadOnly(_))
        ));
        assert_eq!(count(&session, &ctx), 0);
    }

    #[test]
    fn test_conflicting_commit_is_rolled_back() {
        let (ctx, db) = setup();
        let session = begin(&db, &ctx, IsolationLevel::RepeatableRead);
        session.exec(&ctx, "INSERT INTO text VALUES ('a')", &[]).unwrap();

        db.exec(&ctx, "DROP TABLE text", &[]).unwrap();

        let err = session.commit(&ctx).unwrap_err();
        assert!(err.is_conflict());
        assert!(err.is_retryable());
        assert_eq!(session.status(), SessionStatus::RolledBack);
        assert_eq!(db.active_count(), 0);
        assert!(db.table_names().is_empty());
    }

    #[test]
    fn test_commit_checks_context_rollback_does_not() {
        let (ctx, db) = setup();
        let session = begin(&db, &ctx, IsolationLevel::ReadCommitted);
        let (canceled, handle) = ctx.with_cancel();
        handle.cancel();

        assert!(matches!(
            session.commit(&canceled),
            Err(MemDbError::Context(_))
        ));
        assert_eq!(session.status(), SessionStatus::Active);

        session.rollback(&canceled).unwrap();
        assert_eq!(session.status(), SessionStatus::RolledBack);
    }

    #[test]
    fn test_drop_releases_active_session() {
        let (ctx, db) = setup();
        let session = begin(&db, &ctx, IsolationLevel::ReadCommitted);
        assert_eq!(db.active_count(), 1);

        drop(session);
        assert_eq!(db.active_count(), 0);
        assert_eq!(db.stats().rolled_back, 1);
    }
}
