//! In-memory database handle.
//!
//! [`MemoryDatabase`] is the base handle of the driver. It begins sessions
//! and, used directly as an [`Executor`], runs every statement in its own
//! implicit transaction (autocommit).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::debug;
use ulid::Ulid;

use crate::context::Context;
use crate::memdb::config::DatabaseConfig;
use crate::memdb::error::{MemDbError, MemDbResult};
use crate::memdb::isolation::TxOptions;
use crate::memdb::session::{MemorySession, SessionMetadata};
use crate::memdb::statement::Command;
use crate::memdb::table::{Row, Tables};
use crate::transactor::{Beginner, Executor};

/// Counters of session outcomes since the database was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Sessions begun.
    pub begun: u64,
    /// Sessions committed.
    pub committed: u64,
    /// Sessions rolled back, explicitly or after a failed commit.
    pub rolled_back: u64,
}

/// In-memory database - the driver's base handle.
///
/// Thread-safe: can be shared across threads via Clone (uses Arc internally).
#[derive(Clone)]
pub struct MemoryDatabase {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    config: DatabaseConfig,
    /// Committed state.
    tables: RwLock<Tables>,
    /// Serializes every write to the committed state.
    commit_lock: Mutex<()>,
    /// Open sessions tracked by ID.
    active: RwLock<HashMap<String, SessionMetadata>>,
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
}

impl MemoryDatabase {
    /// Open an empty database with the given configuration.
    pub fn open(config: DatabaseConfig) -> MemDbResult<Self> {
        config.validate()?;
        debug!(name = %config.name, isolation = %config.default_isolation, "database opened");
        Ok(Self::with_config(config))
    }

    /// Open an empty database with the default configuration.
    pub fn open_default() -> Self {
        Self::with_config(DatabaseConfig::default())
    }

    fn with_config(config: DatabaseConfig) -> Self {
        Self {
            inner: Arc::new(DatabaseInner {
                config,
                tables: RwLock::new(Tables::default()),
                commit_lock: Mutex::new(()),
                active: RwLock::new(HashMap::new()),
                begun: AtomicU64::new(0),
                committed: AtomicU64::new(0),
                rolled_back: AtomicU64::new(0),
            }),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    /// List all committed tables.
    pub fn table_names(&self) -> Vec<String> {
        self.inner.tables.read().names()
    }

    /// Get the number of open sessions.
    pub fn active_count(&self) -> usize {
        self.inner.active.read().len()
    }

    /// List all open session IDs.
    pub fn active_sessions(&self) -> Vec<String> {
        self.inner.active.read().keys().cloned().collect()
    }

    /// Check if a session is open.
    pub fn is_active(&self, session_id: &str) -> bool {
        self.inner.active.read().contains_key(session_id)
    }

    /// Get metadata for an open session.
    pub fn session_info(&self, session_id: &str) -> Option<SessionMetadata> {
        self.inner.active.read().get(session_id).cloned()
    }

    /// Session outcome counters.
    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            begun: self.inner.begun.load(Ordering::Relaxed),
            committed: self.inner.committed.load(Ordering::Relaxed),
            rolled_back: self.inner.rolled_back.load(Ordering::Relaxed),
        }
    }

    /// A copy of the committed state.
    pub(crate) fn snapshot(&self) -> Tables {
        self.inner.tables.read().clone()
    }

    /// Apply a session's write log to the committed state, all or nothing.
    pub(crate) fn apply_log(&self, session_id: &str, log: &[Command]) -> MemDbResult<()> {
        let _guard = self.inner.commit_lock.lock();

        let mut next = self.inner.tables.read().clone();
        for command in log {
            next.execute(command).map_err(|e| MemDbError::Conflict {
                session_id: session_id.to_string(),
                reason: e.to_string(),
            })?;
        }

        *self.inner.tables.write() = next;
        Ok(())
    }

    /// Mark a session as finished, counting its outcome.
    pub(crate) fn mark_completed(&self, session_id: &str, committed: bool) {
        self.inner.active.write().remove(session_id);
        let counter = if committed {
            &self.inner.committed
        } else {
            &self.inner.rolled_back
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn autocommit(&self, statement: &str, command: &Command) -> MemDbResult<u64> {
        if self.inner.config.read_only {
            return Err(MemDbError::ReadOnly(statement.to_string()));
        }
        let _guard = self.inner.commit_lock.lock();
        self.inner.tables.write().execute(command)
    }
}

impl Beginner for MemoryDatabase {
    type Session = MemorySession;
    type Options = TxOptions;
    type Error = MemDbError;

    fn begin(&self, ctx: &Context, options: TxOptions) -> MemDbResult<MemorySession> {
        ctx.check()?;

        let metadata = SessionMetadata {
            session_id: Ulid::new().to_string().to_lowercase(),
            isolation: options
                .isolation
                .unwrap_or(self.inner.config.default_isolation),
            read_only: options.read_only || self.inner.config.read_only,
            started_at: chrono::Utc::now(),
        };

        {
            let mut active = self.inner.active.write();
            if let Some(limit) = self.inner.config.max_sessions {
                if active.len() >= limit {
                    return Err(MemDbError::TooManySessions(limit));
                }
            }
            active.insert(metadata.session_id.clone(), metadata.clone());
        }
        self.inner.begun.fetch_add(1, Ordering::Relaxed);

        debug!(
            session_id = %metadata.session_id,
            isolation = %metadata.isolation,
            read_only = metadata.read_only,
            "session started"
        );
        Ok(MemorySession::new(self.clone(), metadata))
    }
}

impl Executor for MemoryDatabase {
    type Row = Row;
    type Error = MemDbError;

    fn exec(&self, ctx: &Context, statement: &str, params: &[Value]) -> MemDbResult<u64> {
        ctx.check()?;
        let command = Command::parse(statement, params)?;
        if command.is_write() {
            self.autocommit(statement, &command)
        } else {
            self.inner.tables.read().query(&command).map(|rows| rows.len() as u64)
        }
    }

    fn query(&self, ctx: &Context, statement: &str, params: &[Value]) -> MemDbResult<Vec<Row>> {
        ctx.check()?;
        let command = Command::parse(statement, params)?;
        self.inner.tables.read().query(&command)
    }
}

impl std::fmt::Debug for MemoryDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDatabase")
            .field("name", &self.inner.config.name)
            .field("active_count", &self.active_count())
            .finish()
    }
}
