//! Session isolation levels and begin options.
//!
//! The in-memory driver supports two isolation levels:
//! - ReadCommitted: Reads see the latest committed tables plus own writes
//! - RepeatableRead: Reads see the tables as of begin plus own writes

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::transactor::TxOption;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// Read Committed isolation.
    ///
    /// Each read sees the most recently committed data at the time of the
    /// read, with the session's own pending writes applied on top.
    #[default]
    ReadCommitted,

    /// Repeatable Read isolation (Snapshot Isolation).
    ///
    /// All reads see a snapshot of the tables taken when the session began,
    /// with the session's own pending writes applied on top.
    RepeatableRead,
}

impl IsolationLevel {
    /// Check if this isolation level uses snapshot reads.
    pub fn uses_snapshot(&self) -> bool {
        matches!(self, IsolationLevel::RepeatableRead)
    }

    /// Get a human-readable description of this isolation level.
    pub fn description(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "Each read sees the latest committed data",
            IsolationLevel::RepeatableRead => {
                "All reads see a consistent snapshot from session start"
            }
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationLevel::ReadCommitted => write!(f, "READ COMMITTED"),
            IsolationLevel::RepeatableRead => write!(f, "REPEATABLE READ"),
        }
    }
}

/// Parse isolation level from string (SQL syntax).
impl std::str::FromStr for IsolationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "READ COMMITTED" | "READ_COMMITTED" | "READCOMMITTED" => {
                Ok(IsolationLevel::ReadCommitted)
            }
            "REPEATABLE READ" | "REPEATABLE_READ" | "REPEATABLEREAD" | "SNAPSHOT" => {
                Ok(IsolationLevel::RepeatableRead)
            }
            _ => Err(format!("unknown isolation level: {}", s)),
        }
    }
}

impl TxOption<TxOptions> for IsolationLevel {
    fn apply(&self, options: &mut TxOptions) {
        options.isolation = Some(*self);
    }
}

/// Options consumed by [`MemoryDatabase::begin`](super::MemoryDatabase).
///
/// Unset fields fall back to the database configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxOptions {
    /// Isolation level; `None` uses the configured default.
    pub isolation: Option<IsolationLevel>,
    /// Reject writes in this session.
    pub read_only: bool,
}

/// Option marking a session read-only (`ReadOnly(true)`) or writable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOnly(pub bool);

impl TxOption<TxOptions> for ReadOnly {
    fn apply(&self, options: &mut TxOptions) {
        options.read_only = self.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transactor::apply_options;

    #[test]
    fn test_default_isolation() {
        assert_eq!(IsolationLevel::default(), IsolationLevel::ReadCommitted);
    }

    #[test]
    fn test_uses_snapshot() {
        assert!(!IsolationLevel::ReadCommitted.uses_snapshot());
        assert!(IsolationLevel::RepeatableRead.uses_snapshot());
    }

    #[test]
    fn test_parse_isolation() {
        assert_eq!(
            "READ COMMITTED".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::ReadCommitted
        );
        assert_eq!(
            "snapshot".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::RepeatableRead
        );
        assert!("serializable".parse::<IsolationLevel>().is_err());
    }

    #[test]
    fn test_later_option_wins() {
        let options = apply_options::<TxOptions>(&[
            &IsolationLevel::RepeatableRead,
            &ReadOnly(true),
            &IsolationLevel::ReadCommitted,
            &ReadOnly(false),
        ]);

        assert_eq!(
            options,
            TxOptions {
                isolation: Some(IsolationLevel::ReadCommitted),
                read_only: false,
            }
        );
    }
}
