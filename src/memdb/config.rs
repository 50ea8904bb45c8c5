//! Database configuration.

use serde::{Deserialize, Serialize};

use crate::memdb::error::{MemDbError, MemDbResult};
use crate::memdb::isolation::IsolationLevel;

/// Database configuration options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Name used in log output.
    pub name: String,
    /// Isolation level for sessions that do not choose one.
    pub default_isolation: IsolationLevel,
    /// Upper bound on concurrently open sessions.
    pub max_sessions: Option<usize>,
    /// Reject every write, transactional or not.
    pub read_only: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: "memdb".to_string(),
            default_isolation: IsolationLevel::default(),
            max_sessions: None,
            read_only: false,
        }
    }
}

impl DatabaseConfig {
    /// Create a new configuration with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> MemDbResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the default isolation level.
    pub fn default_isolation(mut self, level: IsolationLevel) -> Self {
        self.default_isolation = level;
        self
    }

    /// Set the open-session limit.
    pub fn max_sessions(mut self, limit: usize) -> Self {
        self.max_sessions = Some(limit);
        self
    }

    /// Set read_only flag.
    pub fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> MemDbResult<()> {
        if self.name.trim().is_empty() {
            return Err(MemDbError::InvalidConfig("name must not be empty".into()));
        }
        if self.max_sessions == Some(0) {
            return Err(MemDbError::InvalidConfig(
                "max_sessions must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
