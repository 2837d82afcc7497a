//! Configuration for the bundled SQLite executor
//!
//! Provides a builder pattern for describing how the connection pool is opened.

use std::path::Path;
use std::time::Duration;

/// sqlx's default idle timeout
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);
/// sqlx's default connection lifetime
const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Connection settings for [`crate::executor::SqliteExecutor`]
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// sqlx SQLite URL, e.g. `sqlite://data/app.db` or `sqlite::memory:`
    pub database_url: String,
    /// Upper bound on pooled connections (default: 5)
    pub max_connections: u32,
    /// Connections kept open even when idle (default: 0)
    pub min_connections: u32,
    /// Create the database file when it does not exist yet (default: true)
    pub create_if_missing: bool,
    /// Close connections idle for longer than this; `None` keeps them (default: 10 min)
    pub idle_timeout: Option<Duration>,
    /// Retire connections older than this; `None` keeps them (default: 30 min)
    pub max_lifetime: Option<Duration>,
}

impl ExecutorConfig {
    /// Create a new configuration builder
    pub fn builder(database_url: impl Into<String>) -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::new(database_url)
    }

    /// Builder for a database stored in a local file
    pub fn local(path: impl AsRef<Path>) -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::new(format!("sqlite://{}", path.as_ref().display()))
    }

    /// Builder for a private in-memory database
    ///
    /// The in-memory database lives only as long as a connection to it is
    /// open, so the pool keeps exactly one connection and never retires it.
    pub fn in_memory() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::new("sqlite::memory:")
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    }
}

/// Builder for ExecutorConfig
#[derive(Debug)]
pub struct ExecutorConfigBuilder {
    database_url: String,
    max_connections: u32,
    min_connections: u32,
    create_if_missing: bool,
    idle_timeout: Option<Duration>,
    max_lifetime: Option<Duration>,
}

impl ExecutorConfigBuilder {
    /// Create a new builder with the database URL
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 5,
            min_connections: 0,
            create_if_missing: true,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            max_lifetime: Some(DEFAULT_MAX_LIFETIME),
        }
    }

    /// Set the maximum pool size (default: 5)
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the minimum number of idle connections (default: 0)
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Enable or disable creating a missing database file (default: true)
    pub fn create_if_missing(mut self, enabled: bool) -> Self {
        self.create_if_missing = enabled;
        self
    }

    /// Set the idle timeout; `None` disables it (default: 10 min)
    pub fn idle_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.idle_timeout = timeout.into();
        self
    }

    /// Set the maximum connection lifetime; `None` disables it (default: 30 min)
    pub fn max_lifetime(mut self, lifetime: impl Into<Option<Duration>>) -> Self {
        self.max_lifetime = lifetime.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> ExecutorConfig {
        ExecutorConfig {
            database_url: self.database_url,
            max_connections: self.max_connections.max(1),
            min_connections: self.min_connections.min(self.max_connections.max(1)),
            create_if_missing: self.create_if_missing,
            idle_timeout: self.idle_timeout,
            max_lifetime: self.max_lifetime,
        }
    }
}
