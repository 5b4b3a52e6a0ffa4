//! # Core Configuration Module
//!
//! Provides configuration management for the media library core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the settings needed to open the library: where the
//! database lives, how many materialized tracks each track list may keep in
//! memory, and how the single library worker is set up. Validation is
//! fail-fast so a misconfigured host learns about it at startup rather than
//! on the first query.
//!
//! ## Usage
//!
//! ### File-backed library
//!
//! ```
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/library.db")
//!     .track_cache_capacity(200)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ### In-memory library (tests, previews)
//!
//! ```
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder().in_memory().build().unwrap();
//! assert!(config.database_config().is_in_memory());
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // No database location was chosen
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing database location");
//! ```

use crate::error::{Error, Result};
use bridge_traits::database::DatabaseConfig;
use std::path::PathBuf;

/// Default number of materialized tracks a track list keeps cached.
pub const DEFAULT_TRACK_CACHE_CAPACITY: usize = 50;

/// Upper bound on the per-list track cache.
pub const MAX_TRACK_CACHE_CAPACITY: usize = 100_000;

/// Default name given to the library worker thread.
pub const DEFAULT_WORKER_THREAD_NAME: &str = "library-worker";

/// Where the library database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// SQLite database file on disk
    File(PathBuf),
    /// Transient in-memory database, discarded when the library closes
    InMemory,
}

/// Core configuration for the media library.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Database location
    pub database: DatabaseLocation,

    /// Number of materialized tracks each track list keeps in its LRU cache
    pub track_cache_capacity: usize,

    /// Prepared statement cache capacity for the library connection
    pub statement_cache_capacity: usize,

    /// Maximum time to wait for the database connection (seconds)
    pub acquire_timeout_secs: u64,

    /// Name of the worker thread that executes queries
    pub worker_thread_name: String,
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Database path is not empty
    /// - Track cache capacity is within `1..=MAX_TRACK_CACHE_CAPACITY`
    /// - Statement cache capacity is non-zero
    /// - Acquire timeout is non-zero
    /// - Worker thread name is not blank
    pub fn validate(&self) -> Result<()> {
        if let DatabaseLocation::File(path) = &self.database {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Database path cannot be empty".to_string()));
            }
        }

        if self.track_cache_capacity == 0 {
            return Err(Error::Config(
                "Track cache capacity must be greater than 0".to_string(),
            ));
        }

        if self.track_cache_capacity > MAX_TRACK_CACHE_CAPACITY {
            return Err(Error::Config(format!(
                "Track cache capacity exceeds maximum of {}",
                MAX_TRACK_CACHE_CAPACITY
            )));
        }

        if self.statement_cache_capacity == 0 {
            return Err(Error::Config(
                "Statement cache capacity must be greater than 0".to_string(),
            ));
        }

        if self.acquire_timeout_secs == 0 {
            return Err(Error::Config(
                "Acquire timeout must be greater than 0 seconds".to_string(),
            ));
        }

        if self.worker_thread_name.trim().is_empty() {
            return Err(Error::Config(
                "Worker thread name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Adapter configuration derived from this config.
    ///
    /// The library runs every query on one worker, so the pool is pinned to a
    /// single connection. That also keeps transactions and in-memory databases
    /// bound to the same SQLite handle.
    pub fn database_config(&self) -> DatabaseConfig {
        let mut config = match &self.database {
            DatabaseLocation::File(path) => DatabaseConfig::new(path),
            DatabaseLocation::InMemory => DatabaseConfig::in_memory(),
        };

        config.min_connections = 1;
        config.max_connections = 1;
        config.acquire_timeout_secs = self.acquire_timeout_secs;
        config.enable_cache = true;
        config.cache_capacity = self.statement_cache_capacity;
        config
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    database: Option<DatabaseLocation>,
    track_cache_capacity: Option<usize>,
    statement_cache_capacity: Option<usize>,
    acquire_timeout_secs: Option<u64>,
    worker_thread_name: Option<String>,
}

impl CoreConfigBuilder {
    /// Sets the database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .database_path("/path/to/library.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database = Some(DatabaseLocation::File(path.into()));
        self
    }

    /// Uses a transient in-memory database.
    pub fn in_memory(mut self) -> Self {
        self.database = Some(DatabaseLocation::InMemory);
        self
    }

    /// Sets the per-list track cache capacity.
    ///
    /// Default: 50 tracks
    pub fn track_cache_capacity(mut self, capacity: usize) -> Self {
        self.track_cache_capacity = Some(capacity);
        self
    }

    /// Sets the prepared statement cache capacity.
    ///
    /// Default: 100 statements
    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = Some(capacity);
        self
    }

    /// Sets the connection acquire timeout in seconds.
    ///
    /// Default: 30 seconds
    pub fn acquire_timeout_secs(mut self, secs: u64) -> Self {
        self.acquire_timeout_secs = Some(secs);
        self
    }

    /// Sets the worker thread name.
    pub fn worker_thread_name(mut self, name: impl Into<String>) -> Self {
        self.worker_thread_name = Some(name.into());
        self
    }

    /// Builds the configuration, validating every field.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if no database location was chosen or a value
    /// is out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let database = self.database.ok_or_else(|| {
            Error::Config(
                "Database location is required. Use .database_path() or .in_memory() to set it."
                    .to_string(),
            )
        })?;

        let config = CoreConfig {
            database,
            track_cache_capacity: self
                .track_cache_capacity
                .unwrap_or(DEFAULT_TRACK_CACHE_CAPACITY),
            statement_cache_capacity: self.statement_cache_capacity.unwrap_or(100),
            acquire_timeout_secs: self.acquire_timeout_secs.unwrap_or(30),
            worker_thread_name: self
                .worker_thread_name
                .unwrap_or_else(|| DEFAULT_WORKER_THREAD_NAME.to_string()),
        };

        config.validate()?;

        tracing::debug!(
            database = ?config.database,
            track_cache_capacity = config.track_cache_capacity,
            "Core configuration built"
        );

        Ok(config)
    }
}
