//! Database Abstraction Layer
//!
//! Provides the storage-facing trait the library's query units run against.
//!
//! ## Design Philosophy
//!
//! Query units only ever see `&dyn DatabaseAdapter`. They build SQL text from
//! fixed fragments and bind every caller-supplied value as a positional
//! parameter, which keeps the query layer free of driver types and of string
//! interpolation.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::database::{DatabaseAdapter, DatabaseConfig, QueryValue};
//!
//! let mut adapter = SqliteAdapter::new(DatabaseConfig::in_memory()).await?;
//! adapter.initialize().await?;
//!
//! let rows = adapter
//!     .query("SELECT id FROM tracks WHERE external_id = ?", &[QueryValue::Text(id)])
//!     .await?;
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration for adapter initialization
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path or connection string
    pub database_url: String,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,

    /// Enable statement caching
    pub enable_cache: bool,

    /// Statement cache capacity
    pub cache_capacity: usize,
}

impl DatabaseConfig {
    /// Create a new database configuration with the given file path
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        let database_url = format!("sqlite:{}", path.display());

        Self {
            database_url,
            min_connections: 1,
            max_connections: 1,
            acquire_timeout_secs: 30,
            enable_cache: true,
            cache_capacity: 100,
        }
    }

    /// Create a configuration for an in-memory database
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            min_connections: 1,
            max_connections: 1,
            acquire_timeout_secs: 30,
            enable_cache: true,
            cache_capacity: 100,
        }
    }

    /// Whether this configuration points at a transient in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

// =============================================================================
// Query Result Types
// =============================================================================

/// Represents a single row from a database query as a map of column names to values
pub type QueryRow = std::collections::HashMap<String, QueryValue>;

/// Represents a database value that can be null, integer, real, text, or blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl QueryValue {
    /// Convert to i64 if possible
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            QueryValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Convert to f64 if possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            QueryValue::Real(r) => Some(*r),
            QueryValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Convert to String if possible
    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Convert to String (owned) if possible
    pub fn as_string(&self) -> Option<String> {
        match self {
            QueryValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Render scalar values as text; blobs and nulls yield `None`
    pub fn to_display_string(&self) -> Option<String> {
        match self {
            QueryValue::Integer(i) => Some(i.to_string()),
            QueryValue::Real(r) => Some(r.to_string()),
            QueryValue::Text(s) => Some(s.clone()),
            QueryValue::Null | QueryValue::Blob(_) => None,
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, QueryValue::Null)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Integer(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

// =============================================================================
// Database Adapter Trait
// =============================================================================

/// Database adapter trait used by every query unit
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`; the library worker owns the adapter
/// and hands out shared references to the query currently running.
///
/// ## Transaction Support
///
/// `begin_transaction`, `commit_transaction` and `rollback_transaction` bracket
/// multi-statement writes. Each transaction is identified by a `TransactionId`.
/// Adapters backed by a pool must pin the transaction to one connection (the
/// library's adapter is configured with a single connection for this reason).
#[async_trait::async_trait]
pub trait DatabaseAdapter: Send + Sync {
    // =========================================================================
    // Connection Management
    // =========================================================================

    /// Initialize the database connection and run migrations
    ///
    /// This method should:
    /// 1. Establish database connection(s)
    /// 2. Run pending migrations
    /// 3. Perform a health check
    async fn initialize(&mut self) -> Result<()>;

    /// Check if the database connection is healthy
    async fn health_check(&self) -> Result<()>;

    /// Close all database connections
    async fn close(&mut self) -> Result<()>;

    // =========================================================================
    // Raw Query Execution
    // =========================================================================

    /// Execute a raw SQL query and return rows
    ///
    /// # Safety
    ///
    /// This method should use parameterized queries to prevent SQL injection.
    /// Never concatenate user input directly into the query string.
    async fn query(&self, query: &str, params: &[QueryValue]) -> Result<Vec<QueryRow>>;

    /// Execute a SQL statement that doesn't return rows (INSERT, UPDATE, DELETE)
    ///
    /// Returns the number of rows affected.
    async fn execute(&self, statement: &str, params: &[QueryValue]) -> Result<u64>;

    /// Execute a query and return a single optional row
    async fn query_one_optional(
        &self,
        query: &str,
        params: &[QueryValue],
    ) -> Result<Option<QueryRow>>;

    /// Execute a query and return exactly one row
    async fn query_one(&self, query: &str, params: &[QueryValue]) -> Result<QueryRow>;

    // =========================================================================
    // Transaction Support
    // =========================================================================

    /// Begin a new database transaction
    async fn begin_transaction(&self) -> Result<TransactionId>;

    /// Commit a transaction
    async fn commit_transaction(&self, transaction_id: TransactionId) -> Result<()>;

    /// Rollback a transaction
    async fn rollback_transaction(&self, transaction_id: TransactionId) -> Result<()>;

    // =========================================================================
    // Batch Operations
    // =========================================================================

    /// Execute multiple statements sequentially
    ///
    /// Returns one row count per statement.
    async fn execute_batch(&self, statements: &[(&str, &[QueryValue])]) -> Result<Vec<u64>>;

    // =========================================================================
    // Utility Methods
    // =========================================================================

    /// Get the last inserted row ID
    async fn last_insert_rowid(&self) -> Result<i64>;
}

// =============================================================================
// Supporting Types
// =============================================================================

/// Unique identifier for a database transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(pub u64);

// =============================================================================
// Helper Macros for Implementations
// =============================================================================

/// Helper macro to convert Rust types to QueryValue
#[macro_export]
macro_rules! query_value {
    ($val:expr, i64) => {
        $crate::database::QueryValue::Integer($val as i64)
    };
    ($val:expr, String) => {
        $crate::database::QueryValue::Text($val.to_string())
    };
    ($val:expr, &str) => {
        $crate::database::QueryValue::Text($val.to_string())
    };
    (null) => {
        $crate::database::QueryValue::Null
    };
}

/// Helper macro to extract values from QueryRow
#[macro_export]
macro_rules! get_column {
    ($row:expr, $col:expr, i64) => {
        $row.get($col).and_then(|v| v.as_i64()).ok_or_else(|| {
            $crate::BridgeError::DatabaseError(format!("Missing or invalid i64 column: {}", $col))
        })?
    };
    ($row:expr, $col:expr, String) => {
        $row.get($col).and_then(|v| v.as_string()).ok_or_else(|| {
            $crate::BridgeError::DatabaseError(format!(
                "Missing or invalid String column: {}",
                $col
            ))
        })?
    };
    ($row:expr, $col:expr, Option<String>) => {
        $row.get($col)
            .and_then(|v| if v.is_null() { None } else { v.as_string() })
    };
    ($row:expr, $col:expr, Option<i64>) => {
        $row.get($col)
            .and_then(|v| if v.is_null() { None } else { v.as_i64() })
    };
}
