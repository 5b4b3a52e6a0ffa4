//! Native SQLite Database Adapter
//!
//! Implements the `DatabaseAdapter` trait using `sqlx` with the native SQLite driver.
//!
//! ## Features
//!
//! - One connection checked out of the pool and pinned for the adapter's lifetime
//! - WAL mode for file-backed databases
//! - Automatic migrations
//! - Prepared statement caching
//! - Transaction tracking, with recovery of transactions a query left open
//! - Foreign key enforcement

use async_trait::async_trait;
use bridge_traits::database::{
    DatabaseAdapter, DatabaseConfig, QueryRow, QueryValue, TransactionId,
};
use bridge_traits::error::{BridgeError, Result};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Column, Pool, Row, Sqlite};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// The pinned connection and the transaction currently open on it
struct PinnedConnection {
    conn: PoolConnection<Sqlite>,
    open_transaction: Option<TransactionId>,
}

/// Native SQLite implementation of DatabaseAdapter
///
/// Every statement runs on a single connection taken from the pool when the
/// adapter is created. The pool never hands it to anyone else and cannot
/// retire it, so a transaction always sees one SQLite handle from `BEGIN`
/// to `COMMIT`.
pub struct SqliteAdapter {
    pool: Pool<Sqlite>,
    connection: Mutex<Option<PinnedConnection>>,
    transaction_counter: AtomicU64,
}

impl SqliteAdapter {
    /// Create a new SqliteAdapter with the given configuration
    ///
    /// This will establish the connection pool, pin its connection and
    /// configure SQLite options, but will NOT run migrations. Call
    /// `initialize()` to run migrations.
    ///
    /// # Errors
    ///
    /// Returns error if connection pool creation fails
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        info!(
            database_url = %config.database_url,
            min_connections = config.min_connections,
            max_connections = config.max_connections,
            "Creating SQLite database adapter"
        );

        let in_memory = config.is_in_memory();

        let mut connect_options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| BridgeError::DatabaseError(format!("Invalid database URL: {}", e)))?
            .foreign_keys(true)
            .create_if_missing(true);

        if in_memory {
            connect_options = connect_options.journal_mode(SqliteJournalMode::Memory);
        } else {
            connect_options = connect_options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .pragma("cache_size", "-16000");
        }

        if config.enable_cache {
            connect_options = connect_options.statement_cache_capacity(config.cache_capacity);
        }

        debug!(in_memory, "SQLite connection options configured");

        // The connection stays checked out, so lifetime limits would only
        // matter if it were ever returned early.
        let pool = SqlitePoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to create connection pool");
                BridgeError::DatabaseError(format!("Connection pool creation failed: {}", e))
            })?;

        let conn = pool.acquire().await.map_err(|e| {
            warn!(error = %e, "Failed to acquire library connection");
            BridgeError::DatabaseError(format!("Connection acquire failed: {}", e))
        })?;

        info!(
            connections = pool.size(),
            "SQLite connection pool created successfully"
        );

        Ok(Self {
            pool,
            connection: Mutex::new(Some(PinnedConnection {
                conn,
                open_transaction: None,
            })),
            transaction_counter: AtomicU64::new(0),
        })
    }

    fn pinned(slot: &mut Option<PinnedConnection>) -> Result<&mut PinnedConnection> {
        slot.as_mut()
            .ok_or_else(|| BridgeError::DatabaseError("Database connection is closed".to_string()))
    }

    /// Roll back a transaction that is still open on the connection
    ///
    /// Called by the library worker after every query, so a query that
    /// panicked or returned early between `BEGIN` and `COMMIT` cannot leave
    /// the connection stuck inside its transaction. Returns `true` when
    /// something was rolled back.
    pub async fn rollback_if_open(&self) -> Result<bool> {
        let mut guard = self.connection.lock().await;
        let pinned = Self::pinned(&mut guard)?;

        let Some(transaction_id) = pinned.open_transaction.take() else {
            return Ok(false);
        };

        warn!(
            transaction_id = transaction_id.0,
            "Rolling back transaction left open"
        );

        sqlx::query("ROLLBACK TRANSACTION")
            .execute(&mut *pinned.conn)
            .await
            .map_err(|e| {
                BridgeError::DatabaseError(format!("Rollback transaction failed: {}", e))
            })?;

        Ok(true)
    }

    /// Whether a transaction is open on the connection
    pub async fn in_transaction(&self) -> bool {
        let guard = self.connection.lock().await;
        guard
            .as_ref()
            .is_some_and(|pinned| pinned.open_transaction.is_some())
    }

    /// Convert a sqlx Row to a QueryRow (HashMap)
    fn row_to_query_row(row: &sqlx::sqlite::SqliteRow) -> QueryRow {
        let mut result = HashMap::new();

        for column in row.columns() {
            let column_name = column.name().to_string();

            let value = if let Ok(v) = row.try_get::<Option<i64>, _>(column.ordinal()) {
                v.map(QueryValue::Integer).unwrap_or(QueryValue::Null)
            } else if let Ok(v) = row.try_get::<Option<f64>, _>(column.ordinal()) {
                v.map(QueryValue::Real).unwrap_or(QueryValue::Null)
            } else if let Ok(v) = row.try_get::<Option<String>, _>(column.ordinal()) {
                v.map(QueryValue::Text).unwrap_or(QueryValue::Null)
            } else if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(column.ordinal()) {
                v.map(QueryValue::Blob).unwrap_or(QueryValue::Null)
            } else {
                QueryValue::Null
            };

            result.insert(column_name, value);
        }

        result
    }

    /// Convert QueryValue parameters to sqlx-compatible format
    fn bind_params<'q>(
        query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
        params: &'q [QueryValue],
    ) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        let mut query = query;
        for param in params {
            query = match param {
                QueryValue::Null => query.bind(None::<i64>),
                QueryValue::Integer(i) => query.bind(i),
                QueryValue::Real(r) => query.bind(r),
                QueryValue::Text(s) => query.bind(s.as_str()),
                QueryValue::Blob(b) => query.bind(b.as_slice()),
            };
        }
        query
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        let mut guard = self.connection.lock().await;
        let pinned = Self::pinned(&mut guard)?;

        sqlx::migrate!("./migrations")
            .run_direct(&mut *pinned.conn)
            .await
            .map_err(|e| {
                warn!(error = %e, "Migration failed");
                BridgeError::DatabaseError(format!("Migration failed: {}", e))
            })?;

        info!("Database migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    async fn initialize(&mut self) -> Result<()> {
        debug!("Initializing database adapter");

        self.run_migrations().await?;
        self.health_check().await?;

        info!("Database adapter initialized successfully");
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        debug!("Performing database health check");

        let mut guard = self.connection.lock().await;
        let pinned = Self::pinned(&mut guard)?;

        sqlx::query("SELECT 1")
            .fetch_one(&mut *pinned.conn)
            .await
            .map_err(|e| {
                warn!(error = %e, "Database health check failed");
                BridgeError::DatabaseError(format!("Health check failed: {}", e))
            })?;

        debug!("Database health check passed");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Err(e) = self.rollback_if_open().await {
            warn!(error = %e, "Failed to roll back open transaction on close");
        }

        info!("Closing database connection pool");
        // The pool waits for checked-out connections, so release ours first.
        self.connection.lock().await.take();
        self.pool.close().await;
        Ok(())
    }

    async fn query(&self, query: &str, params: &[QueryValue]) -> Result<Vec<QueryRow>> {
        debug!(query = %query, param_count = params.len(), "Executing query");

        let mut guard = self.connection.lock().await;
        let pinned = Self::pinned(&mut guard)?;

        let rows = Self::bind_params(sqlx::query(query), params)
            .fetch_all(&mut *pinned.conn)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Query failed: {}", e)))?;

        let result: Vec<QueryRow> = rows.iter().map(Self::row_to_query_row).collect();

        debug!(row_count = result.len(), "Query executed successfully");
        Ok(result)
    }

    async fn execute(&self, statement: &str, params: &[QueryValue]) -> Result<u64> {
        debug!(statement = %statement, param_count = params.len(), "Executing statement");

        let mut guard = self.connection.lock().await;
        let pinned = Self::pinned(&mut guard)?;

        let result = Self::bind_params(sqlx::query(statement), params)
            .execute(&mut *pinned.conn)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Execute failed: {}", e)))?;

        let rows_affected = result.rows_affected();
        debug!(rows_affected, "Statement executed successfully");

        Ok(rows_affected)
    }

    async fn query_one_optional(
        &self,
        query: &str,
        params: &[QueryValue],
    ) -> Result<Option<QueryRow>> {
        debug!(query = %query, param_count = params.len(), "Executing query_one_optional");

        let mut guard = self.connection.lock().await;
        let pinned = Self::pinned(&mut guard)?;

        let row = Self::bind_params(sqlx::query(query), params)
            .fetch_optional(&mut *pinned.conn)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Query one optional failed: {}", e)))?;

        Ok(row.as_ref().map(Self::row_to_query_row))
    }

    async fn query_one(&self, query: &str, params: &[QueryValue]) -> Result<QueryRow> {
        debug!(query = %query, param_count = params.len(), "Executing query_one");

        let mut guard = self.connection.lock().await;
        let pinned = Self::pinned(&mut guard)?;

        let row = Self::bind_params(sqlx::query(query), params)
            .fetch_one(&mut *pinned.conn)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Query one failed: {}", e)))?;

        Ok(Self::row_to_query_row(&row))
    }

    async fn begin_transaction(&self) -> Result<TransactionId> {
        let mut guard = self.connection.lock().await;
        let pinned = Self::pinned(&mut guard)?;

        if let Some(open) = pinned.open_transaction {
            return Err(BridgeError::DatabaseError(format!(
                "Transaction {} is still open",
                open.0
            )));
        }

        let transaction_id = TransactionId(self.transaction_counter.fetch_add(1, Ordering::SeqCst));
        debug!(transaction_id = transaction_id.0, "Beginning transaction");

        sqlx::query("BEGIN TRANSACTION")
            .execute(&mut *pinned.conn)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Begin transaction failed: {}", e)))?;

        pinned.open_transaction = Some(transaction_id);
        Ok(transaction_id)
    }

    async fn commit_transaction(&self, transaction_id: TransactionId) -> Result<()> {
        debug!(transaction_id = transaction_id.0, "Committing transaction");

        let mut guard = self.connection.lock().await;
        let pinned = Self::pinned(&mut guard)?;

        if pinned.open_transaction != Some(transaction_id) {
            return Err(BridgeError::DatabaseError(format!(
                "Transaction {} is not open",
                transaction_id.0
            )));
        }

        // On failure the transaction stays open for the caller to roll back.
        sqlx::query("COMMIT TRANSACTION")
            .execute(&mut *pinned.conn)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Commit transaction failed: {}", e)))?;

        pinned.open_transaction = None;
        Ok(())
    }

    async fn rollback_transaction(&self, transaction_id: TransactionId) -> Result<()> {
        debug!(
            transaction_id = transaction_id.0,
            "Rolling back transaction"
        );

        let mut guard = self.connection.lock().await;
        let pinned = Self::pinned(&mut guard)?;

        if pinned.open_transaction != Some(transaction_id) {
            return Err(BridgeError::DatabaseError(format!(
                "Transaction {} is not open",
                transaction_id.0
            )));
        }
        pinned.open_transaction = None;

        sqlx::query("ROLLBACK TRANSACTION")
            .execute(&mut *pinned.conn)
            .await
            .map_err(|e| {
                BridgeError::DatabaseError(format!("Rollback transaction failed: {}", e))
            })?;

        Ok(())
    }

    async fn execute_batch(&self, statements: &[(&str, &[QueryValue])]) -> Result<Vec<u64>> {
        debug!(batch_size = statements.len(), "Executing batch");

        let mut results = Vec::with_capacity(statements.len());

        for (statement, params) in statements {
            let rows_affected = self.execute(statement, params).await?;
            results.push(rows_affected);
        }

        debug!(results = ?results, "Batch executed successfully");
        Ok(results)
    }

    async fn last_insert_rowid(&self) -> Result<i64> {
        let row = self
            .query_one("SELECT last_insert_rowid() as rowid", &[])
            .await?;

        let rowid = row.get("rowid").and_then(|v| v.as_i64()).ok_or_else(|| {
            BridgeError::DatabaseError("Failed to get last insert rowid".to_string())
        })?;

        Ok(rowid)
    }
}
