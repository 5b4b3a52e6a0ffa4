//! # Query Units
//!
//! Every read or write against the library is packaged as a [`Query`]: a
//! single-use unit of work carrying its parameters, a lifecycle status and a
//! slot for its typed result. Units are handed to a [`Library`], which runs
//! them one at a time on its worker.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──enqueue──▶ Running ──Ok──▶ Finished
//!                      └──Err/panic──▶ Failed
//! ```
//!
//! The engine owns status transitions. Callers only read the status and,
//! once it is `Finished`, take the result out of the concrete query.
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use core_library::query::{run_to_completion, SearchTrackListQuery};
//!
//! let query = Arc::new(SearchTrackListQuery::new("night drive", None));
//! run_to_completion(library.as_ref(), &query)?;
//! let ids = query.take_result().unwrap_or_default();
//! ```

mod categories;
mod playlists;
mod tracks;

pub use categories::{AlbumListQuery, CategoryListQuery};
pub use playlists::{AppendPlaylistQuery, DeletePlaylistQuery, SavePlaylistQuery};
pub use tracks::{
    CategoryTrackListQuery, ExternalIdListToTrackListQuery, GetPlaylistQuery,
    SearchTrackListQuery, TrackMetadataQuery,
};

use crate::error::{LibraryError, Result};
use async_trait::async_trait;
use bridge_traits::database::{DatabaseAdapter, QueryValue};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

/// SQLite's default cap on bound parameters per statement.
pub(crate) const MAX_BOUND_PARAMETERS: usize = 999;

// =============================================================================
// Status
// =============================================================================

/// Lifecycle status of a query unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryStatus {
    Idle,
    Running,
    Finished,
    Failed,
}

impl QueryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueryStatus::Finished | QueryStatus::Failed)
    }

    fn to_u8(self) -> u8 {
        match self {
            QueryStatus::Idle => 0,
            QueryStatus::Running => 1,
            QueryStatus::Finished => 2,
            QueryStatus::Failed => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => QueryStatus::Running,
            2 => QueryStatus::Finished,
            3 => QueryStatus::Failed,
            _ => QueryStatus::Idle,
        }
    }
}

/// Status cell shared between the submitting thread and the worker
#[derive(Debug)]
pub struct QueryState(AtomicU8);

impl QueryState {
    pub fn new() -> Self {
        Self(AtomicU8::new(QueryStatus::Idle.to_u8()))
    }

    pub fn get(&self) -> QueryStatus {
        QueryStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, status: QueryStatus) {
        self.0.store(status.to_u8(), Ordering::Release);
    }
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed result slot written by the worker and taken by the caller
#[derive(Debug)]
pub(crate) struct ResultCell<T>(Mutex<Option<T>>);

impl<T> ResultCell<T> {
    pub(crate) fn new() -> Self {
        Self(Mutex::new(None))
    }

    pub(crate) fn put(&self, value: T) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(value);
        }
    }

    pub(crate) fn take(&self) -> Option<T> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl<T> Default for ResultCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Contracts
// =============================================================================

/// A single-use unit of work executed by a [`Library`]
#[async_trait]
pub trait Query: Send + Sync {
    /// Stable name used in logs and errors
    fn name(&self) -> &'static str;

    /// Status cell; the engine writes it, callers read it
    fn state(&self) -> &QueryState;

    /// Execute against the store. Only the engine calls this.
    async fn run(&self, db: &dyn DatabaseAdapter) -> Result<()>;

    fn status(&self) -> QueryStatus {
        self.state().get()
    }
}

/// How a query is submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Block the caller until the query is terminal
    Synchronous,
    /// Return as soon as the query is queued
    Asynchronous,
}

/// Query engine
///
/// Implementations execute queries in submission order. `enqueue` only
/// returns `Err` when the query could not be submitted at all; execution
/// failures are reported through the query's status.
pub trait Library: Send + Sync {
    fn enqueue(&self, query: Arc<dyn Query>, mode: QueryMode) -> Result<()>;
}

/// Submit `query` synchronously and require it to finish
///
/// Any terminal status other than `Finished` becomes
/// [`LibraryError::QueryFailed`].
pub fn run_to_completion<Q>(library: &dyn Library, query: &Arc<Q>) -> Result<()>
where
    Q: Query + 'static,
{
    let unit: Arc<dyn Query> = query.clone();
    library.enqueue(unit, QueryMode::Synchronous)?;

    match query.status() {
        QueryStatus::Finished => Ok(()),
        status => Err(LibraryError::QueryFailed {
            query: query.name().to_string(),
            status,
        }),
    }
}

// =============================================================================
// SQL helpers
// =============================================================================

/// Paging window; only present when the caller asked for a limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitAndOffset {
    pub limit: u32,
    pub offset: u32,
}

impl LimitAndOffset {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    /// `None` when `limit` is negative (no paging). Negative offsets clamp to 0.
    pub fn from_raw(limit: i32, offset: i32) -> Option<Self> {
        if limit < 0 {
            return None;
        }
        Some(Self {
            limit: limit as u32,
            offset: offset.max(0) as u32,
        })
    }

    pub(crate) fn push_sql(&self, sql: &mut String, params: &mut Vec<QueryValue>) {
        sql.push_str(" LIMIT ? OFFSET ?");
        params.push(QueryValue::Integer(i64::from(self.limit)));
        params.push(QueryValue::Integer(i64::from(self.offset)));
    }
}

/// Normalize an optional caller filter; blank means "no filter"
pub(crate) fn normalize_filter(filter: &str) -> Option<String> {
    let trimmed = filter.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// `%term%` with LIKE wildcards escaped; pair with `ESCAPE '\'`
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// `?,?,?` for `count` parameters
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

/// Append one `AND (a LIKE ? OR b LIKE ? ...)` group per whitespace-separated term
pub(crate) fn push_term_filter(
    sql: &mut String,
    params: &mut Vec<QueryValue>,
    columns: &[&str],
    text: &str,
) {
    for term in text.split_whitespace() {
        let pattern = like_pattern(term);
        let clauses: Vec<String> = columns
            .iter()
            .map(|column| format!(r"{} LIKE ? ESCAPE '\'", column))
            .collect();
        sql.push_str(" AND (");
        sql.push_str(&clauses.join(" OR "));
        sql.push(')');
        for _ in columns {
            params.push(QueryValue::Text(pattern.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_state() {
        let state = QueryState::new();
        assert_eq!(state.get(), QueryStatus::Idle);
        for status in [
            QueryStatus::Running,
            QueryStatus::Finished,
            QueryStatus::Failed,
        ] {
            state.set(status);
            assert_eq!(state.get(), status);
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!QueryStatus::Idle.is_terminal());
        assert!(!QueryStatus::Running.is_terminal());
        assert!(QueryStatus::Finished.is_terminal());
        assert!(QueryStatus::Failed.is_terminal());
    }

    #[test]
    fn test_limit_and_offset_from_raw() {
        assert_eq!(LimitAndOffset::from_raw(-1, 10), None);
        assert_eq!(
            LimitAndOffset::from_raw(25, -3),
            Some(LimitAndOffset::new(25, 0))
        );
        assert_eq!(
            LimitAndOffset::from_raw(0, 5),
            Some(LimitAndOffset::new(0, 5))
        );
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("abc"), "%abc%");
        assert_eq!(like_pattern("100%"), r"%100\%%");
        assert_eq!(like_pattern("a_b"), r"%a\_b%");
        assert_eq!(like_pattern(r"c:\"), r"%c:\\%");
    }

    #[test]
    fn test_normalize_filter() {
        assert_eq!(normalize_filter("   "), None);
        assert_eq!(normalize_filter(" rock "), Some("rock".to_string()));
    }

    #[test]
    fn test_term_filter_binds_every_column() {
        let mut sql = String::from("SELECT 1 WHERE 1 = 1");
        let mut params = Vec::new();
        push_term_filter(&mut sql, &mut params, &["a", "b"], "x  y");

        assert_eq!(sql.matches("LIKE ?").count(), 4);
        assert_eq!(params.len(), 4);
        assert_eq!(params[0], QueryValue::from("%x%"));
        assert_eq!(params[3], QueryValue::from("%y%"));
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?,?,?");
    }

    #[test]
    fn test_result_cell_take_empties_slot() {
        let cell = ResultCell::new();
        cell.put(5);
        assert_eq!(cell.take(), Some(5));
        assert_eq!(cell.take(), None);
    }
}
