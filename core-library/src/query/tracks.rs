//! Queries that produce track id lists or a single materialized track

use super::{
    normalize_filter, placeholders, push_term_filter, LimitAndOffset, Query, QueryState,
    ResultCell, MAX_BOUND_PARAMETERS,
};
use crate::error::{LibraryError, Result};
use crate::models::{fields, CategoryType, PlaylistId, Track, TrackId};
use async_trait::async_trait;
use bridge_traits::database::{DatabaseAdapter, QueryRow, QueryValue};
use bridge_traits::get_column;
use tracing::debug;

const TRACK_JOINS: &str = "\
    FROM tracks t \
    LEFT JOIN albums al ON al.id = t.album_id \
    LEFT JOIN artists ar ON ar.id = t.artist_id \
    LEFT JOIN genres g ON g.id = t.genre_id";

const SEARCH_COLUMNS: [&str; 4] = ["t.title", "al.name", "ar.name", "g.name"];

const TRACK_ORDER: &str = " ORDER BY al.name COLLATE NOCASE, t.disc_num, t.track_num, t.id";

fn rows_to_ids(rows: &[QueryRow]) -> Result<Vec<TrackId>> {
    let mut ids = Vec::with_capacity(rows.len());
    for row in rows {
        ids.push(TrackId(get_column!(row, "id", i64)));
    }
    Ok(ids)
}

// =============================================================================
// Search
// =============================================================================

/// Free-text search over title, album, artist and genre
///
/// Every whitespace-separated term has to match at least one of the fields.
/// An empty search lists the whole library.
pub struct SearchTrackListQuery {
    text: Option<String>,
    limit: Option<LimitAndOffset>,
    state: QueryState,
    result: ResultCell<Vec<TrackId>>,
}

impl SearchTrackListQuery {
    pub fn new(text: &str, limit: Option<LimitAndOffset>) -> Self {
        Self {
            text: normalize_filter(text),
            limit,
            state: QueryState::new(),
            result: ResultCell::new(),
        }
    }

    pub fn take_result(&self) -> Option<Vec<TrackId>> {
        self.result.take()
    }
}

#[async_trait]
impl Query for SearchTrackListQuery {
    fn name(&self) -> &'static str {
        "SearchTrackListQuery"
    }

    fn state(&self) -> &QueryState {
        &self.state
    }

    async fn run(&self, db: &dyn DatabaseAdapter) -> Result<()> {
        let mut sql = format!("SELECT t.id AS id {} WHERE 1 = 1", TRACK_JOINS);
        let mut params = Vec::new();

        if let Some(text) = &self.text {
            push_term_filter(&mut sql, &mut params, &SEARCH_COLUMNS, text);
        }
        sql.push_str(TRACK_ORDER);
        if let Some(limit) = &self.limit {
            limit.push_sql(&mut sql, &mut params);
        }

        let rows = db.query(&sql, &params).await?;
        let ids = rows_to_ids(&rows)?;
        debug!(count = ids.len(), "Search matched tracks");

        self.result.put(ids);
        Ok(())
    }
}

// =============================================================================
// Category browse
// =============================================================================

/// Tracks belonging to one category value, optionally narrowed by a filter
pub struct CategoryTrackListQuery {
    category: CategoryType,
    selected_id: i64,
    filter: Option<String>,
    limit: Option<LimitAndOffset>,
    state: QueryState,
    result: ResultCell<Vec<TrackId>>,
}

impl CategoryTrackListQuery {
    /// # Errors
    ///
    /// `InvalidInput` for unknown category names and for the playlist
    /// category, which is browsed with [`GetPlaylistQuery`].
    pub fn new(
        category: &str,
        selected_id: i64,
        filter: &str,
        limit: Option<LimitAndOffset>,
    ) -> Result<Self> {
        let category = CategoryType::from_name(category).ok_or_else(|| {
            LibraryError::invalid_input("category", format!("unknown category '{}'", category))
        })?;

        if category.track_column().is_none() {
            return Err(LibraryError::invalid_input(
                "category",
                "playlists are browsed with GetPlaylistQuery",
            ));
        }

        Ok(Self {
            category,
            selected_id,
            filter: normalize_filter(filter),
            limit,
            state: QueryState::new(),
            result: ResultCell::new(),
        })
    }

    pub fn take_result(&self) -> Option<Vec<TrackId>> {
        self.result.take()
    }
}

#[async_trait]
impl Query for CategoryTrackListQuery {
    fn name(&self) -> &'static str {
        "CategoryTrackListQuery"
    }

    fn state(&self) -> &QueryState {
        &self.state
    }

    async fn run(&self, db: &dyn DatabaseAdapter) -> Result<()> {
        let column = self.category.track_column().ok_or_else(|| {
            LibraryError::invalid_input("category", self.category.as_str().to_string())
        })?;

        let mut sql = format!("SELECT t.id AS id {} WHERE t.{} = ?", TRACK_JOINS, column);
        let mut params = vec![QueryValue::Integer(self.selected_id)];

        if let Some(filter) = &self.filter {
            push_term_filter(&mut sql, &mut params, &SEARCH_COLUMNS, filter);
        }
        sql.push_str(TRACK_ORDER);
        if let Some(limit) = &self.limit {
            limit.push_sql(&mut sql, &mut params);
        }

        let rows = db.query(&sql, &params).await?;
        let ids = rows_to_ids(&rows)?;
        debug!(
            category = %self.category,
            selected_id = self.selected_id,
            count = ids.len(),
            "Category browse matched tracks"
        );

        self.result.put(ids);
        Ok(())
    }
}

// =============================================================================
// Playlist contents
// =============================================================================

/// Track ids of a playlist in their saved order
///
/// An unknown playlist yields an empty list.
pub struct GetPlaylistQuery {
    playlist_id: PlaylistId,
    limit: Option<LimitAndOffset>,
    state: QueryState,
    result: ResultCell<Vec<TrackId>>,
}

impl GetPlaylistQuery {
    pub fn new(playlist_id: PlaylistId, limit: Option<LimitAndOffset>) -> Self {
        Self {
            playlist_id,
            limit,
            state: QueryState::new(),
            result: ResultCell::new(),
        }
    }

    pub fn take_result(&self) -> Option<Vec<TrackId>> {
        self.result.take()
    }
}

#[async_trait]
impl Query for GetPlaylistQuery {
    fn name(&self) -> &'static str {
        "GetPlaylistQuery"
    }

    fn state(&self) -> &QueryState {
        &self.state
    }

    async fn run(&self, db: &dyn DatabaseAdapter) -> Result<()> {
        let mut sql = String::from(
            "SELECT track_id AS id FROM playlist_tracks WHERE playlist_id = ? ORDER BY sort_order",
        );
        let mut params = vec![QueryValue::Integer(self.playlist_id.0)];
        if let Some(limit) = &self.limit {
            limit.push_sql(&mut sql, &mut params);
        }

        let rows = db.query(&sql, &params).await?;
        let ids = rows_to_ids(&rows)?;
        debug!(playlist_id = %self.playlist_id, count = ids.len(), "Loaded playlist");

        self.result.put(ids);
        Ok(())
    }
}

// =============================================================================
// External id resolution
// =============================================================================

/// Batched `external_id IN (...)` lookup
///
/// Unknown external ids are skipped, so the output carries no positional
/// correspondence with the input. Inputs larger than SQLite's parameter cap
/// are split into several statements inside the same unit.
pub struct ExternalIdListToTrackListQuery {
    external_ids: Vec<String>,
    state: QueryState,
    result: ResultCell<Vec<TrackId>>,
}

impl ExternalIdListToTrackListQuery {
    pub fn new<S: AsRef<str>>(external_ids: &[S]) -> Self {
        Self {
            external_ids: external_ids
                .iter()
                .map(|id| id.as_ref().to_string())
                .collect(),
            state: QueryState::new(),
            result: ResultCell::new(),
        }
    }

    pub fn take_result(&self) -> Option<Vec<TrackId>> {
        self.result.take()
    }
}

#[async_trait]
impl Query for ExternalIdListToTrackListQuery {
    fn name(&self) -> &'static str {
        "ExternalIdListToTrackListQuery"
    }

    fn state(&self) -> &QueryState {
        &self.state
    }

    async fn run(&self, db: &dyn DatabaseAdapter) -> Result<()> {
        let mut ids = Vec::new();

        for chunk in self.external_ids.chunks(MAX_BOUND_PARAMETERS) {
            let sql = format!(
                "SELECT id FROM tracks WHERE external_id IN ({})",
                placeholders(chunk.len())
            );
            let params: Vec<QueryValue> = chunk
                .iter()
                .map(|id| QueryValue::Text(id.clone()))
                .collect();

            let rows = db.query(&sql, &params).await?;
            ids.extend(rows_to_ids(&rows)?);
        }

        debug!(
            requested = self.external_ids.len(),
            resolved = ids.len(),
            "Resolved external ids"
        );

        self.result.put(ids);
        Ok(())
    }
}

// =============================================================================
// Track metadata
// =============================================================================

enum TrackKey {
    Id(TrackId),
    ExternalId(String),
}

/// Materialize one track, keyed by row id or by external id
///
/// Fails with `NotFound` when no row matches.
pub struct TrackMetadataQuery {
    key: TrackKey,
    state: QueryState,
    result: ResultCell<Track>,
}

impl TrackMetadataQuery {
    pub fn by_id(id: TrackId) -> Self {
        Self::with_key(TrackKey::Id(id))
    }

    pub fn by_external_id(external_id: impl Into<String>) -> Self {
        Self::with_key(TrackKey::ExternalId(external_id.into()))
    }

    fn with_key(key: TrackKey) -> Self {
        Self {
            key,
            state: QueryState::new(),
            result: ResultCell::new(),
        }
    }

    pub fn take_result(&self) -> Option<Track> {
        self.result.take()
    }
}

fn row_to_track(row: &QueryRow) -> Result<Track> {
    let mut track = Track::new(TrackId(get_column!(row, fields::ID, i64)));

    for (column, value) in row {
        if column == fields::ID {
            continue;
        }
        if let Some(text) = value.to_display_string() {
            track.set(column.as_str(), text);
        }
    }

    Ok(track)
}

#[async_trait]
impl Query for TrackMetadataQuery {
    fn name(&self) -> &'static str {
        "TrackMetadataQuery"
    }

    fn state(&self) -> &QueryState {
        &self.state
    }

    async fn run(&self, db: &dyn DatabaseAdapter) -> Result<()> {
        let (predicate, param, key) = match &self.key {
            TrackKey::Id(id) => ("t.id = ?", QueryValue::Integer(id.0), id.to_string()),
            TrackKey::ExternalId(external_id) => (
                "t.external_id = ?",
                QueryValue::Text(external_id.clone()),
                external_id.clone(),
            ),
        };

        let sql = format!(
            "SELECT t.id, t.external_id, t.title, t.track_num, t.disc_num, t.duration_ms, \
             t.year, t.filename, t.album_id, t.artist_id, t.album_artist_id, t.genre_id, \
             al.name AS album, ar.name AS artist, aa.name AS album_artist, g.name AS genre \
             FROM tracks t \
             LEFT JOIN albums al ON al.id = t.album_id \
             LEFT JOIN artists ar ON ar.id = t.artist_id \
             LEFT JOIN artists aa ON aa.id = t.album_artist_id \
             LEFT JOIN genres g ON g.id = t.genre_id \
             WHERE {}",
            predicate
        );

        let row = db
            .query_one_optional(&sql, &[param])
            .await?
            .ok_or_else(|| LibraryError::not_found("Track", key))?;

        self.result.put(row_to_track(&row)?);
        Ok(())
    }
}
