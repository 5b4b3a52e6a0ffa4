//! Playlist writes
//!
//! Every write touching more than one row runs inside a transaction and is
//! rolled back if any statement fails. `sort_order` values of a playlist are
//! kept contiguous from 0.

use super::{Query, QueryState, ResultCell};
use crate::error::{LibraryError, Result};
use crate::models::{PlaylistId, TrackId};
use async_trait::async_trait;
use bridge_traits::database::{DatabaseAdapter, QueryValue};
use bridge_traits::get_column;
use tracing::{debug, info, warn};

const INSERT_ENTRY: &str =
    "INSERT INTO playlist_tracks (playlist_id, track_id, sort_order) VALUES (?, ?, ?)";

/// Run `work` inside a transaction, rolling back on failure
macro_rules! transactional {
    ($db:expr, $work:expr) => {{
        let tx = $db.begin_transaction().await?;
        match $work.await {
            Ok(value) => {
                $db.commit_transaction(tx).await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = $db.rollback_transaction(tx).await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }};
}

async fn ensure_playlist_exists(db: &dyn DatabaseAdapter, playlist_id: PlaylistId) -> Result<()> {
    let row = db
        .query_one_optional(
            "SELECT id FROM playlists WHERE id = ?",
            &[QueryValue::Integer(playlist_id.0)],
        )
        .await?;

    match row {
        Some(_) => Ok(()),
        None => Err(LibraryError::not_found("Playlist", playlist_id)),
    }
}

/// Insert `track_ids` with consecutive sort orders starting at `first_order`
async fn insert_entries(
    db: &dyn DatabaseAdapter,
    playlist_id: PlaylistId,
    track_ids: &[TrackId],
    first_order: i64,
) -> Result<()> {
    if track_ids.is_empty() {
        return Ok(());
    }

    let rows: Vec<[QueryValue; 3]> = track_ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            [
                QueryValue::Integer(playlist_id.0),
                QueryValue::Integer(id.0),
                QueryValue::Integer(first_order + i as i64),
            ]
        })
        .collect();
    let statements: Vec<(&str, &[QueryValue])> = rows
        .iter()
        .map(|params| (INSERT_ENTRY, params.as_slice()))
        .collect();

    db.execute_batch(&statements).await?;
    Ok(())
}

// =============================================================================
// Save / replace / rename
// =============================================================================

enum SaveOperation {
    Create { name: String, track_ids: Vec<TrackId> },
    Replace { playlist_id: PlaylistId, track_ids: Vec<TrackId> },
    Rename { playlist_id: PlaylistId, name: String },
}

/// Create a playlist, replace its contents, or rename it
///
/// The result is the id of the affected playlist; for `create` it is the
/// freshly assigned one. Replace and rename fail with `NotFound` on an
/// unknown id; create and rename refuse blank names.
pub struct SavePlaylistQuery {
    operation: SaveOperation,
    state: QueryState,
    result: ResultCell<PlaylistId>,
}

impl SavePlaylistQuery {
    pub fn create(name: impl Into<String>, track_ids: Vec<TrackId>) -> Self {
        Self::with_operation(SaveOperation::Create {
            name: name.into(),
            track_ids,
        })
    }

    pub fn replace(playlist_id: PlaylistId, track_ids: Vec<TrackId>) -> Self {
        Self::with_operation(SaveOperation::Replace {
            playlist_id,
            track_ids,
        })
    }

    pub fn rename(playlist_id: PlaylistId, name: impl Into<String>) -> Self {
        Self::with_operation(SaveOperation::Rename {
            playlist_id,
            name: name.into(),
        })
    }

    fn with_operation(operation: SaveOperation) -> Self {
        Self {
            operation,
            state: QueryState::new(),
            result: ResultCell::new(),
        }
    }

    pub fn take_result(&self) -> Option<PlaylistId> {
        self.result.take()
    }

    async fn insert_playlist(
        db: &dyn DatabaseAdapter,
        name: &str,
        track_ids: &[TrackId],
    ) -> Result<PlaylistId> {
        db.execute(
            "INSERT INTO playlists (name) VALUES (?)",
            &[QueryValue::Text(name.to_string())],
        )
        .await?;
        let playlist_id = PlaylistId(db.last_insert_rowid().await?);

        insert_entries(db, playlist_id, track_ids, 0).await?;
        Ok(playlist_id)
    }

    async fn replace_entries(
        db: &dyn DatabaseAdapter,
        playlist_id: PlaylistId,
        track_ids: &[TrackId],
    ) -> Result<PlaylistId> {
        ensure_playlist_exists(db, playlist_id).await?;

        db.execute(
            "DELETE FROM playlist_tracks WHERE playlist_id = ?",
            &[QueryValue::Integer(playlist_id.0)],
        )
        .await?;

        insert_entries(db, playlist_id, track_ids, 0).await?;
        Ok(playlist_id)
    }
}

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(LibraryError::invalid_input(
            "name",
            "playlist name cannot be empty",
        ));
    }
    Ok(())
}

#[async_trait]
impl Query for SavePlaylistQuery {
    fn name(&self) -> &'static str {
        "SavePlaylistQuery"
    }

    fn state(&self) -> &QueryState {
        &self.state
    }

    async fn run(&self, db: &dyn DatabaseAdapter) -> Result<()> {
        let playlist_id = match &self.operation {
            SaveOperation::Create { name, track_ids } => {
                require_name(name)?;
                let id = transactional!(db, Self::insert_playlist(db, name, track_ids))?;
                info!(playlist_id = %id, tracks = track_ids.len(), "Created playlist");
                id
            }
            SaveOperation::Replace {
                playlist_id,
                track_ids,
            } => {
                let id = transactional!(db, Self::replace_entries(db, *playlist_id, track_ids))?;
                info!(playlist_id = %id, tracks = track_ids.len(), "Replaced playlist contents");
                id
            }
            SaveOperation::Rename { playlist_id, name } => {
                require_name(name)?;
                let affected = db
                    .execute(
                        "UPDATE playlists SET name = ? WHERE id = ?",
                        &[
                            QueryValue::Text(name.clone()),
                            QueryValue::Integer(playlist_id.0),
                        ],
                    )
                    .await?;
                if affected == 0 {
                    return Err(LibraryError::not_found("Playlist", playlist_id));
                }
                debug!(playlist_id = %playlist_id, "Renamed playlist");
                *playlist_id
            }
        };

        self.result.put(playlist_id);
        Ok(())
    }
}

// =============================================================================
// Delete
// =============================================================================

/// Delete a playlist and its entries; fails with `NotFound` when absent
pub struct DeletePlaylistQuery {
    playlist_id: PlaylistId,
    state: QueryState,
}

impl DeletePlaylistQuery {
    pub fn new(playlist_id: PlaylistId) -> Self {
        Self {
            playlist_id,
            state: QueryState::new(),
        }
    }

    async fn delete(db: &dyn DatabaseAdapter, playlist_id: PlaylistId) -> Result<u64> {
        let params = [QueryValue::Integer(playlist_id.0)];
        db.execute("DELETE FROM playlist_tracks WHERE playlist_id = ?", &params)
            .await?;
        let affected = db
            .execute("DELETE FROM playlists WHERE id = ?", &params)
            .await?;
        Ok(affected)
    }
}

#[async_trait]
impl Query for DeletePlaylistQuery {
    fn name(&self) -> &'static str {
        "DeletePlaylistQuery"
    }

    fn state(&self) -> &QueryState {
        &self.state
    }

    async fn run(&self, db: &dyn DatabaseAdapter) -> Result<()> {
        let affected = transactional!(db, Self::delete(db, self.playlist_id))?;
        if affected == 0 {
            return Err(LibraryError::not_found("Playlist", self.playlist_id));
        }

        info!(playlist_id = %self.playlist_id, "Deleted playlist");
        Ok(())
    }
}

// =============================================================================
// Append
// =============================================================================

/// Insert track ids into an existing playlist at `offset`
///
/// A negative offset, or one at or past the end, appends. Otherwise entries
/// at or after `offset` move down to make room.
pub struct AppendPlaylistQuery {
    playlist_id: PlaylistId,
    track_ids: Vec<TrackId>,
    offset: i32,
    state: QueryState,
}

impl AppendPlaylistQuery {
    pub fn new(playlist_id: PlaylistId, track_ids: Vec<TrackId>, offset: i32) -> Self {
        Self {
            playlist_id,
            track_ids,
            offset,
            state: QueryState::new(),
        }
    }

    async fn append(&self, db: &dyn DatabaseAdapter) -> Result<i64> {
        ensure_playlist_exists(db, self.playlist_id).await?;

        let row = db
            .query_one(
                "SELECT COUNT(*) AS count FROM playlist_tracks WHERE playlist_id = ?",
                &[QueryValue::Integer(self.playlist_id.0)],
            )
            .await?;
        let count = get_column!(row, "count", i64);

        let offset = i64::from(self.offset);
        let start = if offset < 0 || offset >= count {
            count
        } else {
            db.execute(
                "UPDATE playlist_tracks SET sort_order = sort_order + ? \
                 WHERE playlist_id = ? AND sort_order >= ?",
                &[
                    QueryValue::Integer(self.track_ids.len() as i64),
                    QueryValue::Integer(self.playlist_id.0),
                    QueryValue::Integer(offset),
                ],
            )
            .await?;
            offset
        };

        insert_entries(db, self.playlist_id, &self.track_ids, start).await?;
        Ok(start)
    }
}

#[async_trait]
impl Query for AppendPlaylistQuery {
    fn name(&self) -> &'static str {
        "AppendPlaylistQuery"
    }

    fn state(&self) -> &QueryState {
        &self.state
    }

    async fn run(&self, db: &dyn DatabaseAdapter) -> Result<()> {
        let start = transactional!(db, self.append(db))?;
        info!(
            playlist_id = %self.playlist_id,
            tracks = self.track_ids.len(),
            at = start,
            "Appended to playlist"
        );
        Ok(())
    }
}
