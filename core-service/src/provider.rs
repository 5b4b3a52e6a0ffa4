//! # Simple Data Provider
//!
//! Blocking, best-effort façade over a [`Library`].
//!
//! Each operation builds the matching query unit, submits it synchronously
//! and hands back the typed result. Nothing crosses this boundary as an
//! error: a failed, rejected or panicking operation is logged with its name
//! and returns `None`, `false` or [`PlaylistId::UNSAVED`].
//!
//! Calls block the current thread until the library worker is done. Async
//! hosts should make them from `tokio::task::spawn_blocking`.

use crate::error::{CoreError, Result};
use crate::playlists::{append_to_playlist, has_name, save_playlist};
use core_library::query::{
    AlbumListQuery, CategoryListQuery, CategoryTrackListQuery, DeletePlaylistQuery,
    GetPlaylistQuery, LimitAndOffset, SavePlaylistQuery, SearchTrackListQuery, TrackMetadataQuery,
};
use core_library::{
    resolve_external_ids, run_to_completion, CategoryType, Library, LocalLibrary, MapList,
    PlaylistId, Track, TrackId, TrackList, ValueList,
};
use core_runtime::config::CoreConfig;
use std::fmt;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Synchronous query façade
pub struct SimpleDataProvider {
    library: Arc<dyn Library>,
    track_cache_capacity: NonZeroUsize,
}

impl SimpleDataProvider {
    /// Wrap an existing library
    ///
    /// Track lists returned by this provider cache up to
    /// `track_cache_capacity` materialized tracks each.
    pub fn new(library: Arc<dyn Library>, track_cache_capacity: NonZeroUsize) -> Self {
        Self {
            library,
            track_cache_capacity,
        }
    }

    /// Open the local library described by `config`
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or the database cannot be
    /// opened and migrated.
    pub fn open(config: &CoreConfig) -> Result<Self> {
        config.validate()?;

        let track_cache_capacity = NonZeroUsize::new(config.track_cache_capacity)
            .ok_or_else(|| {
                CoreError::InitializationFailed("Track cache capacity must be non-zero".to_string())
            })?;

        let library = LocalLibrary::open(config.database_config(), &config.worker_thread_name)?;
        info!(
            database = ?config.database,
            track_cache_capacity = track_cache_capacity.get(),
            "Data provider opened"
        );

        Ok(Self::new(Arc::new(library), track_cache_capacity))
    }

    pub fn library(&self) -> &Arc<dyn Library> {
        &self.library
    }

    pub fn track_cache_capacity(&self) -> NonZeroUsize {
        self.track_cache_capacity
    }

    fn track_list(&self, ids: Vec<TrackId>) -> TrackList {
        TrackList::from_ids(Arc::clone(&self.library), ids, self.track_cache_capacity)
    }

    // =========================================================================
    // Tracks
    // =========================================================================

    /// Tracks matching every whitespace-separated term of `text`
    ///
    /// A negative `limit` disables paging.
    #[instrument(level = "debug", skip(self))]
    pub fn query_tracks(&self, text: &str, limit: i32, offset: i32) -> Option<TrackList> {
        guard("query_tracks", || {
            let query = Arc::new(SearchTrackListQuery::new(
                text,
                LimitAndOffset::from_raw(limit, offset),
            ));
            run_to_completion(self.library.as_ref(), &query)?;

            Ok(query.take_result().map(|ids| self.track_list(ids)))
        })
    }

    #[instrument(level = "debug", skip(self))]
    pub fn query_track_by_id(&self, track_id: TrackId) -> Option<Track> {
        guard("query_track_by_id", || {
            let query = Arc::new(TrackMetadataQuery::by_id(track_id));
            run_to_completion(self.library.as_ref(), &query)?;
            Ok(query.take_result())
        })
    }

    /// An empty external id is answered with `None` without a lookup
    #[instrument(level = "debug", skip(self))]
    pub fn query_track_by_external_id(&self, external_id: &str) -> Option<Track> {
        if external_id.is_empty() {
            return None;
        }

        guard("query_track_by_external_id", || {
            let query = Arc::new(TrackMetadataQuery::by_external_id(external_id));
            run_to_completion(self.library.as_ref(), &query)?;
            Ok(query.take_result())
        })
    }

    /// Tracks belonging to one category value
    ///
    /// For the playlists category `selected_id` is a playlist id, the tracks
    /// come back in playlist order and `filter` is ignored.
    #[instrument(level = "debug", skip(self))]
    pub fn query_tracks_by_category(
        &self,
        category_type: &str,
        selected_id: i64,
        filter: &str,
        limit: i32,
        offset: i32,
    ) -> Option<TrackList> {
        guard("query_tracks_by_category", || {
            let limit = LimitAndOffset::from_raw(limit, offset);

            let ids = if CategoryType::from_name(category_type) == Some(CategoryType::Playlists) {
                let query = Arc::new(GetPlaylistQuery::new(PlaylistId(selected_id), limit));
                run_to_completion(self.library.as_ref(), &query)?;
                query.take_result()
            } else {
                let query = Arc::new(CategoryTrackListQuery::new(
                    category_type,
                    selected_id,
                    filter,
                    limit,
                )?);
                run_to_completion(self.library.as_ref(), &query)?;
                query.take_result()
            };

            Ok(ids.map(|ids| self.track_list(ids)))
        })
    }

    // =========================================================================
    // Listings
    // =========================================================================

    #[instrument(level = "debug", skip(self))]
    pub fn query_category(&self, category_type: &str, filter: &str) -> Option<ValueList> {
        guard("query_category", || {
            let query = Arc::new(CategoryListQuery::new(category_type, filter)?);
            run_to_completion(self.library.as_ref(), &query)?;
            Ok(query.take_result())
        })
    }

    /// Albums restricted to one category value
    ///
    /// An empty `category_id_name` lists every album.
    #[instrument(level = "debug", skip(self))]
    pub fn query_albums_by_category(
        &self,
        category_id_name: &str,
        category_id_value: i64,
        filter: &str,
    ) -> Option<MapList> {
        guard("query_albums", || {
            let query = Arc::new(AlbumListQuery::new(
                category_id_name,
                category_id_value,
                filter,
            )?);
            run_to_completion(self.library.as_ref(), &query)?;
            Ok(query.take_result())
        })
    }

    pub fn query_albums(&self, filter: &str) -> Option<MapList> {
        self.query_albums_by_category("", -1, filter)
    }

    // =========================================================================
    // Playlists
    // =========================================================================

    /// Save `track_ids` as a playlist
    ///
    /// A saved `playlist_id` replaces that playlist's entries and, with a
    /// non-empty `name`, renames it. Otherwise a new playlist called `name`
    /// is created. Returns the playlist id, or [`PlaylistId::UNSAVED`] when
    /// neither an id nor a name was given or any step failed.
    #[instrument(level = "debug", skip(self, track_ids), fields(count = track_ids.len()))]
    pub fn save_playlist_with_ids(
        &self,
        track_ids: &[TrackId],
        name: &str,
        playlist_id: PlaylistId,
    ) -> PlaylistId {
        if !is_addressable(name, playlist_id) {
            return PlaylistId::UNSAVED;
        }

        guard("save_playlist", || {
            save_playlist(self.library.as_ref(), track_ids, name, playlist_id)
        })
    }

    /// Like [`save_playlist_with_ids`](Self::save_playlist_with_ids), taking
    /// external ids; unknown ones are dropped
    #[instrument(level = "debug", skip(self, external_ids), fields(count = external_ids.len()))]
    pub fn save_playlist_with_external_ids<S: AsRef<str>>(
        &self,
        external_ids: &[S],
        name: &str,
        playlist_id: PlaylistId,
    ) -> PlaylistId {
        if !is_addressable(name, playlist_id) {
            return PlaylistId::UNSAVED;
        }

        guard("save_playlist", || {
            let tracks = resolve_external_ids(&self.library, external_ids, self.track_cache_capacity)?;
            save_playlist(self.library.as_ref(), &tracks, name, playlist_id)
        })
    }

    #[instrument(level = "debug", skip(self, tracks), fields(count = tracks.len()))]
    pub fn save_playlist_with_track_list(
        &self,
        tracks: &TrackList,
        name: &str,
        playlist_id: PlaylistId,
    ) -> PlaylistId {
        if !is_addressable(name, playlist_id) {
            return PlaylistId::UNSAVED;
        }

        guard("save_playlist", || {
            save_playlist(self.library.as_ref(), tracks, name, playlist_id)
        })
    }

    /// Renaming to an empty name is refused without touching the library
    #[instrument(level = "debug", skip(self))]
    pub fn rename_playlist(&self, playlist_id: PlaylistId, name: &str) -> bool {
        if !has_name(name) {
            return false;
        }

        guard("rename_playlist", || {
            let query = Arc::new(SavePlaylistQuery::rename(playlist_id, name));
            run_to_completion(self.library.as_ref(), &query)?;
            Ok(true)
        })
    }

    #[instrument(level = "debug", skip(self))]
    pub fn delete_playlist(&self, playlist_id: PlaylistId) -> bool {
        guard("delete_playlist", || {
            let query = Arc::new(DeletePlaylistQuery::new(playlist_id));
            run_to_completion(self.library.as_ref(), &query)?;
            Ok(true)
        })
    }

    /// Insert `track_ids` into a playlist at `offset`
    ///
    /// A negative offset, or one past the end, appends.
    #[instrument(level = "debug", skip(self, track_ids), fields(count = track_ids.len()))]
    pub fn append_to_playlist_with_ids(
        &self,
        playlist_id: PlaylistId,
        track_ids: &[TrackId],
        offset: i32,
    ) -> bool {
        guard("append_to_playlist", || {
            append_to_playlist(self.library.as_ref(), playlist_id, track_ids, offset)?;
            Ok(true)
        })
    }

    #[instrument(level = "debug", skip(self, external_ids), fields(count = external_ids.len()))]
    pub fn append_to_playlist_with_external_ids<S: AsRef<str>>(
        &self,
        playlist_id: PlaylistId,
        external_ids: &[S],
        offset: i32,
    ) -> bool {
        guard("append_to_playlist", || {
            let tracks = resolve_external_ids(&self.library, external_ids, self.track_cache_capacity)?;
            append_to_playlist(self.library.as_ref(), playlist_id, &tracks, offset)?;
            Ok(true)
        })
    }

    #[instrument(level = "debug", skip(self, tracks), fields(count = tracks.len()))]
    pub fn append_to_playlist_with_track_list(
        &self,
        playlist_id: PlaylistId,
        tracks: &TrackList,
        offset: i32,
    ) -> bool {
        guard("append_to_playlist", || {
            append_to_playlist(self.library.as_ref(), playlist_id, tracks, offset)?;
            Ok(true)
        })
    }
}

impl fmt::Debug for SimpleDataProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleDataProvider")
            .field("track_cache_capacity", &self.track_cache_capacity)
            .finish_non_exhaustive()
    }
}

/// A playlist save needs an existing id or a name to create one under
fn is_addressable(name: &str, playlist_id: PlaylistId) -> bool {
    playlist_id.is_saved() || has_name(name)
}

/// Run one façade operation, turning errors and panics into `T::default()`
fn guard<T, F>(operation: &'static str, f: F) -> T
where
    T: Default,
    F: FnOnce() -> Result<T>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            error!(operation, error = %e, "Data provider operation failed");
            T::default()
        }
        Err(_) => {
            error!(operation, "Data provider operation panicked");
            T::default()
        }
    }
}
