//! Playlist persistence helpers
//!
//! Compose playlist query units into the save and append flows used by the
//! data provider. Both accept anything implementing [`TrackIdList`], so an
//! id slice, a resolved list and a caller-owned [`TrackList`](core_library::TrackList)
//! all take the same path.

use crate::error::{CoreError, Result};
use core_library::query::{AppendPlaylistQuery, SavePlaylistQuery};
use core_library::{run_to_completion, Library, LibraryError, PlaylistId, TrackIdList};
use std::sync::Arc;
use tracing::debug;

/// A name counts only when it has visible characters
pub(crate) fn has_name(name: &str) -> bool {
    !name.trim().is_empty()
}

/// Save `tracks` as a playlist
///
/// With a saved `playlist_id` the playlist's entries are replaced and, when
/// `name` is given, the playlist is renamed afterwards; the existing id comes
/// back only if both steps finished. Without one a new playlist called
/// `name` is created and its id returned.
pub fn save_playlist<L>(
    library: &dyn Library,
    tracks: &L,
    name: &str,
    playlist_id: PlaylistId,
) -> Result<PlaylistId>
where
    L: TrackIdList + ?Sized,
{
    let track_ids = tracks.to_track_ids();

    if playlist_id.is_saved() {
        let replace = Arc::new(SavePlaylistQuery::replace(playlist_id, track_ids));
        run_to_completion(library, &replace)?;

        if has_name(name) {
            let rename = Arc::new(SavePlaylistQuery::rename(playlist_id, name));
            run_to_completion(library, &rename)?;
        }

        debug!(playlist_id = %playlist_id, "Playlist replaced");
        return Ok(playlist_id);
    }

    let create = Arc::new(SavePlaylistQuery::create(name, track_ids));
    run_to_completion(library, &create)?;

    let created = create.take_result().ok_or_else(|| {
        CoreError::Library(LibraryError::Engine(
            "SavePlaylistQuery finished without a playlist id".to_string(),
        ))
    })?;

    debug!(playlist_id = %created, name, "Playlist created");
    Ok(created)
}

/// Insert `tracks` into an existing playlist at `offset`
///
/// A negative offset, or one past the end, appends.
pub fn append_to_playlist<L>(
    library: &dyn Library,
    playlist_id: PlaylistId,
    tracks: &L,
    offset: i32,
) -> Result<()>
where
    L: TrackIdList + ?Sized,
{
    let track_ids = tracks.to_track_ids();
    let count = track_ids.len();

    let query = Arc::new(AppendPlaylistQuery::new(playlist_id, track_ids, offset));
    run_to_completion(library, &query)?;

    debug!(playlist_id = %playlist_id, count, offset, "Tracks appended to playlist");
    Ok(())
}
