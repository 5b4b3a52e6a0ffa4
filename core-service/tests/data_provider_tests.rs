mod common;

use common::seeded_provider;
use core_runtime::config::CoreConfig;
use core_service::{PlaylistId, SimpleDataProvider, TrackId, TrackList};

fn ids(raw: &[i64]) -> Vec<TrackId> {
    raw.iter().copied().map(TrackId).collect()
}

fn playlist_ids(provider: &SimpleDataProvider, id: PlaylistId) -> Vec<TrackId> {
    provider
        .query_tracks_by_category("playlists", id.0, "", -1, 0)
        .expect("playlist readable")
        .ids()
        .to_vec()
}

fn playlist_names(provider: &SimpleDataProvider) -> Vec<String> {
    provider
        .query_category("playlists", "")
        .expect("playlists listed")
        .into_iter()
        .map(|value| value.value)
        .collect()
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_open_from_config() {
    let config = CoreConfig::builder()
        .in_memory()
        .track_cache_capacity(8)
        .worker_thread_name("provider-test-worker")
        .build()
        .unwrap();

    let provider = SimpleDataProvider::open(&config).unwrap();
    assert_eq!(provider.track_cache_capacity().get(), 8);

    let tracks = provider.query_tracks("", -1, 0).unwrap();
    assert!(tracks.is_empty());
    assert_eq!(tracks.capacity().get(), 8);
}

#[test]
fn test_open_rejects_unusable_database() {
    let config = CoreConfig::builder()
        .database_path("/nonexistent-provider-dir/nested/library.db")
        .build()
        .unwrap();

    assert!(SimpleDataProvider::open(&config).is_err());
}

// =============================================================================
// Track queries
// =============================================================================

#[test]
fn test_query_tracks() {
    let provider = seeded_provider();

    let all = provider.query_tracks("", -1, 0).unwrap();
    assert_eq!(all.ids(), ids(&[1, 2, 3, 4]).as_slice());

    let page = provider.query_tracks("", 2, 1).unwrap();
    assert_eq!(page.ids(), ids(&[2, 3]).as_slice());

    let matched = provider.query_tracks("tide", -1, 0).unwrap();
    assert_eq!(matched.ids(), ids(&[2]).as_slice());

    assert!(provider.query_tracks("nothing like this", -1, 0).unwrap().is_empty());
}

#[test]
fn test_returned_list_materializes_tracks() {
    let provider = seeded_provider();

    let mut list = provider.query_tracks("ridge", -1, 0).unwrap();
    assert_eq!(list.len(), 2);

    let first = list.get(0).unwrap();
    assert_eq!(first.title(), Some("Switchback"));
    assert_eq!(first.get("artist"), Some("The Ridge"));
}

#[test]
fn test_query_track_lookups() {
    let provider = seeded_provider();

    let by_id = provider.query_track_by_id(TrackId(4)).unwrap();
    assert_eq!(by_id.title(), Some("Summit"));
    assert_eq!(by_id.external_id(), Some("d"));

    let by_external = provider.query_track_by_external_id("b").unwrap();
    assert_eq!(by_external.id, TrackId(2));

    assert!(provider.query_track_by_id(TrackId(77)).is_none());
    assert!(provider.query_track_by_external_id("zz").is_none());
    assert!(provider.query_track_by_external_id("").is_none());
}

#[test]
fn test_query_tracks_by_category() {
    let provider = seeded_provider();

    let rock = provider
        .query_tracks_by_category("genre", 2, "", -1, 0)
        .unwrap();
    assert_eq!(rock.ids(), ids(&[3, 4]).as_slice());

    let filtered = provider
        .query_tracks_by_category("album", 1, "harbor", -1, 0)
        .unwrap();
    assert_eq!(filtered.ids(), ids(&[1]).as_slice());

    let paged = provider
        .query_tracks_by_category("artist", 2, "", 1, 1)
        .unwrap();
    assert_eq!(paged.ids(), ids(&[4]).as_slice());

    assert!(provider
        .query_tracks_by_category("composer", 1, "", -1, 0)
        .is_none());
}

// =============================================================================
// Listings
// =============================================================================

#[test]
fn test_query_category() {
    let provider = seeded_provider();

    let genres = provider.query_category("genre", "").unwrap();
    let names: Vec<_> = genres.iter().map(|value| value.value.as_str()).collect();
    assert_eq!(names, vec!["Ambient", "Rock"]);

    let artists = provider.query_category("artist", "ridge").unwrap();
    assert_eq!(artists.len(), 1);
    assert_eq!(artists[0].id, 2);
}

#[test]
fn test_query_albums() {
    let provider = seeded_provider();

    let albums = provider.query_albums("").unwrap();
    assert_eq!(albums.len(), 2);
    assert_eq!(albums[0].value, "Coastline");
    assert_eq!(albums[0].get("album_artist"), Some("Marlowe"));

    let by_artist = provider.query_albums_by_category("artist_id", 2, "").unwrap();
    assert_eq!(by_artist.len(), 1);
    assert_eq!(by_artist[0].value, "Mountain Pass");

    let filtered = provider.query_albums("coast").unwrap();
    assert_eq!(filtered.len(), 1);
}

// =============================================================================
// Playlists
// =============================================================================

#[test]
fn test_save_new_playlist_with_ids() {
    let provider = seeded_provider();

    let id = provider.save_playlist_with_ids(&ids(&[4, 1, 3]), "Road trip", PlaylistId::UNSAVED);
    assert!(id.is_saved());
    assert_eq!(playlist_ids(&provider, id), ids(&[4, 1, 3]));
    assert_eq!(playlist_names(&provider), vec!["Road trip"]);

    let albums = provider.query_albums_by_category("playlists", id.0, "").unwrap();
    assert_eq!(albums.len(), 2);
}

#[test]
fn test_save_with_external_ids_drops_unknown() {
    let provider = seeded_provider();

    let id = provider.save_playlist_with_external_ids(
        &["c", "missing", "a"],
        "Resolved",
        PlaylistId::UNSAVED,
    );
    assert!(id.is_saved());

    let mut saved = playlist_ids(&provider, id);
    saved.sort();
    assert_eq!(saved, ids(&[1, 3]));
}

#[test]
fn test_replace_and_rename_playlist() {
    let provider = seeded_provider();
    let id = provider.save_playlist_with_ids(&ids(&[1, 2]), "Draft", PlaylistId::UNSAVED);

    let same = provider.save_playlist_with_ids(&ids(&[3]), "", id);
    assert_eq!(same, id);
    assert_eq!(playlist_ids(&provider, id), ids(&[3]));
    assert_eq!(playlist_names(&provider), vec!["Draft"]);

    let renamed = provider.save_playlist_with_ids(&ids(&[4, 3]), "Final", id);
    assert_eq!(renamed, id);
    assert_eq!(playlist_ids(&provider, id), ids(&[4, 3]));
    assert_eq!(playlist_names(&provider), vec!["Final"]);
}

#[test]
fn test_save_with_track_list() {
    let provider = seeded_provider();

    let mut list: TrackList = provider.query_tracks("", -1, 0).unwrap();
    list.swap(0, 3).unwrap();

    let id = provider.save_playlist_with_track_list(&list, "Swapped", PlaylistId::UNSAVED);
    assert_eq!(playlist_ids(&provider, id), ids(&[4, 2, 3, 1]));
    assert_eq!(list.len(), 4);
}

#[test]
fn test_save_to_unknown_playlist_fails() {
    let provider = seeded_provider();

    let result = provider.save_playlist_with_ids(&ids(&[1]), "Ghost", PlaylistId(404));
    assert_eq!(result, PlaylistId::UNSAVED);
    assert!(playlist_names(&provider).is_empty());
}

#[test]
fn test_rename_playlist() {
    let provider = seeded_provider();
    let id = provider.save_playlist_with_ids(&ids(&[1]), "Before", PlaylistId::UNSAVED);

    assert!(provider.rename_playlist(id, "After"));
    assert_eq!(playlist_names(&provider), vec!["After"]);

    assert!(!provider.rename_playlist(id, ""));
    assert!(!provider.rename_playlist(PlaylistId(404), "Nobody"));
    assert_eq!(playlist_names(&provider), vec!["After"]);
}

#[test]
fn test_delete_playlist() {
    let provider = seeded_provider();
    let id = provider.save_playlist_with_ids(&ids(&[1, 2]), "Short lived", PlaylistId::UNSAVED);

    assert!(provider.delete_playlist(id));
    assert!(playlist_names(&provider).is_empty());
    assert!(playlist_ids(&provider, id).is_empty());

    assert!(!provider.delete_playlist(id));
}

#[test]
fn test_append_to_playlist() {
    let provider = seeded_provider();
    let id = provider.save_playlist_with_ids(&ids(&[1, 2]), "Growing", PlaylistId::UNSAVED);

    assert!(provider.append_to_playlist_with_ids(id, &ids(&[3]), -1));
    assert_eq!(playlist_ids(&provider, id), ids(&[1, 2, 3]));

    assert!(provider.append_to_playlist_with_ids(id, &ids(&[4]), 1));
    assert_eq!(playlist_ids(&provider, id), ids(&[1, 4, 2, 3]));

    assert!(provider.append_to_playlist_with_external_ids(id, &["b", "unknown"], 0));
    assert_eq!(playlist_ids(&provider, id), ids(&[2, 1, 4, 2, 3]));

    let list = provider.query_tracks("summit", -1, 0).unwrap();
    assert!(provider.append_to_playlist_with_track_list(id, &list, 100));
    assert_eq!(playlist_ids(&provider, id), ids(&[2, 1, 4, 2, 3, 4]));
}

#[test]
fn test_append_to_unknown_playlist_fails() {
    let provider = seeded_provider();
    assert!(!provider.append_to_playlist_with_ids(PlaylistId(404), &ids(&[1]), -1));
}

#[tokio::test]
async fn test_provider_from_blocking_task() {
    let titles = tokio::task::spawn_blocking(|| {
        let provider = seeded_provider();
        let mut list = provider.query_tracks("low", -1, 0).unwrap();
        list.get(0).unwrap().title().map(str::to_string)
    })
    .await
    .unwrap();

    assert_eq!(titles.as_deref(), Some("Low Tide"));
}
