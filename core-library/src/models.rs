//! Domain models for the media library
//!
//! Identifiers are thin newtypes over the store's integer row ids; records
//! returned to callers are plain owned data detached from the worker that
//! produced them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// =============================================================================
// ID Types
// =============================================================================

/// Unique identifier for a track row
///
/// `0` and negative values never name a stored track.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TrackId(pub i64);

impl TrackId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Whether this id can refer to a stored track
    pub fn is_saved(&self) -> bool {
        self.0 > 0
    }
}

impl From<i64> for TrackId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a playlist
///
/// The default value (`0`) marks a playlist that has not been saved yet.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PlaylistId(pub i64);

impl PlaylistId {
    /// Sentinel for "not yet persisted"
    pub const UNSAVED: PlaylistId = PlaylistId(0);

    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn is_saved(&self) -> bool {
        self.0 != 0
    }
}

impl From<i64> for PlaylistId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Categories
// =============================================================================

/// Name of the category type that browses playlists
pub const PLAYLISTS_CATEGORY: &str = "playlists";

/// Browsable category types
///
/// Category names arrive as caller strings; only names known here are ever
/// turned into SQL identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryType {
    Album,
    Artist,
    AlbumArtist,
    Genre,
    Playlists,
}

impl CategoryType {
    pub const ALL: [CategoryType; 5] = [
        CategoryType::Album,
        CategoryType::Artist,
        CategoryType::AlbumArtist,
        CategoryType::Genre,
        CategoryType::Playlists,
    ];

    /// Parse a caller-supplied category name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "album" | "albums" => Some(CategoryType::Album),
            "artist" | "artists" => Some(CategoryType::Artist),
            "album_artist" | "album_artists" => Some(CategoryType::AlbumArtist),
            "genre" | "genres" => Some(CategoryType::Genre),
            PLAYLISTS_CATEGORY => Some(CategoryType::Playlists),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Album => "album",
            CategoryType::Artist => "artist",
            CategoryType::AlbumArtist => "album_artist",
            CategoryType::Genre => "genre",
            CategoryType::Playlists => PLAYLISTS_CATEGORY,
        }
    }

    /// Table holding the category's values
    pub(crate) fn table(&self) -> &'static str {
        match self {
            CategoryType::Album => "albums",
            CategoryType::Artist | CategoryType::AlbumArtist => "artists",
            CategoryType::Genre => "genres",
            CategoryType::Playlists => "playlists",
        }
    }

    /// Column on `tracks` referencing the category, if tracks reference it directly
    pub(crate) fn track_column(&self) -> Option<&'static str> {
        match self {
            CategoryType::Album => Some("album_id"),
            CategoryType::Artist => Some("artist_id"),
            CategoryType::AlbumArtist => Some("album_artist_id"),
            CategoryType::Genre => Some("genre_id"),
            CategoryType::Playlists => None,
        }
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Records
// =============================================================================

/// Well-known track field names
pub mod fields {
    pub const ID: &str = "id";
    pub const EXTERNAL_ID: &str = "external_id";
    pub const TITLE: &str = "title";
    pub const TRACK_NUM: &str = "track_num";
    pub const DISC_NUM: &str = "disc_num";
    pub const DURATION_MS: &str = "duration_ms";
    pub const YEAR: &str = "year";
    pub const FILENAME: &str = "filename";
    pub const ALBUM: &str = "album";
    pub const ALBUM_ID: &str = "album_id";
    pub const ARTIST: &str = "artist";
    pub const ARTIST_ID: &str = "artist_id";
    pub const ALBUM_ARTIST: &str = "album_artist";
    pub const ALBUM_ARTIST_ID: &str = "album_artist_id";
    pub const GENRE: &str = "genre";
    pub const GENRE_ID: &str = "genre_id";
}

/// A materialized track: its id plus metadata rendered as text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub fields: HashMap<String, String>,
}

impl Track {
    pub fn new(id: TrackId) -> Self {
        Self {
            id,
            fields: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn title(&self) -> Option<&str> {
        self.get(fields::TITLE)
    }

    pub fn external_id(&self) -> Option<&str> {
        self.get(fields::EXTERNAL_ID)
    }

    /// Parse a numeric field such as `year` or `duration_ms`
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.parse().ok())
    }
}

/// One value of a category (an artist, a genre, a playlist, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryValue {
    pub id: i64,
    pub value: String,
    pub kind: CategoryType,
}

/// Category values sorted by name
pub type ValueList = Vec<CategoryValue>;

/// A category value with additional named properties (used for albums)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataMap {
    pub id: i64,
    pub value: String,
    pub kind: CategoryType,
    pub fields: BTreeMap<String, String>,
}

impl MetadataMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

pub type MapList = Vec<MetadataMap>;
