//! # Library Data Access
//!
//! Owns the media library database and everything that reads or writes it.
//!
//! ## Overview
//!
//! This crate provides:
//! - Domain identifiers and records (`models`)
//! - Query units and the [`Library`] engine contract (`query`)
//! - The single-worker [`LocalLibrary`] engine over SQLite (`library`, `adapters`)
//! - The [`TrackList`]: ordered ids with an LRU cache of materialized tracks
//! - External id resolution (`resolver`)

pub mod adapters;
pub mod error;
pub mod library;
pub mod models;
pub mod query;
pub mod resolver;
pub mod track_list;

pub use error::{LibraryError, Result};
pub use library::LocalLibrary;
pub use models::{
    CategoryType, CategoryValue, MapList, MetadataMap, PlaylistId, Track, TrackId, ValueList,
    PLAYLISTS_CATEGORY,
};
pub use query::{run_to_completion, Library, Query, QueryMode, QueryState, QueryStatus};
pub use resolver::resolve_external_ids;
pub use track_list::{TrackIdList, TrackList, DEFAULT_CACHE_CAPACITY};
