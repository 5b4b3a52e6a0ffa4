//! Synchronous data provider over the local media library.
//!
//! Hosts open a [`SimpleDataProvider`] from a
//! [`CoreConfig`](core_runtime::config::CoreConfig) and call its blocking
//! operations: track search, category browsing, album listing and playlist
//! maintenance. Every operation is best-effort. Failures are logged and come
//! back as `None`, `false` or an unsaved playlist id instead of an error.
//!
//! ```no_run
//! use core_runtime::config::CoreConfig;
//! use core_service::SimpleDataProvider;
//!
//! # fn main() -> core_service::Result<()> {
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/library.db")
//!     .build()?;
//! let provider = SimpleDataProvider::open(&config)?;
//!
//! if let Some(tracks) = provider.query_tracks("night drive", 50, 0) {
//!     println!("{} matching tracks", tracks.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod playlists;
pub mod provider;

pub use error::{CoreError, Result};
pub use provider::SimpleDataProvider;

pub use core_library::{
    CategoryType, CategoryValue, MapList, MetadataMap, PlaylistId, Track, TrackId, TrackIdList,
    TrackList, ValueList,
};
