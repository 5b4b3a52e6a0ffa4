//! Database adapter implementations
//!
//! This module contains the concrete implementation of the `DatabaseAdapter`
//! trait the library worker runs its queries against.

pub mod sqlite_native;

pub use sqlite_native::SqliteAdapter;
