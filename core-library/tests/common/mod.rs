#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::database::DatabaseAdapter;
use core_library::query::{run_to_completion, Library, Query, QueryMode, QueryState};
use core_library::{LocalLibrary, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Runs raw SQL statements on the worker
pub struct SeedQuery {
    statements: Vec<String>,
    state: QueryState,
}

impl SeedQuery {
    pub fn new<S: Into<String>>(statements: impl IntoIterator<Item = S>) -> Self {
        Self {
            statements: statements.into_iter().map(Into::into).collect(),
            state: QueryState::new(),
        }
    }
}

#[async_trait]
impl Query for SeedQuery {
    fn name(&self) -> &'static str {
        "SeedQuery"
    }

    fn state(&self) -> &QueryState {
        &self.state
    }

    async fn run(&self, db: &dyn DatabaseAdapter) -> Result<()> {
        for statement in &self.statements {
            db.execute(statement, &[]).await?;
        }
        Ok(())
    }
}

/// Panics as soon as it runs
pub struct PanickingQuery {
    state: QueryState,
}

impl PanickingQuery {
    pub fn new() -> Self {
        Self {
            state: QueryState::new(),
        }
    }
}

#[async_trait]
impl Query for PanickingQuery {
    fn name(&self) -> &'static str {
        "PanickingQuery"
    }

    fn state(&self) -> &QueryState {
        &self.state
    }

    async fn run(&self, _db: &dyn DatabaseAdapter) -> Result<()> {
        panic!("query blew up");
    }
}

/// Opens a transaction, runs one statement, then leaves without committing
pub struct AbandonedTransactionQuery {
    statement: String,
    panics: bool,
    state: QueryState,
}

impl AbandonedTransactionQuery {
    /// Panics while the transaction is open
    pub fn panicking(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            panics: true,
            state: QueryState::new(),
        }
    }

    /// Returns `Ok` while the transaction is open
    pub fn returning(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            panics: false,
            state: QueryState::new(),
        }
    }
}

#[async_trait]
impl Query for AbandonedTransactionQuery {
    fn name(&self) -> &'static str {
        "AbandonedTransactionQuery"
    }

    fn state(&self) -> &QueryState {
        &self.state
    }

    async fn run(&self, db: &dyn DatabaseAdapter) -> Result<()> {
        db.begin_transaction().await?;
        db.execute(&self.statement, &[]).await?;
        if self.panics {
            panic!("query blew up inside a transaction");
        }
        Ok(())
    }
}

/// Makes any insert of track id 404 into a playlist abort
pub const REJECT_TRACK_404: &str = "CREATE TRIGGER reject_track_404 BEFORE INSERT ON playlist_tracks \
    WHEN NEW.track_id = 404 BEGIN SELECT RAISE(ABORT, 'track 404 rejected'); END";

/// Library fixture:
///
/// | id | external | title        | album (id)        | artist (id)           | genre (id)    |
/// |----|----------|--------------|-------------------|-----------------------|---------------|
/// | 1  | a        | Midnight Run | Neon Highways (1) | The Night Drivers (2) | Synthwave (1) |
/// | 2  | b        | City Lights  | Neon Highways (1) | The Night Drivers (2) | Synthwave (1) |
/// | 3  | c        | Slow Tide    | Blue Hour (2)     | Aurora Lane (1)       | Jazz (2)      |
/// | 4  | d        | Blue Hour    | Blue Hour (2)     | Aurora Lane (1)       | Jazz (2)      |
/// | 5  | e        | 100% Night   | Late Sessions (3) | Aurora Lane (1)       | Synthwave (1) |
pub const FIXTURE: &[&str] = &[
    "INSERT INTO artists (id, name) VALUES (1, 'Aurora Lane'), (2, 'The Night Drivers'), (3, 'Various Artists')",
    "INSERT INTO genres (id, name) VALUES (1, 'Synthwave'), (2, 'Jazz')",
    "INSERT INTO albums (id, name, album_artist_id) VALUES (1, 'Neon Highways', 2), (2, 'Blue Hour', 1), (3, 'Late Sessions', 3)",
    "INSERT INTO tracks (id, external_id, title, track_num, disc_num, duration_ms, year, filename, album_id, artist_id, album_artist_id, genre_id) VALUES \
        (1, 'a', 'Midnight Run', 2, 1, 241000, 2019, '/music/neon/01.flac', 1, 2, 2, 1), \
        (2, 'b', 'City Lights', 1, 1, 198000, 2019, '/music/neon/02.flac', 1, 2, 2, 1), \
        (3, 'c', 'Slow Tide', 1, 1, 305000, 2021, '/music/blue/01.flac', 2, 1, 1, 2), \
        (4, 'd', 'Blue Hour', 2, 1, 280000, 2021, '/music/blue/02.flac', 2, 1, 1, 2), \
        (5, 'e', '100% Night', 1, 1, 222000, 2022, '/music/late/01.flac', 3, 1, 3, 1)",
];

pub fn seeded_library() -> Arc<LocalLibrary> {
    let library = LocalLibrary::open_in_memory().expect("open in-memory library");
    let seed = Arc::new(SeedQuery::new(FIXTURE.iter().copied()));
    run_to_completion(&library, &seed).expect("seed fixture");
    Arc::new(library)
}

/// Delegates to another library, counting metadata lookups
pub struct CountingLibrary {
    inner: Arc<LocalLibrary>,
    metadata_queries: AtomicUsize,
}

impl CountingLibrary {
    pub fn new(inner: Arc<LocalLibrary>) -> Self {
        Self {
            inner,
            metadata_queries: AtomicUsize::new(0),
        }
    }

    pub fn metadata_queries(&self) -> usize {
        self.metadata_queries.load(Ordering::SeqCst)
    }
}

impl Library for CountingLibrary {
    fn enqueue(&self, query: Arc<dyn Query>, mode: QueryMode) -> Result<()> {
        if query.name() == "TrackMetadataQuery" {
            self.metadata_queries.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.enqueue(query, mode)
    }
}
