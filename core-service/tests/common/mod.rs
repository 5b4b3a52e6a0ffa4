#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::database::DatabaseAdapter;
use core_library::query::{run_to_completion, Query, QueryState};
use core_library::{LocalLibrary, Result, DEFAULT_CACHE_CAPACITY};
use core_service::SimpleDataProvider;
use std::sync::Arc;

struct SeedQuery {
    statements: &'static [&'static str],
    state: QueryState,
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
        for statement in self.statements {
            db.execute(statement, &[]).await?;
        }
        Ok(())
    }
}

/// Two albums, four tracks:
///
/// | id | external | title        | album             | artist            | genre     |
/// |----|----------|--------------|-------------------|-------------------|-----------|
/// | 1  | a        | Harbor Lights | Coastline (1)    | Marlowe (1)       | Ambient   |
/// | 2  | b        | Low Tide     | Coastline (1)     | Marlowe (1)       | Ambient   |
/// | 3  | c        | Switchback   | Mountain Pass (2) | The Ridge (2)     | Rock      |
/// | 4  | d        | Summit       | Mountain Pass (2) | The Ridge (2)     | Rock      |
pub const FIXTURE: &[&str] = &[
    "INSERT INTO artists (id, name) VALUES (1, 'Marlowe'), (2, 'The Ridge')",
    "INSERT INTO genres (id, name) VALUES (1, 'Ambient'), (2, 'Rock')",
    "INSERT INTO albums (id, name, album_artist_id) VALUES (1, 'Coastline', 1), (2, 'Mountain Pass', 2)",
    "INSERT INTO tracks (id, external_id, title, track_num, disc_num, duration_ms, album_id, artist_id, album_artist_id, genre_id) VALUES \
        (1, 'a', 'Harbor Lights', 1, 1, 200000, 1, 1, 1, 1), \
        (2, 'b', 'Low Tide', 2, 1, 210000, 1, 1, 1, 1), \
        (3, 'c', 'Switchback', 1, 1, 190000, 2, 2, 2, 2), \
        (4, 'd', 'Summit', 2, 1, 250000, 2, 2, 2, 2)",
];

pub fn seeded_provider() -> SimpleDataProvider {
    let library = LocalLibrary::open_in_memory().expect("open in-memory library");
    let seed = Arc::new(SeedQuery {
        statements: FIXTURE,
        state: QueryState::new(),
    });
    run_to_completion(&library, &seed).expect("seed fixture");

    SimpleDataProvider::new(Arc::new(library), DEFAULT_CACHE_CAPACITY)
}
