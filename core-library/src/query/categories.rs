//! Category value and album listings

use super::{normalize_filter, push_term_filter, Query, QueryState, ResultCell};
use crate::error::{LibraryError, Result};
use crate::models::{CategoryType, CategoryValue, MapList, MetadataMap, ValueList};
use async_trait::async_trait;
use bridge_traits::database::{DatabaseAdapter, QueryValue};
use bridge_traits::get_column;
use std::collections::BTreeMap;
use tracing::debug;

/// Values of one category type sorted by name
///
/// Only values referenced by at least one track are listed, except for
/// playlists, which are listed even when empty.
pub struct CategoryListQuery {
    category: CategoryType,
    filter: Option<String>,
    state: QueryState,
    result: ResultCell<ValueList>,
}

impl CategoryListQuery {
    /// # Errors
    ///
    /// `InvalidInput` for unknown category names.
    pub fn new(category: &str, filter: &str) -> Result<Self> {
        let category = CategoryType::from_name(category).ok_or_else(|| {
            LibraryError::invalid_input("category", format!("unknown category '{}'", category))
        })?;

        Ok(Self {
            category,
            filter: normalize_filter(filter),
            state: QueryState::new(),
            result: ResultCell::new(),
        })
    }

    pub fn take_result(&self) -> Option<ValueList> {
        self.result.take()
    }
}

#[async_trait]
impl Query for CategoryListQuery {
    fn name(&self) -> &'static str {
        "CategoryListQuery"
    }

    fn state(&self) -> &QueryState {
        &self.state
    }

    async fn run(&self, db: &dyn DatabaseAdapter) -> Result<()> {
        let table = self.category.table();
        let mut sql = match self.category.track_column() {
            Some(column) => format!(
                "SELECT DISTINCT c.id AS id, c.name AS value FROM {} c \
                 JOIN tracks t ON t.{} = c.id WHERE 1 = 1",
                table, column
            ),
            None => format!(
                "SELECT c.id AS id, c.name AS value FROM {} c WHERE 1 = 1",
                table
            ),
        };
        let mut params = Vec::new();

        if let Some(filter) = &self.filter {
            push_term_filter(&mut sql, &mut params, &["c.name"], filter);
        }
        sql.push_str(" ORDER BY c.name COLLATE NOCASE, c.id");

        let rows = db.query(&sql, &params).await?;
        let mut values = ValueList::with_capacity(rows.len());
        for row in &rows {
            values.push(CategoryValue {
                id: get_column!(row, "id", i64),
                value: get_column!(row, "value", String),
                kind: self.category,
            });
        }

        debug!(category = %self.category, count = values.len(), "Listed category values");
        self.result.put(values);
        Ok(())
    }
}

/// Albums, optionally restricted to one category value and a name filter
///
/// Each entry carries the album artist (`album_artist_id`, `album_artist`)
/// when the album has one.
pub struct AlbumListQuery {
    restriction: Option<(CategoryType, i64)>,
    filter: Option<String>,
    state: QueryState,
    result: ResultCell<MapList>,
}

impl AlbumListQuery {
    /// `category` may be empty (all albums), a category name such as
    /// `"artist"`, or the matching id column name such as `"artist_id"`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for names that match no category.
    pub fn new(category: &str, category_id: i64, filter: &str) -> Result<Self> {
        let name = category.trim();
        let restriction = if name.is_empty() {
            None
        } else {
            let base = name.strip_suffix("_id").unwrap_or(name);
            let kind = CategoryType::from_name(base).ok_or_else(|| {
                LibraryError::invalid_input("category", format!("unknown category '{}'", name))
            })?;
            Some((kind, category_id))
        };

        Ok(Self {
            restriction,
            filter: normalize_filter(filter),
            state: QueryState::new(),
            result: ResultCell::new(),
        })
    }

    pub fn take_result(&self) -> Option<MapList> {
        self.result.take()
    }
}

#[async_trait]
impl Query for AlbumListQuery {
    fn name(&self) -> &'static str {
        "AlbumListQuery"
    }

    fn state(&self) -> &QueryState {
        &self.state
    }

    async fn run(&self, db: &dyn DatabaseAdapter) -> Result<()> {
        let mut sql = String::from(
            "SELECT DISTINCT al.id AS id, al.name AS value, \
             al.album_artist_id AS album_artist_id, aa.name AS album_artist \
             FROM albums al \
             JOIN tracks t ON t.album_id = al.id \
             LEFT JOIN artists aa ON aa.id = al.album_artist_id \
             WHERE 1 = 1",
        );
        let mut params = Vec::new();

        match self.restriction {
            Some((CategoryType::Playlists, playlist_id)) => {
                sql.push_str(
                    " AND t.id IN (SELECT track_id FROM playlist_tracks WHERE playlist_id = ?)",
                );
                params.push(QueryValue::Integer(playlist_id));
            }
            Some((kind, id)) => {
                if let Some(column) = kind.track_column() {
                    sql.push_str(&format!(" AND t.{} = ?", column));
                    params.push(QueryValue::Integer(id));
                }
            }
            None => {}
        }

        if let Some(filter) = &self.filter {
            push_term_filter(&mut sql, &mut params, &["al.name", "aa.name"], filter);
        }
        sql.push_str(" ORDER BY al.name COLLATE NOCASE, al.id");

        let rows = db.query(&sql, &params).await?;
        let mut albums = MapList::with_capacity(rows.len());
        for row in &rows {
            let mut fields = BTreeMap::new();
            if let Some(artist_id) = get_column!(row, "album_artist_id", Option<i64>) {
                fields.insert("album_artist_id".to_string(), artist_id.to_string());
            }
            if let Some(artist) = get_column!(row, "album_artist", Option<String>) {
                fields.insert("album_artist".to_string(), artist);
            }

            albums.push(MetadataMap {
                id: get_column!(row, "id", i64),
                value: get_column!(row, "value", String),
                kind: CategoryType::Album,
                fields,
            });
        }

        debug!(count = albums.len(), "Listed albums");
        self.result.put(albums);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_album_restriction_parsing() {
        let all = AlbumListQuery::new("", -1, "").unwrap();
        assert!(all.restriction.is_none());

        let by_artist = AlbumListQuery::new("artist_id", 4, "").unwrap();
        assert_eq!(by_artist.restriction, Some((CategoryType::Artist, 4)));

        let by_genre = AlbumListQuery::new("genre", 2, "").unwrap();
        assert_eq!(by_genre.restriction, Some((CategoryType::Genre, 2)));

        assert!(AlbumListQuery::new("mood", 1, "").is_err());
    }

    #[test]
    fn test_category_list_rejects_unknown_type() {
        assert!(CategoryListQuery::new("composer", "").is_err());
        assert!(CategoryListQuery::new("genre", "").is_ok());
    }
}
