//! # Cached Track List
//!
//! An ordered list of track ids paired with a bounded LRU cache of the
//! tracks materialized for them.
//!
//! The id vector is authoritative for length, order and membership; the cache
//! is keyed by id and is only an optimization. Structural edits leave the
//! cache alone unless an id disappears from the list entirely, in which case
//! its cached track is dropped too.
//!
//! A `TrackList` is not synchronized. Share it across threads behind a lock.

use crate::error::{LibraryError, Result};
use crate::models::{Track, TrackId};
use crate::query::{run_to_completion, Library, TrackMetadataQuery};
use lru::LruCache;
use rand::seq::SliceRandom;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, error};

/// Default number of materialized tracks kept per list
pub const DEFAULT_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(50) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// Minimal read access to an ordered list of track ids
///
/// Playlist helpers accept anything implementing this, whether a
/// [`TrackList`] or a plain slice of ids.
pub trait TrackIdList {
    fn track_count(&self) -> usize;

    fn track_id_at(&self, index: usize) -> Option<TrackId>;

    /// Snapshot of every id in order
    fn to_track_ids(&self) -> Vec<TrackId> {
        (0..self.track_count())
            .filter_map(|index| self.track_id_at(index))
            .collect()
    }
}

impl TrackIdList for [TrackId] {
    fn track_count(&self) -> usize {
        self.len()
    }

    fn track_id_at(&self, index: usize) -> Option<TrackId> {
        self.get(index).copied()
    }

    fn to_track_ids(&self) -> Vec<TrackId> {
        self.to_vec()
    }
}

impl TrackIdList for Vec<TrackId> {
    fn track_count(&self) -> usize {
        self.len()
    }

    fn track_id_at(&self, index: usize) -> Option<TrackId> {
        self.get(index).copied()
    }

    fn to_track_ids(&self) -> Vec<TrackId> {
        self.clone()
    }
}

/// Ordered track ids with lazily materialized, LRU-cached tracks
pub struct TrackList {
    library: Arc<dyn Library>,
    ids: Vec<TrackId>,
    cache: LruCache<TrackId, Arc<Track>>,
}

impl TrackList {
    pub fn new(library: Arc<dyn Library>) -> Self {
        Self::with_capacity(library, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(library: Arc<dyn Library>, capacity: NonZeroUsize) -> Self {
        Self {
            library,
            ids: Vec::new(),
            cache: LruCache::new(capacity),
        }
    }

    pub fn from_ids(library: Arc<dyn Library>, ids: Vec<TrackId>, capacity: NonZeroUsize) -> Self {
        Self {
            library,
            ids,
            cache: LruCache::new(capacity),
        }
    }

    /// Number of ids in the list, duplicates included
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[TrackId] {
        &self.ids
    }

    fn out_of_range(&self, index: usize) -> LibraryError {
        error!(index, len = self.ids.len(), "Track list index out of range");
        LibraryError::OutOfRange {
            index,
            len: self.ids.len(),
        }
    }

    /// Track at `index`, materialized on a cache miss
    ///
    /// A hit promotes the entry to most recently used. A miss runs a
    /// synchronous metadata lookup; if that fails the error is returned and
    /// nothing is cached.
    pub fn get(&mut self, index: usize) -> Result<Arc<Track>> {
        let id = self.get_id(index)?;

        if let Some(track) = self.cache.get(&id) {
            return Ok(Arc::clone(track));
        }

        let query = Arc::new(TrackMetadataQuery::by_id(id));
        run_to_completion(self.library.as_ref(), &query)?;
        let track = query.take_result().map(Arc::new).ok_or_else(|| {
            LibraryError::Engine("TrackMetadataQuery finished without a result".to_string())
        })?;

        if let Some((evicted, _)) = self.cache.push(id, Arc::clone(&track)) {
            if evicted != id {
                debug!(evicted = %evicted, "Evicted track from cache");
            }
        }

        Ok(track)
    }

    /// Id at `index`; never touches the cache
    pub fn get_id(&self, index: usize) -> Result<TrackId> {
        self.ids
            .get(index)
            .copied()
            .ok_or_else(|| self.out_of_range(index))
    }

    /// Position of the first occurrence of `id`
    pub fn index_of(&self, id: TrackId) -> Option<usize> {
        self.ids.iter().position(|candidate| *candidate == id)
    }

    pub fn add(&mut self, id: TrackId) {
        self.ids.push(id);
    }

    /// Insert `id` before `index`; `index == len` appends
    pub fn insert(&mut self, id: TrackId, index: usize) -> Result<()> {
        if index > self.ids.len() {
            return Err(self.out_of_range(index));
        }
        self.ids.insert(index, id);
        Ok(())
    }

    /// Remove the id at `index`, purging its cached track when no other
    /// position still holds it
    pub fn delete(&mut self, index: usize) -> Result<TrackId> {
        if index >= self.ids.len() {
            return Err(self.out_of_range(index));
        }

        let id = self.ids.remove(index);
        if !self.ids.contains(&id) {
            self.cache.pop(&id);
        }
        Ok(id)
    }

    pub fn swap(&mut self, first: usize, second: usize) -> Result<()> {
        let len = self.ids.len();
        if first >= len {
            return Err(self.out_of_range(first));
        }
        if second >= len {
            return Err(self.out_of_range(second));
        }
        self.ids.swap(first, second);
        Ok(())
    }

    /// Move the id at `from` so it ends up at `to`
    pub fn move_track(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.ids.len();
        if from >= len {
            return Err(self.out_of_range(from));
        }
        if to >= len {
            return Err(self.out_of_range(to));
        }
        if from != to {
            let id = self.ids.remove(from);
            self.ids.insert(to, id);
        }
        Ok(())
    }

    /// Uniformly permute the ids in place
    pub fn shuffle(&mut self) {
        self.ids.shuffle(&mut rand::rng());
    }

    /// Remove every id and every cached track
    pub fn clear(&mut self) {
        self.ids.clear();
        self.cache.clear();
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Replace this list's ids with a copy of `other`'s
    pub fn copy_from(&mut self, other: &TrackList) {
        self.clear();
        self.ids.extend_from_slice(&other.ids);
    }

    /// Exchange contents, caches included, with `other`
    pub fn swap_with(&mut self, other: &mut TrackList) {
        std::mem::swap(&mut self.library, &mut other.library);
        std::mem::swap(&mut self.ids, &mut other.ids);
        std::mem::swap(&mut self.cache, &mut other.cache);
    }

    /// Whether `id` is cached; does not count as a use
    pub fn is_cached(&self, id: TrackId) -> bool {
        self.cache.contains(&id)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.cache.cap()
    }
}

impl TrackIdList for TrackList {
    fn track_count(&self) -> usize {
        self.ids.len()
    }

    fn track_id_at(&self, index: usize) -> Option<TrackId> {
        self.ids.get(index).copied()
    }

    fn to_track_ids(&self) -> Vec<TrackId> {
        self.ids.clone()
    }
}

impl fmt::Debug for TrackList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackList")
            .field("ids", &self.ids)
            .field("cached", &self.cache.len())
            .field("capacity", &self.cache.cap())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Query, QueryMode};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Refuses every query
    struct UnavailableLibrary {
        submitted: AtomicUsize,
    }

    impl Library for UnavailableLibrary {
        fn enqueue(&self, _query: Arc<dyn Query>, _mode: QueryMode) -> Result<()> {
            self.submitted.fetch_add(1, Ordering::SeqCst);
            Err(LibraryError::Engine("unavailable".to_string()))
        }
    }

    fn library() -> Arc<UnavailableLibrary> {
        Arc::new(UnavailableLibrary {
            submitted: AtomicUsize::new(0),
        })
    }

    fn list_of(ids: &[i64]) -> TrackList {
        TrackList::from_ids(
            library(),
            ids.iter().copied().map(TrackId).collect(),
            DEFAULT_CACHE_CAPACITY,
        )
    }

    fn raw_ids(list: &TrackList) -> Vec<i64> {
        list.ids().iter().map(|id| id.0).collect()
    }

    #[test]
    fn test_new_list_is_empty() {
        let list = TrackList::new(library());
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert_eq!(list.capacity(), DEFAULT_CACHE_CAPACITY);
        assert_eq!(list.cached_len(), 0);
    }

    #[test]
    fn test_add_insert_and_index_of() {
        let mut list = list_of(&[10, 20]);
        list.add(TrackId(30));
        list.insert(TrackId(5), 0).unwrap();
        list.insert(TrackId(40), 4).unwrap();
        list.insert(TrackId(20), 2).unwrap();

        assert_eq!(raw_ids(&list), vec![5, 10, 20, 20, 30, 40]);
        assert_eq!(list.index_of(TrackId(20)), Some(2));
        assert_eq!(list.index_of(TrackId(99)), None);
        assert_eq!(list.get_id(5).unwrap(), TrackId(40));
    }

    #[test]
    fn test_out_of_range_leaves_list_unchanged() {
        let mut list = list_of(&[1, 2, 3]);

        assert!(matches!(
            list.get_id(3),
            Err(LibraryError::OutOfRange { index: 3, len: 3 })
        ));
        assert!(matches!(list.get(3), Err(LibraryError::OutOfRange { .. })));
        assert!(list.insert(TrackId(9), 4).is_err());
        assert!(list.delete(3).is_err());
        assert!(list.swap(0, 3).is_err());
        assert!(list.swap(3, 0).is_err());
        assert!(list.move_track(3, 0).is_err());
        assert!(list.move_track(0, 3).is_err());

        assert_eq!(raw_ids(&list), vec![1, 2, 3]);
    }

    #[test]
    fn test_swap_and_move() {
        let mut list = list_of(&[1, 2, 3, 4]);
        list.swap(0, 3).unwrap();
        assert_eq!(raw_ids(&list), vec![4, 2, 3, 1]);

        list.move_track(0, 2).unwrap();
        assert_eq!(raw_ids(&list), vec![2, 3, 4, 1]);

        list.move_track(3, 0).unwrap();
        assert_eq!(raw_ids(&list), vec![1, 2, 3, 4]);

        list.move_track(1, 1).unwrap();
        assert_eq!(raw_ids(&list), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_get_failure_caches_nothing() {
        let engine = library();
        let mut list = TrackList::from_ids(engine.clone(), vec![TrackId(7)], DEFAULT_CACHE_CAPACITY);

        assert!(matches!(list.get(0), Err(LibraryError::Engine(_))));
        assert_eq!(engine.submitted.load(Ordering::SeqCst), 1);
        assert!(!list.is_cached(TrackId(7)));
        assert_eq!(list.cached_len(), 0);
    }

    #[test]
    fn test_clear_and_copy_from() {
        let mut source = list_of(&[1, 2, 3]);
        let mut target = list_of(&[9]);

        target.copy_from(&source);
        assert_eq!(raw_ids(&target), vec![1, 2, 3]);
        assert_eq!(raw_ids(&source), vec![1, 2, 3]);

        source.clear();
        assert!(source.is_empty());
        assert_eq!(raw_ids(&target), vec![1, 2, 3]);
    }

    #[test]
    fn test_swap_with_exchanges_contents() {
        let mut first = list_of(&[1, 2]);
        let mut second = TrackList::from_ids(
            library(),
            vec![TrackId(3)],
            NonZeroUsize::new(5).unwrap(),
        );

        first.swap_with(&mut second);
        assert_eq!(raw_ids(&first), vec![3]);
        assert_eq!(first.capacity().get(), 5);
        assert_eq!(raw_ids(&second), vec![1, 2]);
        assert_eq!(second.capacity(), DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn test_shuffle_preserves_multiset() {
        let original: Vec<i64> = (1..=8).chain([3, 3]).collect();
        let mut list = list_of(&original);
        let mut seen = HashSet::new();

        for _ in 0..50 {
            list.shuffle();
            let mut shuffled = raw_ids(&list);
            seen.insert(shuffled.clone());

            shuffled.sort_unstable();
            let mut expected = original.clone();
            expected.sort_unstable();
            assert_eq!(shuffled, expected);
        }

        assert!(seen.len() > 1, "shuffle never produced a new ordering");
    }

    #[test]
    fn test_track_id_list_implementations() {
        let list = list_of(&[4, 5]);
        let ids = vec![TrackId(4), TrackId(5)];

        assert_eq!(list.to_track_ids(), ids);
        assert_eq!(ids.track_count(), 2);
        assert_eq!(ids.as_slice().track_id_at(1), Some(TrackId(5)));
        assert_eq!(ids.as_slice().track_id_at(2), None);
    }

    #[test]
    fn test_random_edits_match_model() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut list = list_of(&[]);
        let mut model: Vec<TrackId> = Vec::new();

        for _ in 0..2_000 {
            let len = model.len();
            // Indices may run one past the valid range to exercise rejections.
            let index = rng.random_range(0..=len + 1);
            let other = rng.random_range(0..=len + 1);
            let id = TrackId(rng.random_range(1..20));

            match rng.random_range(0..4) {
                0 => {
                    let result = list.insert(id, index);
                    if index <= len {
                        assert!(result.is_ok());
                        model.insert(index, id);
                    } else {
                        assert!(result.is_err());
                    }
                }
                1 => {
                    let result = list.delete(index);
                    if index < len {
                        assert_eq!(result.unwrap(), model.remove(index));
                    } else {
                        assert!(result.is_err());
                    }
                }
                2 => {
                    let result = list.swap(index, other);
                    if index < len && other < len {
                        assert!(result.is_ok());
                        model.swap(index, other);
                    } else {
                        assert!(result.is_err());
                    }
                }
                _ => {
                    let result = list.move_track(index, other);
                    if index < len && other < len {
                        assert!(result.is_ok());
                        let moved = model.remove(index);
                        model.insert(other, moved);
                    } else {
                        assert!(result.is_err());
                    }
                }
            }

            assert_eq!(list.len(), model.len());
            for (i, expected) in model.iter().enumerate() {
                assert_eq!(list.get_id(i).unwrap(), *expected);
            }
        }
    }
}
