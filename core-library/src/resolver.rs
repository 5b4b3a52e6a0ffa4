//! External id resolution
//!
//! Turns caller-supplied external ids into a [`TrackList`] of internal ids
//! with one batched lookup, so playlist operations taking external ids can
//! reuse the id-based path.

use crate::error::Result;
use crate::query::{run_to_completion, ExternalIdListToTrackListQuery, Library};
use crate::track_list::TrackList;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

/// Resolve `external_ids` to a track list
///
/// Unknown ids are dropped and the output order is whatever the store
/// returns. An empty input resolves to an empty list without touching the
/// library.
pub fn resolve_external_ids<S: AsRef<str>>(
    library: &Arc<dyn Library>,
    external_ids: &[S],
    capacity: NonZeroUsize,
) -> Result<TrackList> {
    if external_ids.is_empty() {
        return Ok(TrackList::with_capacity(Arc::clone(library), capacity));
    }

    let query = Arc::new(ExternalIdListToTrackListQuery::new(external_ids));
    run_to_completion(library.as_ref(), &query)?;

    let ids = query.take_result().unwrap_or_default();
    debug!(
        requested = external_ids.len(),
        resolved = ids.len(),
        "External ids resolved"
    );

    Ok(TrackList::from_ids(Arc::clone(library), ids, capacity))
}
