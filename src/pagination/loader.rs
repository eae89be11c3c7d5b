//! Bounded, filtered, ordinal-sorted page loading.

use tracing::trace;

use super::list_result::ListResult;
use super::range::{Direction, ResolvedRange};
use crate::domain::{Filter, Record};
use crate::error::IndexError;
use crate::persistence::RecordStore;

/// Executes the windowed scan of a page.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListLoader;

impl ListLoader {
    /// Loads `size` records starting at `range`.
    ///
    /// One extra record is requested: getting fewer than `size + 1` back
    /// means the filtered set is exhausted in the scan direction. The probe
    /// record is dropped before the page is returned. `total` comes from an
    /// independent count over `filter` and may be stale relative to the
    /// window under concurrent ingestion.
    ///
    /// # Errors
    ///
    /// Propagates store errors unchanged.
    pub async fn load<R: Record>(
        store: &dyn RecordStore<R>,
        filter: Filter,
        range: &ResolvedRange,
        size: usize,
    ) -> Result<ListResult<R>, IndexError> {
        let probe = size.saturating_add(1);
        let (mut rows, total) = tokio::try_join!(
            store.scan(&filter, range.scan_range(), probe),
            store.count(&filter),
        )?;
        let exhausted = rows.len() < probe;
        rows.truncate(size);
        trace!(kind = %R::KIND, returned = rows.len(), exhausted, "page scanned");

        let mut page = ListResult::new(rows, total, filter);
        page.is_start = range.is_start;
        page.is_end = range.is_end;
        match range.direction {
            Direction::Down => page.is_end |= exhausted,
            Direction::Up => {
                page.is_start |= exhausted;
                page.reverse();
            }
        }
        Ok(page)
    }
}
