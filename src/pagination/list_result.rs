//! The uniform page container returned by every listing.

use serde::Serialize;

use super::cursor::Cursor;
use crate::domain::{Filter, OrdinalIndex, Record};

/// One page of a filtered, ordinal-ordered listing.
///
/// `collection` is presented top-first (highest ordinal first) whichever
/// direction the page was scanned in, so `first` is the top ordinal of
/// the page and `last` the bottom one.
#[derive(Debug, Clone, Serialize)]
pub struct ListResult<R> {
    /// Records of the page.
    pub collection: Vec<R>,
    /// Number of records matching `filter`, independent of the window.
    pub total: u64,
    /// Ordinal of the first record of the page.
    pub first: Option<OrdinalIndex>,
    /// Ordinal of the last record of the page.
    pub last: Option<OrdinalIndex>,
    /// Nothing exists above this page.
    pub is_start: bool,
    /// Nothing exists below this page.
    pub is_end: bool,
    /// Filter the page was scoped by.
    pub filter: Filter,
}

impl<R: Record> ListResult<R> {
    /// Builds a page from its records, deriving `first` and `last`.
    #[must_use]
    pub fn new(collection: Vec<R>, total: u64, filter: Filter) -> Self {
        let first = collection.first().map(Record::ordinal);
        let last = collection.last().map(Record::ordinal);
        Self {
            collection,
            total,
            first,
            last,
            is_start: false,
            is_end: false,
            filter,
        }
    }

    /// Reverses the collection in place and swaps `first` and `last`.
    pub fn reverse(&mut self) {
        self.collection.reverse();
        std::mem::swap(&mut self.first, &mut self.last);
    }

    /// Cursor for the page above this one (list with `count < 0`).
    #[must_use]
    pub fn first_cursor(&self) -> Option<Cursor<R>> {
        self.collection.first().map(Cursor::of)
    }

    /// Cursor for the page below this one (list with `count > 0`).
    #[must_use]
    pub fn last_cursor(&self) -> Option<Cursor<R>> {
        self.collection.last().map(Cursor::of)
    }

    /// Number of records in the page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.collection.len()
    }

    /// Returns `true` if the page holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Amount, Epoch};
    use chrono::Utc;

    fn epoch(id: u64) -> Epoch {
        Epoch::new(id, Utc::now(), Amount::ZERO, Amount::ZERO, Amount::ZERO)
    }

    #[test]
    fn reverse_swaps_boundaries() {
        let mut page = ListResult::new(vec![epoch(1), epoch(2), epoch(3)], 3, Filter::all());
        assert_eq!(page.first, Some(OrdinalIndex::new(1)));
        page.reverse();
        assert_eq!(page.first, Some(OrdinalIndex::new(3)));
        assert_eq!(page.last, Some(OrdinalIndex::new(1)));
        assert_eq!(page.first_cursor().map(|c| *c.key()), Some(3));
        assert_eq!(page.last_cursor().map(|c| *c.key()), Some(1));
    }

    #[test]
    fn empty_page_has_no_cursors() {
        let page = ListResult::<Epoch>::new(Vec::new(), 0, Filter::all());
        assert!(page.is_empty());
        assert!(page.first.is_none() && page.last_cursor().is_none());
    }
}
