//! Page direction and starting-point resolution.

use tracing::debug;

use super::cursor::Cursor;
use crate::domain::{Filter, Record, RecordKey};
use crate::error::IndexError;
use crate::persistence::{KeysetPosition, OrdinalRange, RecordStore, SortOrder};

/// Direction a page is scanned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `count > 0`: from the top toward lower ordinals.
    Down,
    /// `count < 0`: from the bottom toward higher ordinals.
    Up,
}

impl Direction {
    /// Store sort order used for the scan.
    #[must_use]
    pub const fn sort_order(self) -> SortOrder {
        match self {
            Self::Down => SortOrder::Descending,
            Self::Up => SortOrder::Ascending,
        }
    }
}

/// Page size and direction decoded from a signed `count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Number of records wanted.
    pub size: usize,
    /// Scan direction.
    pub direction: Direction,
}

impl PageRequest {
    /// Decodes a signed page size.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidPageSize`] when `count` is zero.
    pub fn from_count(count: i32) -> Result<Self, IndexError> {
        let direction = match count {
            0 => return Err(IndexError::InvalidPageSize),
            c if c > 0 => Direction::Down,
            _ => Direction::Up,
        };
        let size = usize::try_from(count.unsigned_abs()).map_err(|_| IndexError::InvalidPageSize)?;
        Ok(Self { size, direction })
    }
}

/// Where a scan starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// The extreme of the filtered set in the scan direction, inclusive.
    Edge,
    /// Just past the cursor record, which is excluded.
    After(KeysetPosition),
}

/// Output of [`RangeResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRange {
    /// Scan direction.
    pub direction: Direction,
    /// Starting point.
    pub anchor: Anchor,
    /// Already known to touch the top.
    pub is_start: bool,
    /// Already known to touch the bottom.
    pub is_end: bool,
}

impl ResolvedRange {
    /// Keyset window handed to the store.
    #[must_use]
    pub fn scan_range(&self) -> OrdinalRange {
        let order = self.direction.sort_order();
        match &self.anchor {
            Anchor::Edge => OrdinalRange::unbounded(order),
            Anchor::After(position) => OrdinalRange::after(position.clone(), order),
        }
    }
}

/// Computes the starting position of a page.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeResolver;

impl RangeResolver {
    /// Resolves the start of a page.
    ///
    /// Without a cursor the page starts at the edge of the set, so the
    /// boundary flag of that edge is set right away. With a cursor the
    /// cursor record's ordinal is looked up within `filter`, and its key
    /// breaks ties with records sharing that ordinal.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::RecordNotFound`] if the cursor record no longer
    /// exists or no longer matches `filter`, or a storage error.
    pub async fn resolve<R: Record>(
        store: &dyn RecordStore<R>,
        filter: &Filter,
        cursor: Option<&Cursor<R>>,
        direction: Direction,
    ) -> Result<ResolvedRange, IndexError> {
        let Some(cursor) = cursor else {
            return Ok(ResolvedRange {
                direction,
                anchor: Anchor::Edge,
                is_start: direction == Direction::Down,
                is_end: direction == Direction::Up,
            });
        };
        let Some(ordinal) = store.ordinal_in(cursor.key(), filter).await? else {
            debug!(kind = %R::KIND, key = %cursor.key().encode(), "cursor no longer resolves");
            return Err(IndexError::not_found(R::KIND, cursor.key().encode()));
        };
        Ok(ResolvedRange {
            direction,
            anchor: Anchor::After(KeysetPosition {
                ordinal,
                pk: cursor.key().encode(),
            }),
            is_start: false,
            is_end: false,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Amount, Epoch, OrdinalIndex};
    use crate::persistence::MemoryStore;
    use chrono::Utc;

    #[test]
    fn count_sign_selects_direction() {
        let Ok(down) = PageRequest::from_count(5) else {
            panic!("positive count is valid");
        };
        assert_eq!(down.direction, Direction::Down);
        assert_eq!(down.size, 5);
        let Ok(up) = PageRequest::from_count(i32::MIN) else {
            panic!("negative count is valid");
        };
        assert_eq!(up.direction, Direction::Up);
        assert_eq!(up.size, 1 << 31);
        assert!(matches!(
            PageRequest::from_count(0),
            Err(IndexError::InvalidPageSize)
        ));
    }

    #[tokio::test]
    async fn no_cursor_sets_the_edge_flag() {
        let store = MemoryStore::<Epoch>::new();
        let Ok(down) = RangeResolver::resolve(&store, &Filter::all(), None, Direction::Down).await
        else {
            panic!("resolve should succeed");
        };
        assert!(down.is_start && !down.is_end);
        assert_eq!(down.scan_range(), OrdinalRange::unbounded(SortOrder::Descending));

        let Ok(up) = RangeResolver::resolve(&store, &Filter::all(), None, Direction::Up).await
        else {
            panic!("resolve should succeed");
        };
        assert!(up.is_end && !up.is_start);
    }

    #[tokio::test]
    async fn cursor_resolves_to_exclusive_bound() {
        let store = MemoryStore::<Epoch>::new();
        let epoch = Epoch::new(4, Utc::now(), Amount::ZERO, Amount::ZERO, Amount::ZERO);
        assert!(store.upsert(epoch).await.is_ok());

        let cursor = Cursor::<Epoch>::new(4);
        let Ok(range) =
            RangeResolver::resolve(&store, &Filter::all(), Some(&cursor), Direction::Up).await
        else {
            panic!("cursor should resolve");
        };
        let start = KeysetPosition {
            ordinal: OrdinalIndex::new(4),
            pk: "4".to_string(),
        };
        assert_eq!(range.anchor, Anchor::After(start.clone()));
        assert_eq!(
            range.scan_range(),
            OrdinalRange::after(start, SortOrder::Ascending)
        );
    }

    #[tokio::test]
    async fn filtered_out_cursor_is_not_found() {
        let store = MemoryStore::<Epoch>::new();
        let epoch = Epoch::new(4, Utc::now(), Amount::ZERO, Amount::ZERO, Amount::ZERO);
        assert!(store.upsert(epoch).await.is_ok());

        let filter = Filter::all().where_eq("id", 5u64);
        let cursor = Cursor::<Epoch>::new(4);
        let result = RangeResolver::resolve(&store, &filter, Some(&cursor), Direction::Down).await;
        assert!(matches!(result, Err(IndexError::RecordNotFound { .. })));

        let missing = Cursor::<Epoch>::new(9);
        let result =
            RangeResolver::resolve(&store, &Filter::all(), Some(&missing), Direction::Down).await;
        assert!(matches!(result, Err(IndexError::RecordNotFound { .. })));
    }
}
