//! Optional read-through cache in front of a record store.
//!
//! Holds two views of the same record type:
//!
//! - a keyed map for point lookups, bounded with FIFO eviction, and
//! - a ring of the most recent records (highest ordinals), kept in
//!   descending order, together with a hint of the unfiltered total.
//!
//! The ring only answers "latest N, no cursor, no filter" pages, and only
//! when it holds more than N records, so such a page is never the bottom
//! of the set. Everything else falls through to the store.
//!
//! The cache is only kept current by writes made through the owning
//! [`ListEngine`](crate::pagination::ListEngine), so it is only coherent
//! while that engine is the sole writer of its store.

use std::collections::{HashMap, VecDeque};

use tokio::sync::RwLock;

use crate::domain::{Record, RecordKey};
use crate::persistence::KeysetPosition;

#[derive(Debug)]
struct CacheState<R: Record> {
    records: HashMap<R::Key, R>,
    insertion: VecDeque<R::Key>,
    recent: Vec<R>,
    total: Option<u64>,
}

/// Bounded record cache with a recent-items ring.
#[derive(Debug)]
pub struct RecordCache<R: Record> {
    state: RwLock<CacheState<R>>,
    record_capacity: usize,
    ring_capacity: usize,
}

impl<R: Record> RecordCache<R> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(record_capacity: usize, ring_capacity: usize) -> Self {
        Self {
            state: RwLock::new(CacheState {
                records: HashMap::new(),
                insertion: VecDeque::new(),
                recent: Vec::new(),
                total: None,
            }),
            record_capacity,
            ring_capacity,
        }
    }

    /// Maximum number of records the ring keeps.
    #[must_use]
    pub const fn ring_capacity(&self) -> usize {
        self.ring_capacity
    }

    /// Cached record for `key`, if present.
    pub async fn get(&self, key: &R::Key) -> Option<R> {
        self.state.read().await.records.get(key).cloned()
    }

    /// Stores a record read from the store in the keyed map.
    pub async fn remember(&self, record: R) {
        let mut state = self.state.write().await;
        self.put_keyed(&mut state, record);
    }

    /// Replaces the ring with the top of the store and sets the total hint.
    ///
    /// `top` must be the highest-ordinal records of the unfiltered set.
    pub async fn warm(&self, top: Vec<R>, total: u64) {
        let mut state = self.state.write().await;
        let mut recent = top;
        recent.sort_by_cached_key(|record| std::cmp::Reverse(KeysetPosition::of(record)));
        recent.truncate(self.ring_capacity);
        state.recent = recent;
        state.total = Some(total);
    }

    /// Applies a record written through the engine.
    ///
    /// `inserted` is `true` when the key did not exist before the write.
    pub async fn record_written(&self, record: &R, inserted: bool) {
        let mut state = self.state.write().await;
        if inserted {
            state.total = state.total.map(|total| total.saturating_add(1));
        }

        let key = record.key();
        state.recent.retain(|held| held.key() != key);
        let position = KeysetPosition::of(record);
        let at = state
            .recent
            .partition_point(|held| KeysetPosition::of(held) > position);
        // Below a full ring: other records above it may exist in the store.
        if at < self.ring_capacity {
            state.recent.insert(at, record.clone());
            state.recent.truncate(self.ring_capacity);
        }

        self.put_keyed(&mut state, record.clone());
    }

    /// Top `count` records and the total hint, when the ring can serve them.
    pub async fn recent_page(&self, count: usize) -> Option<(Vec<R>, u64)> {
        let state = self.state.read().await;
        let total = state.total?;
        if state.recent.len() <= count {
            return None;
        }
        Some((state.recent.iter().take(count).cloned().collect(), total))
    }

    fn put_keyed(&self, state: &mut CacheState<R>, record: R) {
        if self.record_capacity == 0 {
            return;
        }
        let key = record.key();
        if state.records.insert(key.clone(), record).is_none() {
            state.insertion.push_back(key);
        }
        while state.records.len() > self.record_capacity {
            let Some(oldest) = state.insertion.pop_front() else {
                break;
            };
            state.records.remove(&oldest);
            tracing::trace!(kind = %R::KIND, key = %oldest.encode(), "evicted cached record");
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Amount, Epoch};
    use chrono::Utc;

    fn epoch(id: u64) -> Epoch {
        Epoch::new(id, Utc::now(), Amount::ZERO, Amount::ZERO, Amount::ZERO)
    }

    #[tokio::test]
    async fn keyed_map_evicts_oldest_first() {
        let cache = RecordCache::new(2, 0);
        cache.remember(epoch(1)).await;
        cache.remember(epoch(2)).await;
        cache.remember(epoch(3)).await;
        assert!(cache.get(&1).await.is_none());
        assert!(cache.get(&2).await.is_some());
        assert!(cache.get(&3).await.is_some());
    }

    #[tokio::test]
    async fn ring_needs_total_and_spare_record() {
        let cache = RecordCache::new(8, 4);
        for id in 1..=3 {
            cache.record_written(&epoch(id), true).await;
        }
        assert!(cache.recent_page(2).await.is_none(), "no total hint yet");

        cache.warm(vec![epoch(1), epoch(3), epoch(2)], 3).await;
        let Some((page, total)) = cache.recent_page(2).await else {
            panic!("ring should serve two of three");
        };
        assert_eq!(page.iter().map(|e| e.id).collect::<Vec<_>>(), vec![3, 2]);
        assert_eq!(total, 3);
        assert!(cache.recent_page(3).await.is_none());
    }

    #[tokio::test]
    async fn writes_keep_ring_ordered_and_bounded() {
        let cache = RecordCache::new(8, 3);
        cache.warm(Vec::new(), 0).await;
        for id in [5, 1, 9, 7] {
            cache.record_written(&epoch(id), true).await;
        }
        // 1 fell off the bottom; a late low write stays out of a full ring.
        cache.record_written(&epoch(2), true).await;
        let Some((page, total)) = cache.recent_page(2).await else {
            panic!("ring should serve");
        };
        assert_eq!(page.iter().map(|e| e.id).collect::<Vec<_>>(), vec![9, 7]);
        assert_eq!(total, 5);

        // Rewriting a held key does not duplicate it.
        cache.record_written(&epoch(9), false).await;
        let Some((page, total)) = cache.recent_page(2).await else {
            panic!("ring should serve");
        };
        assert_eq!(page.iter().map(|e| e.id).collect::<Vec<_>>(), vec![9, 7]);
        assert_eq!(total, 5);
    }

    #[test]
    fn ring_orders_tied_ordinals_by_key() {
        let cache = RecordCache::new(0, 4);
        let tied = |id: u64| {
            let mut record = epoch(id);
            record.ordinal_index = crate::domain::OrdinalIndex::new(5);
            record
        };
        tokio_test::block_on(async {
            cache.warm(vec![tied(2), tied(3), tied(1)], 3).await;
            cache.record_written(&epoch(9), true).await;
            let Some((page, total)) = cache.recent_page(3).await else {
                panic!("ring should serve three of four");
            };
            assert_eq!(page.iter().map(|e| e.id).collect::<Vec<_>>(), vec![9, 3, 2]);
            assert_eq!(total, 4);
        });
    }
}
