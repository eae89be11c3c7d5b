//! Generic listing engine over one record type.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::cursor::Cursor;
use super::list_result::ListResult;
use super::loader::ListLoader;
use super::range::{Direction, PageRequest, RangeResolver};
use crate::cache::RecordCache;
use crate::domain::{Filter, Record};
use crate::error::IndexError;
use crate::persistence::{
    MergeApplied, MergePlanner, OrdinalRange, RecordStore, SortOrder, UpsertOutcome,
};

/// Store plus optional cache for one record type.
///
/// Every listing endpoint goes through [`ListEngine::list`]; every write
/// goes through [`ListEngine::upsert`] or [`ListEngine::merge`] so the
/// cache stays coherent with the store.
#[derive(Debug)]
pub struct ListEngine<R: Record> {
    store: Arc<dyn RecordStore<R>>,
    cache: Option<Arc<RecordCache<R>>>,
}

impl<R: Record> Clone for ListEngine<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: self.cache.as_ref().map(Arc::clone),
        }
    }
}

impl<R: Record> ListEngine<R> {
    /// Engine reading straight from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore<R>>) -> Self {
        Self { store, cache: None }
    }

    /// Engine with a cache in front of `store`.
    ///
    /// Only coherent while this engine is the sole writer of `store`.
    #[must_use]
    pub fn with_cache(store: Arc<dyn RecordStore<R>>, cache: Arc<RecordCache<R>>) -> Self {
        Self {
            store,
            cache: Some(cache),
        }
    }

    /// Underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecordStore<R>> {
        &self.store
    }

    /// Loads the top of the store into the cache's recent ring.
    ///
    /// Does nothing without a cache.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn warm_cache(&self) -> Result<(), IndexError> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };
        let filter = Filter::all();
        let top = self
            .store
            .scan(
                &filter,
                OrdinalRange::unbounded(SortOrder::Descending),
                cache.ring_capacity(),
            )
            .await?;
        let total = self.store.count(&filter).await?;
        debug!(kind = %R::KIND, held = top.len(), total, "recent ring warmed");
        cache.warm(top, total).await;
        Ok(())
    }

    /// Lists one page.
    ///
    /// `count > 0` pages down from the top (or from below `cursor`),
    /// `count < 0` pages up from the bottom (or from above `cursor`).
    /// Pages are presented top-first either way.
    ///
    /// # Errors
    ///
    /// - [`IndexError::InvalidPageSize`] when `count` is zero.
    /// - [`IndexError::InvalidCursor`] for a malformed or foreign cursor.
    /// - [`IndexError::RecordNotFound`] when the cursor no longer resolves
    ///   under `filter`.
    /// - [`IndexError::InvalidFilter`] or a storage error from the store.
    #[instrument(level = "debug", skip(self, filter, cursor), fields(kind = %R::KIND))]
    pub async fn list(
        &self,
        filter: Filter,
        cursor: Option<&str>,
        count: i32,
    ) -> Result<ListResult<R>, IndexError> {
        let page = PageRequest::from_count(count)?;
        let cursor = cursor.map(Cursor::<R>::decode).transpose()?;

        if cursor.is_none()
            && filter.is_empty()
            && page.direction == Direction::Down
            && let Some(hit) = self.recent_page(page.size).await
        {
            return Ok(hit);
        }

        let range =
            RangeResolver::resolve(self.store.as_ref(), &filter, cursor.as_ref(), page.direction)
                .await?;
        ListLoader::load(self.store.as_ref(), filter, &range, page.size).await
    }

    async fn recent_page(&self, size: usize) -> Option<ListResult<R>> {
        let cache = self.cache.as_ref()?;
        let (collection, total) = cache.recent_page(size).await?;
        debug!(kind = %R::KIND, size, "page served from recent ring");
        let mut page = ListResult::new(collection, total, Filter::all());
        page.is_start = true;
        Some(page)
    }

    /// Read-through point lookup.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn get(&self, key: &R::Key) -> Result<Option<R>, IndexError> {
        if let Some(cache) = &self.cache
            && let Some(hit) = cache.get(key).await
        {
            return Ok(Some(hit));
        }
        let found = self.store.lookup(key).await?;
        if let (Some(cache), Some(record)) = (&self.cache, &found) {
            cache.remember(record.clone()).await;
        }
        Ok(found)
    }

    /// Inserts or replaces a record, keeping the ordinal of an existing one.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn upsert(&self, record: R) -> Result<(UpsertOutcome, R), IndexError> {
        let (outcome, stored) = self.store.upsert(record).await?;
        if let Some(cache) = &self.cache {
            cache
                .record_written(&stored, outcome == UpsertOutcome::Inserted)
                .await;
        }
        Ok((outcome, stored))
    }

    /// Atomic read-modify-write of one key; see [`RecordStore::merge`].
    ///
    /// # Errors
    ///
    /// Returns whatever the planner returns, or a storage error.
    pub async fn merge(
        &self,
        key: &R::Key,
        planner: &MergePlanner<'_, R>,
    ) -> Result<MergeApplied<R>, IndexError> {
        let applied = self.store.merge(key, planner).await?;
        if let (Some(cache), Some(written)) = (&self.cache, applied.write.written()) {
            cache
                .record_written(written, applied.previous.is_none())
                .await;
        }
        Ok(applied)
    }
}
