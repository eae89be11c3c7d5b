//! In-memory storage backend.
//!
//! Records live in a `BTreeMap` ordered by keyset position behind a
//! [`tokio::sync::RwLock`], so scans and counts run concurrently with each
//! other. Writes to the same key are serialized through a per-key
//! [`tokio::sync::Mutex`]; writes to different keys only contend on the
//! short map update. A key's mutex lives only while some write holds or
//! awaits it.
//!
//! All data is lost when the process exits.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::{
    KeysetPosition, MergeApplied, MergePlanner, MergeWrite, OrdinalRange, RecordStore, SortOrder,
    UpsertOutcome,
};
use crate::domain::{Filter, OrdinalIndex, Record, RecordKey};
use crate::error::IndexError;

#[derive(Debug)]
struct MemoryState<R> {
    by_position: BTreeMap<KeysetPosition, R>,
    ordinals: HashMap<String, OrdinalIndex>,
}

impl<R: Record> MemoryState<R> {
    fn position(&self, pk: &str) -> Option<KeysetPosition> {
        let ordinal = *self.ordinals.get(pk)?;
        Some(KeysetPosition {
            ordinal,
            pk: pk.to_string(),
        })
    }

    fn get(&self, pk: &str) -> Option<&R> {
        self.by_position.get(&self.position(pk)?)
    }

    fn remove(&mut self, pk: &str) -> Option<R> {
        let position = self.position(pk)?;
        self.ordinals.remove(pk);
        self.by_position.remove(&position)
    }

    fn insert(&mut self, record: R) {
        let position = KeysetPosition::of(&record);
        self.ordinals.insert(position.pk.clone(), position.ordinal);
        self.by_position.insert(position, record);
    }
}

/// In-memory [`RecordStore`] for a single record type.
#[derive(Debug)]
pub struct MemoryStore<R> {
    state: RwLock<MemoryState<R>>,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<R: Record> MemoryStore<R> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState {
                by_position: BTreeMap::new(),
                ordinals: HashMap::new(),
            }),
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.state.read().await.ordinals.len()
    }

    /// Returns `true` if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.ordinals.is_empty()
    }

    async fn key_lock(&self, pk: &str) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        Arc::clone(locks.entry(pk.to_string()).or_default())
    }

    /// Drops the map entry for `pk` once no other write holds or awaits it.
    async fn release_key_lock(&self, pk: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.key_locks.lock().await;
        // One reference in the map, one here.
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(pk);
        }
    }

    /// Runs `planner` against `pk` with the key locked.
    async fn merge_pk(
        &self,
        pk: String,
        planner: &MergePlanner<'_, R>,
    ) -> Result<MergeApplied<R>, IndexError> {
        let lock = self.key_lock(&pk).await;
        let applied = {
            let _guard = lock.lock().await;
            self.plan_and_apply(&pk, planner).await
        };
        self.release_key_lock(&pk, lock).await;
        applied
    }

    /// Plans and applies a write for `pk`; the caller must hold the key lock.
    async fn plan_and_apply(
        &self,
        pk: &str,
        planner: &MergePlanner<'_, R>,
    ) -> Result<MergeApplied<R>, IndexError> {
        let previous = self.state.read().await.get(pk).cloned();
        let write = planner(previous.as_ref())?;
        if let Some(record) = write.written()
            && record.key().encode() != pk
        {
            return Err(IndexError::Internal(format!(
                "merge for `{pk}` tried to write `{}`",
                record.key().encode()
            )));
        }
        let mut state = self.state.write().await;
        let write = match write {
            MergeWrite::Skip => MergeWrite::Skip,
            MergeWrite::Put(mut record) => {
                if let Some(existing) = state.remove(pk) {
                    record.set_ordinal(existing.ordinal());
                }
                state.insert(record.clone());
                MergeWrite::Put(record)
            }
            MergeWrite::Replace(record) => {
                state.remove(pk);
                state.insert(record.clone());
                MergeWrite::Replace(record)
            }
        };
        Ok(MergeApplied { previous, write })
    }
}

impl<R: Record> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn matches<R: Record>(record: &R, filter: &Filter) -> Result<bool, IndexError> {
    if filter.is_empty() {
        return Ok(true);
    }
    Ok(filter.matches(&serde_json::to_value(record)?))
}

#[async_trait]
impl<R: Record> RecordStore<R> for MemoryStore<R> {
    async fn lookup(&self, key: &R::Key) -> Result<Option<R>, IndexError> {
        Ok(self.state.read().await.get(&key.encode()).cloned())
    }

    async fn ordinal_in(
        &self,
        key: &R::Key,
        filter: &Filter,
    ) -> Result<Option<OrdinalIndex>, IndexError> {
        filter.validate()?;
        let state = self.state.read().await;
        match state.get(&key.encode()) {
            Some(record) if matches(record, filter)? => Ok(Some(record.ordinal())),
            _ => Ok(None),
        }
    }

    async fn scan(
        &self,
        filter: &Filter,
        range: OrdinalRange,
        limit: usize,
    ) -> Result<Vec<R>, IndexError> {
        filter.validate()?;
        let bounds = match (range.after, range.order) {
            (None, _) => (Bound::Unbounded, Bound::Unbounded),
            (Some(after), SortOrder::Descending) => (Bound::Unbounded, Bound::Excluded(after)),
            (Some(after), SortOrder::Ascending) => (Bound::Excluded(after), Bound::Unbounded),
        };
        let state = self.state.read().await;
        let window = state.by_position.range(bounds);
        let candidates: Box<dyn Iterator<Item = &R> + '_> = match range.order {
            SortOrder::Ascending => Box::new(window.map(|(_, record)| record)),
            SortOrder::Descending => Box::new(window.rev().map(|(_, record)| record)),
        };
        let mut page = Vec::with_capacity(limit.min(state.ordinals.len()));
        for record in candidates {
            if page.len() >= limit {
                break;
            }
            if matches(record, filter)? {
                page.push(record.clone());
            }
        }
        Ok(page)
    }

    async fn count(&self, filter: &Filter) -> Result<u64, IndexError> {
        filter.validate()?;
        let state = self.state.read().await;
        let mut total = 0u64;
        for record in state.by_position.values() {
            if matches(record, filter)? {
                total = total.saturating_add(1);
            }
        }
        Ok(total)
    }

    async fn upsert(&self, record: R) -> Result<(UpsertOutcome, R), IndexError> {
        let pk = record.key().encode();
        let planner = move |_: Option<&R>| -> Result<MergeWrite<R>, IndexError> {
            Ok(MergeWrite::Put(record.clone()))
        };
        let applied = self.merge_pk(pk, &planner).await?;
        let outcome = if applied.previous.is_some() {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        };
        match applied.write {
            MergeWrite::Put(stored) | MergeWrite::Replace(stored) => Ok((outcome, stored)),
            MergeWrite::Skip => Err(IndexError::Internal("upsert produced no write".to_string())),
        }
    }

    async fn merge(
        &self,
        key: &R::Key,
        planner: &MergePlanner<'_, R>,
    ) -> Result<MergeApplied<R>, IndexError> {
        self.merge_pk(key.encode(), planner).await
    }
}
