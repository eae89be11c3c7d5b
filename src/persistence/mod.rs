//! Persistence layer: the storage capability the engine is written against.
//!
//! [`RecordStore`] is the narrow interface every backend provides: point
//! lookup, ordinal range scan, count-by-filter, upsert, and an atomic
//! read-modify-write merge. Backends are picked once at construction time:
//! [`memory::MemoryStore`] for tests and ephemeral runs,
//! [`postgres::PostgresStore`] for production.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{Filter, OrdinalIndex, Record, RecordKey};
use crate::error::IndexError;

pub use memory::MemoryStore;
pub use postgres::{PostgresOptions, PostgresStore};

/// Direction of an ordinal scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Lowest ordinal first.
    Ascending,
    /// Highest ordinal first.
    Descending,
}

/// Keyset position of a stored record.
///
/// Records are totally ordered by `(ordinal, pk)`; several records of one
/// kind may share an ordinal (contracts deployed by one transaction), and
/// the canonical key breaks the tie. Keys compare bytewise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeysetPosition {
    /// Ordinal of the record.
    pub ordinal: OrdinalIndex,
    /// Canonical primary key of the record.
    pub pk: String,
}

impl KeysetPosition {
    /// Position of `record`.
    #[must_use]
    pub fn of<R: Record>(record: &R) -> Self {
        Self {
            ordinal: record.ordinal(),
            pk: record.key().encode(),
        }
    }
}

/// Keyset window of a scan.
///
/// A descending scan admits positions strictly below `after`, an ascending
/// scan positions strictly above it. With no position the scan starts at
/// the extreme of the set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdinalRange {
    /// Excluded starting position, if any.
    pub after: Option<KeysetPosition>,
    /// Scan direction.
    pub order: SortOrder,
}

impl OrdinalRange {
    /// Unbounded scan in the given direction.
    #[must_use]
    pub const fn unbounded(order: SortOrder) -> Self {
        Self { after: None, order }
    }

    /// Scan strictly past `position` in the given direction.
    #[must_use]
    pub const fn after(position: KeysetPosition, order: SortOrder) -> Self {
        Self {
            after: Some(position),
            order,
        }
    }
}

/// Result of [`RecordStore::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The key was new.
    Inserted,
    /// The key existed; payload replaced, ordinal kept.
    Updated,
}

/// What a merge planner wants written for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeWrite<R> {
    /// Leave the stored state untouched.
    Skip,
    /// Insert, or overwrite in place keeping the stored ordinal.
    Put(R),
    /// Delete the stored record and insert this one with its own ordinal.
    Replace(R),
}

impl<R> MergeWrite<R> {
    /// Record that ends up stored, if anything was written.
    #[must_use]
    pub const fn written(&self) -> Option<&R> {
        match self {
            Self::Skip => None,
            Self::Put(record) | Self::Replace(record) => Some(record),
        }
    }
}

/// Outcome of an applied merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeApplied<R> {
    /// State seen by the planner while the key was locked.
    pub previous: Option<R>,
    /// What was written, with the ordinal the store settled on.
    pub write: MergeWrite<R>,
}

/// Decides the write for a key given its current state.
///
/// Runs with the key locked; returning an error aborts the merge with
/// nothing written. Planners may borrow from the caller for `'a`.
pub type MergePlanner<'a, R> =
    dyn Fn(Option<&R>) -> Result<MergeWrite<R>, IndexError> + Send + Sync + 'a;

/// Storage capability for one record type.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync + std::fmt::Debug {
    /// Point lookup by primary key.
    async fn lookup(&self, key: &R::Key) -> Result<Option<R>, IndexError>;

    /// Ordinal of `key`, provided the record still matches `filter`.
    async fn ordinal_in(
        &self,
        key: &R::Key,
        filter: &Filter,
    ) -> Result<Option<OrdinalIndex>, IndexError>;

    /// Filtered scan over `range`, ordered by `(ordinal, pk)`, at most
    /// `limit` rows.
    async fn scan(
        &self,
        filter: &Filter,
        range: OrdinalRange,
        limit: usize,
    ) -> Result<Vec<R>, IndexError>;

    /// Number of records matching `filter`.
    async fn count(&self, filter: &Filter) -> Result<u64, IndexError>;

    /// Inserts a record or replaces its payload; an existing ordinal is
    /// never reassigned.
    async fn upsert(&self, record: R) -> Result<(UpsertOutcome, R), IndexError>;

    /// Atomic read-modify-write of one key.
    async fn merge(
        &self,
        key: &R::Key,
        planner: &MergePlanner<'_, R>,
    ) -> Result<MergeApplied<R>, IndexError>;
}
