//! PostgreSQL implementation of the storage capability.
//!
//! Every record kind shares the `indexed_records` table (see
//! `migrations/`): the kind and canonical key form the primary key, the
//! ordinal is a `BIGINT` column indexed together with the key for keyset
//! scans, and the entity itself is stored as JSONB so filters can be
//! evaluated in SQL.
//!
//! Merges run inside a transaction that first takes a transaction-scoped
//! advisory lock on `(kind, key)`. The lock also covers keys that have no
//! row yet, so two concurrent first deliveries cannot both insert.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use super::models::StoredRecord;
use super::{
    MergeApplied, MergePlanner, MergeWrite, OrdinalRange, RecordStore, SortOrder, UpsertOutcome,
};
use crate::domain::{Filter, FilterValue, OrdinalIndex, Record, RecordKey};
use crate::error::IndexError;

const SELECT_ROW: &str = "SELECT kind, pk, ordinal, payload FROM indexed_records WHERE kind = ";

/// Connection options for the Postgres backend.
#[derive(Debug, Clone)]
pub struct PostgresOptions {
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of idle connections to keep open.
    pub min_connections: u32,
    /// Timeout in seconds for acquiring a connection.
    pub connect_timeout_secs: u64,
}

impl Default for PostgresOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            connect_timeout_secs: 5,
        }
    }
}

/// PostgreSQL-backed record store using `sqlx::PgPool`.
///
/// Cheap to clone; implements [`RecordStore`] for every record type.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing pool. Migrations are not run.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with the given pool options and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Storage`] if the connection or a migration
    /// fails.
    pub async fn connect(database_url: &str, opts: &PostgresOptions) -> Result<Self, IndexError> {
        let pool = PgPoolOptions::new()
            .max_connections(opts.max_connections)
            .min_connections(opts.min_connections)
            .acquire_timeout(Duration::from_secs(opts.connect_timeout_secs))
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(
            max_connections = opts.max_connections,
            "postgres store connected and migrated"
        );
        Ok(Self { pool })
    }

    /// Runs a planner against `pk` with the key locked, in one transaction.
    async fn merge_locked<R: Record>(
        &self,
        pk: String,
        planner: &MergePlanner<'_, R>,
    ) -> Result<MergeApplied<R>, IndexError> {
        let kind = R::KIND.as_str();
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("{kind}:{pk}"))
            .execute(&mut *tx)
            .await?;

        let previous = sqlx::query_as::<_, StoredRecord>(
            "SELECT kind, pk, ordinal, payload FROM indexed_records \
             WHERE kind = $1 AND pk = $2 FOR UPDATE",
        )
        .bind(kind)
        .bind(&pk)
        .fetch_optional(&mut *tx)
        .await?
        .map(StoredRecord::into_record::<R>)
        .transpose()?;

        // An error here drops `tx`, which rolls back and releases the lock.
        let write = planner(previous.as_ref())?;
        let write = match write {
            MergeWrite::Skip => MergeWrite::Skip,
            MergeWrite::Put(mut record) => {
                ensure_key(&pk, &record)?;
                if let Some(existing) = &previous {
                    record.set_ordinal(existing.ordinal());
                }
                put_row(&mut *tx, &StoredRecord::from_record(&record)?).await?;
                MergeWrite::Put(record)
            }
            MergeWrite::Replace(record) => {
                ensure_key(&pk, &record)?;
                sqlx::query("DELETE FROM indexed_records WHERE kind = $1 AND pk = $2")
                    .bind(kind)
                    .bind(&pk)
                    .execute(&mut *tx)
                    .await?;
                put_row(&mut *tx, &StoredRecord::from_record(&record)?).await?;
                MergeWrite::Replace(record)
            }
        };

        tx.commit().await?;
        debug!(%kind, %pk, wrote = write.written().is_some(), "merge committed");
        Ok(MergeApplied { previous, write })
    }
}

fn ensure_key<R: Record>(pk: &str, record: &R) -> Result<(), IndexError> {
    let written = record.key().encode();
    if written == pk {
        Ok(())
    } else {
        Err(IndexError::Internal(format!(
            "merge for `{pk}` tried to write `{written}`"
        )))
    }
}

async fn put_row(conn: &mut PgConnection, row: &StoredRecord) -> Result<(), IndexError> {
    sqlx::query(
        "INSERT INTO indexed_records (kind, pk, ordinal, payload) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (kind, pk) DO UPDATE SET ordinal = EXCLUDED.ordinal, payload = EXCLUDED.payload",
    )
    .bind(&row.kind)
    .bind(&row.pk)
    .bind(row.ordinal)
    .bind(&row.payload)
    .execute(conn)
    .await?;
    Ok(())
}

/// Appends the filter as `AND` predicates over the JSONB payload.
///
/// A field whose JSON type differs from the filter value never matches,
/// mirroring the in-memory backend.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) -> Result<(), IndexError> {
    filter.validate()?;
    for condition in filter.conditions() {
        let field = condition.field.clone();
        let op = condition.op.as_sql();
        qb.push(" AND CASE WHEN jsonb_typeof(payload -> ")
            .push_bind(field.clone());
        match &condition.value {
            FilterValue::Text(text) => {
                qb.push(") = 'string' THEN (payload ->> ")
                    .push_bind(field)
                    .push(") COLLATE \"C\" ")
                    .push(op)
                    .push(" ")
                    .push_bind(text.clone());
            }
            FilterValue::Number(number) => {
                qb.push(") = 'number' THEN (payload ->> ")
                    .push_bind(field)
                    .push(")::numeric ")
                    .push(op)
                    .push(" ")
                    .push_bind(number.to_string())
                    .push("::numeric");
            }
            FilterValue::Bool(flag) => {
                qb.push(") = 'boolean' THEN (payload ->> ")
                    .push_bind(field)
                    .push(")::boolean ")
                    .push(op)
                    .push(" ")
                    .push_bind(*flag);
            }
        }
        qb.push(" ELSE FALSE END");
    }
    Ok(())
}

fn push_range(qb: &mut QueryBuilder<'_, Postgres>, range: OrdinalRange) -> Result<(), IndexError> {
    if let Some(after) = range.after {
        let op = match range.order {
            SortOrder::Descending => " AND (ordinal, pk) < (",
            SortOrder::Ascending => " AND (ordinal, pk) > (",
        };
        qb.push(op)
            .push_bind(i64::try_from(after.ordinal)?)
            .push(", ")
            .push_bind(after.pk)
            .push(")");
    }
    qb.push(match range.order {
        SortOrder::Ascending => " ORDER BY ordinal ASC, pk ASC",
        SortOrder::Descending => " ORDER BY ordinal DESC, pk DESC",
    });
    Ok(())
}

#[async_trait]
impl<R: Record> RecordStore<R> for PostgresStore {
    async fn lookup(&self, key: &R::Key) -> Result<Option<R>, IndexError> {
        sqlx::query_as::<_, StoredRecord>(
            "SELECT kind, pk, ordinal, payload FROM indexed_records WHERE kind = $1 AND pk = $2",
        )
        .bind(R::KIND.as_str())
        .bind(key.encode())
        .fetch_optional(&self.pool)
        .await?
        .map(StoredRecord::into_record)
        .transpose()
    }

    async fn ordinal_in(
        &self,
        key: &R::Key,
        filter: &Filter,
    ) -> Result<Option<OrdinalIndex>, IndexError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT ordinal FROM indexed_records WHERE kind = ",
        );
        qb.push_bind(R::KIND.as_str())
            .push(" AND pk = ")
            .push_bind(key.encode());
        push_filter(&mut qb, filter)?;
        qb.build_query_scalar::<i64>()
            .fetch_optional(&self.pool)
            .await?
            .map(OrdinalIndex::try_from)
            .transpose()
    }

    async fn scan(
        &self,
        filter: &Filter,
        range: OrdinalRange,
        limit: usize,
    ) -> Result<Vec<R>, IndexError> {
        let limit = i64::try_from(limit)
            .map_err(|_| IndexError::Internal(format!("scan limit {limit} too large")))?;
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_ROW);
        qb.push_bind(R::KIND.as_str());
        push_filter(&mut qb, filter)?;
        push_range(&mut qb, range)?;
        qb.push(" LIMIT ").push_bind(limit);

        let rows = qb
            .build_query_as::<StoredRecord>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(StoredRecord::into_record).collect()
    }

    async fn count(&self, filter: &Filter) -> Result<u64, IndexError> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM indexed_records WHERE kind = ");
        qb.push_bind(R::KIND.as_str());
        push_filter(&mut qb, filter)?;
        let total = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        u64::try_from(total).map_err(|_| IndexError::Storage(format!("negative count {total}")))
    }

    async fn upsert(&self, record: R) -> Result<(UpsertOutcome, R), IndexError> {
        let pk = record.key().encode();
        let planner = move |_: Option<&R>| -> Result<MergeWrite<R>, IndexError> {
            Ok(MergeWrite::Put(record.clone()))
        };
        let applied = self.merge_locked(pk, &planner).await?;
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
        self.merge_locked(key.encode(), planner).await
    }
}
