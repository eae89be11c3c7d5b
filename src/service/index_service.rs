//! Index service: wires stores, caches and engines for every record kind.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::RecordCache;
use crate::config::{IndexerConfig, StorageBackend};
use crate::domain::{
    BurnLedgerEntry, Contract, Delegation, Epoch, Record, RewardClaim, SwapState,
    TokenTransaction, Transaction, WithdrawRequest,
};
use crate::error::IndexError;
use crate::pagination::ListEngine;
use crate::persistence::{MemoryStore, PostgresStore, RecordStore};
use crate::reconcile::EventReconciler;

/// Every listing engine plus the reconciler.
#[derive(Debug, Clone)]
pub struct IndexService {
    /// Chain transactions.
    pub transactions: ListEngine<Transaction>,
    /// Stake delegations.
    pub delegations: ListEngine<Delegation>,
    /// Claimed staking rewards.
    pub reward_claims: ListEngine<RewardClaim>,
    /// Withdraw requests.
    pub withdraw_requests: ListEngine<WithdrawRequest>,
    /// Sealed epochs.
    pub epochs: ListEngine<Epoch>,
    /// Deployed contracts.
    pub contracts: ListEngine<Contract>,
    /// Token transfers.
    pub token_transactions: ListEngine<TokenTransaction>,
    /// Swap / sync state.
    pub swaps: ListEngine<SwapState>,
    /// Burn ledger.
    pub burns: ListEngine<BurnLedgerEntry>,
    /// Burn and swap reconciliation.
    pub reconciler: EventReconciler,
}

/// Builds the engine of each kind over the selected backend.
struct EngineFactory<'a> {
    config: &'a IndexerConfig,
    postgres: Option<PostgresStore>,
}

impl EngineFactory<'_> {
    fn engine<R: Record>(&self) -> ListEngine<R> {
        let store: Arc<dyn RecordStore<R>> = match &self.postgres {
            Some(pg) => Arc::new(pg.clone()),
            None => Arc::new(MemoryStore::<R>::new()),
        };
        if !self.config.cache_enabled() {
            return ListEngine::new(store);
        }
        let cache = RecordCache::new(
            self.config.record_cache_capacity,
            self.config.recent_ring_capacity,
        );
        ListEngine::with_cache(store, Arc::new(cache))
    }
}

impl IndexService {
    /// Connects the configured backend and builds every engine.
    ///
    /// With the memory backend, recent-item rings are warmed from the store
    /// before returning. Postgres-backed engines read straight from the
    /// store.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Storage`] if the Postgres backend cannot be
    /// reached or migrated.
    pub async fn from_config(config: &IndexerConfig) -> Result<Self, IndexError> {
        let postgres = match config.storage_backend {
            StorageBackend::Memory => None,
            StorageBackend::Postgres => Some(
                PostgresStore::connect(&config.database_url, &config.postgres_options()).await?,
            ),
        };
        if config.storage_backend == StorageBackend::Postgres
            && (config.record_cache_capacity > 0 || config.recent_ring_capacity > 0)
        {
            warn!("record cache disabled: the postgres store has external writers");
        }
        let service = Self::build(&EngineFactory { config, postgres });
        service.warm_caches().await?;
        info!(
            backend = ?config.storage_backend,
            cached = config.cache_enabled(),
            "index service ready"
        );
        Ok(service)
    }

    /// In-memory service with no cache, for tests and ephemeral runs.
    #[must_use]
    pub fn in_memory(swap_amount_precision: u8) -> Self {
        let config = IndexerConfig {
            record_cache_capacity: 0,
            recent_ring_capacity: 0,
            swap_amount_precision,
            ..IndexerConfig::default()
        };
        Self::build(&EngineFactory {
            config: &config,
            postgres: None,
        })
    }

    fn build(factory: &EngineFactory<'_>) -> Self {
        let burns = factory.engine::<BurnLedgerEntry>();
        let swaps = factory.engine::<SwapState>();
        let reconciler = EventReconciler::new(
            burns.clone(),
            swaps.clone(),
            factory.config.swap_amount_precision,
        );
        Self {
            transactions: factory.engine(),
            delegations: factory.engine(),
            reward_claims: factory.engine(),
            withdraw_requests: factory.engine(),
            epochs: factory.engine(),
            contracts: factory.engine(),
            token_transactions: factory.engine(),
            swaps,
            burns,
            reconciler,
        }
    }

    async fn warm_caches(&self) -> Result<(), IndexError> {
        self.transactions.warm_cache().await?;
        self.delegations.warm_cache().await?;
        self.reward_claims.warm_cache().await?;
        self.withdraw_requests.warm_cache().await?;
        self.epochs.warm_cache().await?;
        self.contracts.warm_cache().await?;
        self.token_transactions.warm_cache().await?;
        self.swaps.warm_cache().await?;
        self.burns.warm_cache().await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Amount, Filter, TxHash};

    #[tokio::test]
    async fn reconciler_shares_the_listed_burn_ledger() {
        let service = IndexService::in_memory(6);
        let Ok(burn) = BurnLedgerEntry::new(9, Amount::new(4), [TxHash::from_bytes([1; 32])])
        else {
            panic!("burn should build");
        };
        assert!(service.reconciler.merge_burn(burn).await.is_ok());

        let Ok(page) = service.burns.list(Filter::all(), None, 5).await else {
            panic!("list should succeed");
        };
        assert_eq!(page.total, 1);
        assert_eq!(page.collection.first().map(|b| b.block_number), Some(9));
    }

    #[tokio::test]
    async fn memory_config_builds_with_caches() {
        let config = IndexerConfig::default();
        let Ok(service) = IndexService::from_config(&config).await else {
            panic!("memory service should build");
        };
        let Ok(page) = service.epochs.list(Filter::all(), None, 3).await else {
            panic!("list should succeed");
        };
        assert!(page.is_empty() && page.is_start && page.is_end);
    }
}
