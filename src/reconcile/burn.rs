//! Burn ledger merge.

use tracing::{debug, error, info};

use super::EventReconciler;
use crate::domain::BurnLedgerEntry;
use crate::error::IndexError;
use crate::persistence::MergeWrite;

/// What [`EventReconciler::merge_burn`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurnMergeOutcome {
    /// First burn seen for the block.
    Inserted,
    /// Disjoint transactions added to the existing entry.
    Merged,
    /// Every incoming transaction was already accounted for.
    AlreadyApplied,
}

/// Decides how `incoming` lands on the stored entry for its block.
///
/// # Errors
///
/// Returns [`IndexError::PartialBurnUpdateRejected`] when only some of the
/// incoming transactions are already in the ledger.
pub fn plan_burn(
    incoming: &BurnLedgerEntry,
    existing: Option<&BurnLedgerEntry>,
) -> Result<MergeWrite<BurnLedgerEntry>, IndexError> {
    let Some(existing) = existing else {
        return Ok(MergeWrite::Put(incoming.clone()));
    };
    let overlap = existing.overlap(incoming);
    if overlap == incoming.tx_list.len() {
        return Ok(MergeWrite::Skip);
    }
    if overlap > 0 {
        return Err(IndexError::PartialBurnUpdateRejected {
            block_number: incoming.block_number,
            overlap,
            incoming: incoming.tx_list.len(),
        });
    }
    let mut merged = existing.clone();
    merged.amount = merged.amount.saturating_add(incoming.amount);
    merged.tx_list.extend(incoming.tx_list.iter().copied());
    Ok(MergeWrite::Put(merged))
}

impl EventReconciler {
    /// Merges a burn into the ledger entry of its block.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::PartialBurnUpdateRejected`] (and leaves the
    /// entry untouched) when the update is neither wholly new nor wholly
    /// applied, or a storage error.
    pub async fn merge_burn(
        &self,
        incoming: BurnLedgerEntry,
    ) -> Result<BurnMergeOutcome, IndexError> {
        let block = incoming.block_number;
        let planner = |existing: Option<&BurnLedgerEntry>| plan_burn(&incoming, existing);
        let applied = match self.burns.merge(&block, &planner).await {
            Ok(applied) => applied,
            Err(err @ IndexError::PartialBurnUpdateRejected { .. }) => {
                error!(
                    severity = "critical",
                    block,
                    error = %err,
                    "burn update rejected, redeliver the complete event"
                );
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let outcome = match (&applied.previous, &applied.write) {
            (_, MergeWrite::Skip) => BurnMergeOutcome::AlreadyApplied,
            (None, _) => BurnMergeOutcome::Inserted,
            (Some(_), _) => BurnMergeOutcome::Merged,
        };
        match outcome {
            BurnMergeOutcome::AlreadyApplied => debug!(block, "burn already applied"),
            _ => info!(
                block,
                ?outcome,
                amount = %applied.write.written().map(|e| e.amount).unwrap_or_default(),
                "burn ledger updated"
            ),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::{Amount, SwapState, TxHash};
    use crate::pagination::ListEngine;
    use crate::persistence::MemoryStore;

    fn tx(byte: u8) -> TxHash {
        TxHash::from_bytes([byte; 32])
    }

    fn burn(block: u64, amount: u128, txs: &[u8]) -> BurnLedgerEntry {
        let Ok(entry) = BurnLedgerEntry::new(block, Amount::new(amount), txs.iter().map(|b| tx(*b)))
        else {
            panic!("burn should build");
        };
        entry
    }

    fn reconciler() -> EventReconciler {
        EventReconciler::new(
            ListEngine::new(Arc::new(MemoryStore::<BurnLedgerEntry>::new())),
            ListEngine::new(Arc::new(MemoryStore::<SwapState>::new())),
            6,
        )
    }

    async fn stored(reconciler: &EventReconciler, block: u64) -> BurnLedgerEntry {
        let Ok(Some(entry)) = reconciler.burns().get(&block).await else {
            panic!("block {block} should have a ledger entry");
        };
        entry
    }

    #[tokio::test]
    async fn disjoint_burns_accumulate_and_redelivery_is_a_no_op() {
        let reconciler = reconciler();
        let first = burn(10, 5, &[0xA]);

        let Ok(outcome) = reconciler.merge_burn(first.clone()).await else {
            panic!("first burn should apply");
        };
        assert_eq!(outcome, BurnMergeOutcome::Inserted);
        let Ok(outcome) = reconciler.merge_burn(burn(10, 3, &[0xB])).await else {
            panic!("second burn should apply");
        };
        assert_eq!(outcome, BurnMergeOutcome::Merged);

        let expected = burn(10, 8, &[0xA, 0xB]);
        assert_eq!(stored(&reconciler, 10).await, expected);

        let Ok(outcome) = reconciler.merge_burn(first).await else {
            panic!("redelivery should succeed");
        };
        assert_eq!(outcome, BurnMergeOutcome::AlreadyApplied);
        assert_eq!(stored(&reconciler, 10).await, expected);
    }

    #[tokio::test]
    async fn partial_overlap_is_rejected_without_change() {
        let reconciler = reconciler();
        assert!(reconciler.merge_burn(burn(7, 4, &[1, 2])).await.is_ok());

        let result = reconciler.merge_burn(burn(7, 9, &[2, 3])).await;
        let Err(IndexError::PartialBurnUpdateRejected {
            block_number,
            overlap,
            incoming,
        }) = result
        else {
            panic!("partial overlap should be rejected");
        };
        assert_eq!((block_number, overlap, incoming), (7, 1, 2));
        assert_eq!(stored(&reconciler, 7).await, burn(7, 4, &[1, 2]));
    }

    #[tokio::test]
    async fn concurrent_disjoint_burns_lose_nothing() {
        let reconciler = Arc::new(reconciler());
        let mut handles = Vec::new();
        for byte in 1..=24u8 {
            let reconciler = Arc::clone(&reconciler);
            handles.push(tokio::spawn(async move {
                reconciler.merge_burn(burn(3, 10, &[byte])).await
            }));
        }
        for handle in handles {
            let Ok(Ok(_)) = handle.await else {
                panic!("concurrent burn failed");
            };
        }
        let entry = stored(&reconciler, 3).await;
        assert_eq!(entry.amount, Amount::new(240));
        assert_eq!(entry.tx_list.len(), 24);
    }

    #[test]
    fn plan_keeps_the_stored_ordinal_source() {
        let existing = burn(5, 1, &[1]);
        let Ok(MergeWrite::Put(merged)) = plan_burn(&burn(5, 2, &[2]), Some(&existing)) else {
            panic!("disjoint burn should merge");
        };
        assert_eq!(merged.ordinal_index, existing.ordinal_index);
        assert_eq!(merged.amount, Amount::new(3));
    }
}
