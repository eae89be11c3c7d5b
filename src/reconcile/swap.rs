//! Swap / reserve-sync merge.
//!
//! A transaction touching a pair emits a `Sync` (reserves) and a `Swap`
//! (trade amounts), which may be delivered in either order and more than
//! once. Both resolve to the same [`SwapKey`]; the stored state ends up
//! swap-typed, with the trade amounts of the swap and the reserves of the
//! latest sync.

use tracing::{debug, info};

use super::EventReconciler;
use crate::domain::{Reserves, SwapKey, SwapState, SwapType};
use crate::error::IndexError;
use crate::persistence::MergeWrite;

/// How an incoming swap-related event was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDisposition {
    /// New key; stored as-is (a sync becomes a placeholder).
    Inserted,
    /// Sync for a known key; reserves updated in place.
    ReservesUpdated,
    /// Swap replacing a sync placeholder, carrying its reserves.
    Transplanted,
    /// Key already fully known; nothing written.
    AlreadyKnown,
    /// Swap whose legs are both zero after truncation; dropped.
    DustDropped,
}

/// Result of [`EventReconciler::merge_swap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapMergeOutcome {
    /// `true` when the incoming event is now the stored authoritative
    /// record.
    pub accepted: bool,
    /// Reserves carried over from a sync placeholder.
    pub corrected_reserves: Option<Reserves>,
    /// What happened.
    pub disposition: SwapDisposition,
}

/// Decides how `incoming` lands on the stored state for its key.
///
/// `precision` is the number of fractional digits a trade leg keeps before
/// the zero-amount check.
///
/// # Errors
///
/// Never fails today; the signature matches the merge planner contract.
pub fn plan_swap(
    incoming: &SwapState,
    existing: Option<&SwapState>,
    precision: u8,
) -> Result<MergeWrite<SwapState>, IndexError> {
    let is_dust = incoming.swap_type == SwapType::Swap && incoming.has_dust_legs(precision);
    let write = match (existing, incoming.swap_type) {
        (None, _) if is_dust => MergeWrite::Skip,
        (None, _) => MergeWrite::Put(incoming.clone()),
        (Some(existing), SwapType::Sync) => {
            let mut updated = existing.clone();
            updated.reserves = incoming.reserves;
            MergeWrite::Put(updated)
        }
        // A dust swap never displaces a placeholder; the sync's reserves
        // stay listed rather than a swap with zero legs.
        (Some(existing), SwapType::Swap) if existing.swap_type == SwapType::Sync && !is_dust => {
            let mut authoritative = incoming.clone();
            authoritative.reserves = existing.reserves;
            MergeWrite::Replace(authoritative)
        }
        (Some(_), SwapType::Swap) => MergeWrite::Skip,
    };
    Ok(write)
}

impl EventReconciler {
    /// Merges a swap or sync event into the swap state of its key.
    ///
    /// The key is re-derived from the event's transaction hash and pair.
    ///
    /// # Errors
    ///
    /// Returns a storage error; nothing is written in that case.
    pub async fn merge_swap(&self, mut incoming: SwapState) -> Result<SwapMergeOutcome, IndexError> {
        let key = SwapKey::derive(&incoming.tx_hash, &incoming.pair);
        incoming.key = key;
        let precision = self.swap_precision;
        let planner =
            |existing: Option<&SwapState>| plan_swap(&incoming, existing, precision);
        let applied = self.swaps.merge(&key, &planner).await?;

        let outcome = match (&applied.previous, &applied.write) {
            (None, MergeWrite::Skip) => {
                debug!(%key, tx = %incoming.tx_hash, "swap legs truncate to zero, dropped");
                SwapMergeOutcome {
                    accepted: false,
                    corrected_reserves: None,
                    disposition: SwapDisposition::DustDropped,
                }
            }
            (None, _) => SwapMergeOutcome {
                accepted: true,
                corrected_reserves: None,
                disposition: SwapDisposition::Inserted,
            },
            (Some(_), MergeWrite::Put(_)) => SwapMergeOutcome {
                accepted: false,
                corrected_reserves: None,
                disposition: SwapDisposition::ReservesUpdated,
            },
            (Some(placeholder), MergeWrite::Replace(_)) => {
                info!(%key, tx = %incoming.tx_hash, "swap replaced sync placeholder");
                SwapMergeOutcome {
                    accepted: true,
                    corrected_reserves: Some(placeholder.reserves),
                    disposition: SwapDisposition::Transplanted,
                }
            }
            (Some(_), MergeWrite::Skip) => {
                let disposition = if incoming.swap_type == SwapType::Swap
                    && incoming.has_dust_legs(precision)
                {
                    SwapDisposition::DustDropped
                } else {
                    SwapDisposition::AlreadyKnown
                };
                SwapMergeOutcome {
                    accepted: false,
                    corrected_reserves: None,
                    disposition,
                }
            }
        };
        debug!(%key, disposition = ?outcome.disposition, "swap event reconciled");
        Ok(outcome)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::domain::{
        Address, Amount, BlockPosition, BurnLedgerEntry, Filter, PairDecimals, TradeAmounts,
        TxHash,
    };
    use crate::pagination::ListEngine;
    use crate::persistence::MemoryStore;

    const DECIMALS: PairDecimals = PairDecimals {
        decimals0: 18,
        decimals1: 6,
    };

    fn pair() -> Address {
        Address::from_bytes([0x42; 20])
    }

    fn reserves(r0: u128, r1: u128) -> Reserves {
        Reserves {
            reserve0: Amount::new(r0),
            reserve1: Amount::new(r1),
        }
    }

    fn trade(in0: u128, out1: u128) -> TradeAmounts {
        TradeAmounts {
            amount0_in: Amount::new(in0),
            amount1_out: Amount::new(out1),
            ..TradeAmounts::default()
        }
    }

    fn swap_event(tx: u8, amounts: TradeAmounts) -> SwapState {
        let Ok(event) = SwapState::swap(
            pair(),
            TxHash::from_bytes([tx; 32]),
            BlockPosition::log(100, 2, 5),
            amounts,
            DECIMALS,
            Utc::now(),
        ) else {
            panic!("swap should build");
        };
        event
    }

    fn sync_event(tx: u8, r: Reserves) -> SwapState {
        let Ok(event) = SwapState::sync(
            pair(),
            TxHash::from_bytes([tx; 32]),
            BlockPosition::log(100, 2, 4),
            r,
            DECIMALS,
            Utc::now(),
        ) else {
            panic!("sync should build");
        };
        event
    }

    fn reconciler() -> EventReconciler {
        EventReconciler::new(
            ListEngine::new(Arc::new(MemoryStore::<BurnLedgerEntry>::new())),
            ListEngine::new(Arc::new(MemoryStore::<SwapState>::new())),
            6,
        )
    }

    async fn merge(reconciler: &EventReconciler, event: SwapState) -> SwapMergeOutcome {
        let Ok(outcome) = reconciler.merge_swap(event).await else {
            panic!("merge should succeed");
        };
        outcome
    }

    async fn stored(reconciler: &EventReconciler, tx: u8) -> SwapState {
        let key = SwapKey::derive(&TxHash::from_bytes([tx; 32]), &pair());
        let Ok(Some(state)) = reconciler.swaps().get(&key).await else {
            panic!("swap state should exist");
        };
        state
    }

    #[tokio::test]
    async fn sync_then_swap_transplants_reserves() {
        let reconciler = reconciler();
        let placeholder = merge(&reconciler, sync_event(1, reserves(500, 600))).await;
        assert_eq!(placeholder.disposition, SwapDisposition::Inserted);

        let outcome = merge(&reconciler, swap_event(1, trade(10u128.pow(18), 2_000_000))).await;
        assert!(outcome.accepted);
        assert_eq!(outcome.disposition, SwapDisposition::Transplanted);
        assert_eq!(outcome.corrected_reserves, Some(reserves(500, 600)));

        let state = stored(&reconciler, 1).await;
        assert_eq!(state.swap_type, SwapType::Swap);
        assert_eq!(state.amounts, trade(10u128.pow(18), 2_000_000));
        assert_eq!(state.reserves, reserves(500, 600));
        // The authoritative record takes the swap log's position.
        assert_eq!(state.ordinal_index, swap_event(1, trade(1, 1)).ordinal_index);

        let Ok(page) = reconciler.swaps().list(Filter::all(), None, 10).await else {
            panic!("list should succeed");
        };
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn sync_after_swap_updates_reserves_only() {
        let reconciler = reconciler();
        let swap = swap_event(2, trade(5_000_000_000_000, 3_000_000));
        assert!(merge(&reconciler, swap.clone()).await.accepted);

        let outcome = merge(&reconciler, sync_event(2, reserves(7, 8))).await;
        assert!(!outcome.accepted);
        assert_eq!(outcome.disposition, SwapDisposition::ReservesUpdated);

        let state = stored(&reconciler, 2).await;
        assert_eq!(state.swap_type, SwapType::Swap);
        assert_eq!(state.amounts, swap.amounts);
        assert_eq!(state.reserves, reserves(7, 8));
        assert_eq!(state.ordinal_index, swap.ordinal_index);
    }

    #[tokio::test]
    async fn duplicate_swap_is_a_no_op() {
        let reconciler = reconciler();
        let swap = swap_event(3, trade(5_000_000_000_000, 3_000_000));
        assert!(merge(&reconciler, swap.clone()).await.accepted);
        let again = merge(&reconciler, swap).await;
        assert!(!again.accepted);
        assert_eq!(again.disposition, SwapDisposition::AlreadyKnown);
    }

    #[tokio::test]
    async fn dust_swap_is_dropped() {
        let reconciler = reconciler();
        // 10 wei of an 18-decimal token and nothing of the other leg.
        let outcome = merge(&reconciler, swap_event(4, trade(10, 0))).await;
        assert!(!outcome.accepted);
        assert_eq!(outcome.disposition, SwapDisposition::DustDropped);
        let key = SwapKey::derive(&TxHash::from_bytes([4; 32]), &pair());
        let Ok(found) = reconciler.swaps().get(&key).await else {
            panic!("lookup should succeed");
        };
        assert!(found.is_none());
    }

    #[test]
    fn dust_swap_keeps_the_placeholder() {
        let placeholder = sync_event(5, reserves(1, 2));
        let Ok(write) = plan_swap(&swap_event(5, trade(10, 0)), Some(&placeholder), 6) else {
            panic!("plan should succeed");
        };
        assert_eq!(write, MergeWrite::Skip);
    }
}
