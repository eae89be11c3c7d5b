//! Idempotent reconciliation of inbound chain events.
//!
//! Two aggregates are merged rather than simply upserted:
//!
//! - the per-block burn ledger ([`burn`]), where a re-delivered update must
//!   be a no-op and a partially overlapping one is refused, and
//! - per-(transaction, pair) swap state ([`swap`]), where a reserve `Sync`
//!   may arrive before the `Swap` it belongs to.
//!
//! Each merge is a pure planning function run through
//! [`ListEngine::merge`], so the store executes it as one read-modify-write
//! unit with the key locked.

pub mod burn;
pub mod swap;

use crate::domain::{BurnLedgerEntry, SwapState};
use crate::pagination::ListEngine;

pub use burn::{BurnMergeOutcome, plan_burn};
pub use swap::{SwapDisposition, SwapMergeOutcome, plan_swap};

/// Default number of fractional digits kept when checking swap legs.
pub const DEFAULT_SWAP_PRECISION: u8 = 6;

/// Applies burn and swap events to their ledgers.
#[derive(Debug, Clone)]
pub struct EventReconciler {
    burns: ListEngine<BurnLedgerEntry>,
    swaps: ListEngine<SwapState>,
    swap_precision: u8,
}

impl EventReconciler {
    /// Creates a reconciler over the burn and swap engines.
    ///
    /// `swap_precision` is the number of fractional digits a trade leg
    /// keeps before the zero-amount check.
    #[must_use]
    pub fn new(
        burns: ListEngine<BurnLedgerEntry>,
        swaps: ListEngine<SwapState>,
        swap_precision: u8,
    ) -> Self {
        Self {
            burns,
            swaps,
            swap_precision,
        }
    }

    /// Engine holding the burn ledger.
    #[must_use]
    pub fn burns(&self) -> &ListEngine<BurnLedgerEntry> {
        &self.burns
    }

    /// Engine holding swap state.
    #[must_use]
    pub fn swaps(&self) -> &ListEngine<SwapState> {
        &self.swaps
    }
}
