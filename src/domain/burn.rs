//! Cumulative per-block fee burn ledger.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ordinal::{BlockPosition, OrdinalIndex};
use super::primitives::{Amount, TxHash};
use super::record::{Record, RecordKind};
use crate::error::IndexError;

/// Burned amount of one block together with the transactions that
/// contributed to it.
///
/// Only grows: merges add to `amount` and extend `tx_list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnLedgerEntry {
    /// Block the burn belongs to (primary key).
    pub block_number: u64,
    /// Cumulative burned amount.
    pub amount: Amount,
    /// Contributing transactions.
    pub tx_list: BTreeSet<TxHash>,
    /// Pagination sort key.
    pub ordinal_index: OrdinalIndex,
}

impl BurnLedgerEntry {
    /// Builds a burn entry for `block_number`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OrdinalOverflow`] if the block does not fit.
    pub fn new(
        block_number: u64,
        amount: Amount,
        tx_list: impl IntoIterator<Item = TxHash>,
    ) -> Result<Self, IndexError> {
        Ok(Self {
            block_number,
            amount,
            tx_list: tx_list.into_iter().collect(),
            ordinal_index: OrdinalIndex::from_position(BlockPosition::transaction(
                block_number,
                0,
            ))?,
        })
    }

    /// Number of `other`'s transactions already present in this entry.
    #[must_use]
    pub fn overlap(&self, other: &Self) -> usize {
        other
            .tx_list
            .iter()
            .filter(|hash| self.tx_list.contains(hash))
            .count()
    }
}

impl Record for BurnLedgerEntry {
    type Key = u64;
    const KIND: RecordKind = RecordKind::Burn;

    fn key(&self) -> u64 {
        self.block_number
    }

    fn ordinal(&self) -> OrdinalIndex {
        self.ordinal_index
    }

    fn set_ordinal(&mut self, ordinal: OrdinalIndex) {
        self.ordinal_index = ordinal;
    }
}
