//! Chain transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ordinal::{BlockPosition, OrdinalIndex};
use super::primitives::{Address, Amount, TxHash};
use super::record::{Record, RecordKind};
use crate::error::IndexError;

/// Execution state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Seen in a block but the receipt has not been processed yet.
    Pending,
    /// Executed successfully.
    Succeeded,
    /// Reverted.
    Failed,
}

/// An indexed chain transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction hash (primary key).
    pub hash: TxHash,
    /// Block the transaction was included in.
    pub block_number: u64,
    /// Index within the block.
    pub tx_index: u32,
    /// Sender.
    pub from: Address,
    /// Recipient; `None` for contract creation.
    pub to: Option<Address>,
    /// Native value transferred.
    pub value: Amount,
    /// Gas consumed; zero while pending.
    pub gas_used: u64,
    /// Execution state.
    pub status: TxStatus,
    /// Block timestamp.
    pub timestamp: DateTime<Utc>,
    /// Pagination sort key.
    pub ordinal_index: OrdinalIndex,
}

impl Transaction {
    /// Builds a transaction, deriving its ordinal from block and index.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OrdinalOverflow`] if the position does not fit.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hash: TxHash,
        block_number: u64,
        tx_index: u32,
        from: Address,
        to: Option<Address>,
        value: Amount,
        status: TxStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, IndexError> {
        let ordinal_index =
            OrdinalIndex::from_position(BlockPosition::transaction(block_number, tx_index))?;
        Ok(Self {
            hash,
            block_number,
            tx_index,
            from,
            to,
            value,
            gas_used: 0,
            status,
            timestamp,
            ordinal_index,
        })
    }
}

impl Record for Transaction {
    type Key = TxHash;
    const KIND: RecordKind = RecordKind::Transaction;

    fn key(&self) -> TxHash {
        self.hash
    }

    fn ordinal(&self) -> OrdinalIndex {
        self.ordinal_index
    }

    fn set_ordinal(&mut self, ordinal: OrdinalIndex) {
        self.ordinal_index = ordinal;
    }
}
