//! Epochs, contracts and token transfers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ordinal::{BlockPosition, OrdinalIndex};
use super::primitives::{Address, Amount, TxHash};
use super::record::{LogKey, Record, RecordKind};
use crate::error::IndexError;

/// A sealed epoch. Epoch ids are already strictly increasing, so the id is
/// used as the ordinal directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epoch {
    /// Epoch number.
    pub id: u64,
    /// Time the epoch was sealed.
    pub end_time: DateTime<Utc>,
    /// Total supply at the end of the epoch.
    pub total_supply: Amount,
    /// Base staking reward per second.
    pub base_reward_per_second: Amount,
    /// Fees collected during the epoch.
    pub epoch_fee: Amount,
    /// Pagination sort key.
    pub ordinal_index: OrdinalIndex,
}

impl Epoch {
    /// Builds an epoch record.
    #[must_use]
    pub const fn new(
        id: u64,
        end_time: DateTime<Utc>,
        total_supply: Amount,
        base_reward_per_second: Amount,
        epoch_fee: Amount,
    ) -> Self {
        Self {
            id,
            end_time,
            total_supply,
            base_reward_per_second,
            epoch_fee,
            ordinal_index: OrdinalIndex::new(id),
        }
    }
}

impl Record for Epoch {
    type Key = u64;
    const KIND: RecordKind = RecordKind::Epoch;

    fn key(&self) -> u64 {
        self.id
    }

    fn ordinal(&self) -> OrdinalIndex {
        self.ordinal_index
    }

    fn set_ordinal(&mut self, ordinal: OrdinalIndex) {
        self.ordinal_index = ordinal;
    }
}

/// A deployed smart contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// Contract address (primary key).
    pub address: Address,
    /// Deploying transaction.
    pub deployment_tx: TxHash,
    /// Block of deployment.
    pub block_number: u64,
    /// Source name once the contract has been validated.
    pub name: Option<String>,
    /// `true` once source code has been validated.
    pub validated: bool,
    /// Deployment time.
    pub deployed_at: DateTime<Utc>,
    /// Pagination sort key.
    pub ordinal_index: OrdinalIndex,
}

impl Contract {
    /// Builds an unvalidated contract ordered by its deploying transaction.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OrdinalOverflow`] if the position does not fit.
    pub fn new(
        address: Address,
        deployment_tx: TxHash,
        position: BlockPosition,
        deployed_at: DateTime<Utc>,
    ) -> Result<Self, IndexError> {
        Ok(Self {
            address,
            deployment_tx,
            block_number: position.block,
            name: None,
            validated: false,
            deployed_at,
            ordinal_index: OrdinalIndex::from_position(position)?,
        })
    }
}

impl Record for Contract {
    type Key = Address;
    const KIND: RecordKind = RecordKind::Contract;

    fn key(&self) -> Address {
        self.address
    }

    fn ordinal(&self) -> OrdinalIndex {
        self.ordinal_index
    }

    fn set_ordinal(&mut self, ordinal: OrdinalIndex) {
        self.ordinal_index = ordinal;
    }
}

/// Token standard of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Fungible token.
    Erc20,
    /// Non-fungible token.
    Erc721,
    /// Multi-token.
    Erc1155,
}

/// A token transfer decoded from a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransaction {
    /// Transaction that emitted the transfer.
    pub tx_hash: TxHash,
    /// Log index of the transfer event.
    pub log_index: u32,
    /// Block of the transfer.
    pub block_number: u64,
    /// Token contract.
    pub token: Address,
    /// Token standard.
    pub token_type: TokenType,
    /// Sender.
    pub from: Address,
    /// Recipient.
    pub to: Address,
    /// Token id for non-fungible transfers.
    pub token_id: Option<String>,
    /// Transferred amount.
    pub amount: Amount,
    /// Block timestamp.
    pub timestamp: DateTime<Utc>,
    /// Pagination sort key.
    pub ordinal_index: OrdinalIndex,
}

impl TokenTransaction {
    /// Builds a token transfer ordered by its emitting log.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OrdinalOverflow`] if the position does not fit.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tx_hash: TxHash,
        position: BlockPosition,
        token: Address,
        token_type: TokenType,
        from: Address,
        to: Address,
        amount: Amount,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, IndexError> {
        Ok(Self {
            tx_hash,
            log_index: position.log_index,
            block_number: position.block,
            token,
            token_type,
            from,
            to,
            token_id: None,
            amount,
            timestamp,
            ordinal_index: OrdinalIndex::from_position(position)?,
        })
    }
}

impl Record for TokenTransaction {
    type Key = LogKey;
    const KIND: RecordKind = RecordKind::TokenTransaction;

    fn key(&self) -> LogKey {
        LogKey {
            tx_hash: self.tx_hash,
            log_index: self.log_index,
        }
    }

    fn ordinal(&self) -> OrdinalIndex {
        self.ordinal_index
    }

    fn set_ordinal(&mut self, ordinal: OrdinalIndex) {
        self.ordinal_index = ordinal;
    }
}
