//! Staking records: delegations, reward claims and withdraw requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ordinal::{BlockPosition, OrdinalIndex};
use super::primitives::{Address, Amount, TxHash};
use super::record::{DelegationKey, LogKey, Record, RecordKind, WithdrawRequestKey};
use crate::error::IndexError;

/// Stake delegated by an account to a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Delegating account.
    pub delegator: Address,
    /// Validator receiving the stake.
    pub validator_id: u64,
    /// Currently delegated amount.
    pub amount: Amount,
    /// Transaction that created the delegation.
    pub created_tx: TxHash,
    /// Block of the creating transaction.
    pub created_block: u64,
    /// Time the delegation was created.
    pub created_at: DateTime<Utc>,
    /// Pagination sort key.
    pub ordinal_index: OrdinalIndex,
}

impl Delegation {
    /// Builds a delegation ordered by its creating transaction.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OrdinalOverflow`] if the position does not fit.
    pub fn new(
        key: DelegationKey,
        amount: Amount,
        created_tx: TxHash,
        position: BlockPosition,
        created_at: DateTime<Utc>,
    ) -> Result<Self, IndexError> {
        Ok(Self {
            delegator: key.delegator,
            validator_id: key.validator_id,
            amount,
            created_tx,
            created_block: position.block,
            created_at,
            ordinal_index: OrdinalIndex::from_position(position)?,
        })
    }
}

impl Record for Delegation {
    type Key = DelegationKey;
    const KIND: RecordKind = RecordKind::Delegation;

    fn key(&self) -> DelegationKey {
        DelegationKey {
            delegator: self.delegator,
            validator_id: self.validator_id,
        }
    }

    fn ordinal(&self) -> OrdinalIndex {
        self.ordinal_index
    }

    fn set_ordinal(&mut self, ordinal: OrdinalIndex) {
        self.ordinal_index = ordinal;
    }
}

/// Staking reward claimed (or restaked) by a delegator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardClaim {
    /// Claim transaction.
    pub tx_hash: TxHash,
    /// Log index of the claim event.
    pub log_index: u32,
    /// Claiming delegator.
    pub delegator: Address,
    /// Validator the reward was earned on.
    pub validator_id: u64,
    /// Claimed amount.
    pub amount: Amount,
    /// `true` if the reward was restaked instead of paid out.
    pub restaked: bool,
    /// Block of the claim.
    pub block_number: u64,
    /// Time of the claim.
    pub claimed_at: DateTime<Utc>,
    /// Pagination sort key.
    pub ordinal_index: OrdinalIndex,
}

impl RewardClaim {
    /// Builds a reward claim ordered by its emitting log.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OrdinalOverflow`] if the position does not fit.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tx_hash: TxHash,
        position: BlockPosition,
        delegator: Address,
        validator_id: u64,
        amount: Amount,
        restaked: bool,
        claimed_at: DateTime<Utc>,
    ) -> Result<Self, IndexError> {
        Ok(Self {
            tx_hash,
            log_index: position.log_index,
            delegator,
            validator_id,
            amount,
            restaked,
            block_number: position.block,
            claimed_at,
            ordinal_index: OrdinalIndex::from_position(position)?,
        })
    }
}

impl Record for RewardClaim {
    type Key = LogKey;
    const KIND: RecordKind = RecordKind::RewardClaim;

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

/// Request to undelegate stake, finalized by a later withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    /// Account that owns the request.
    pub owner: Address,
    /// Owner-scoped request id.
    pub request_id: u64,
    /// Validator the stake is withdrawn from.
    pub validator_id: u64,
    /// Requested amount.
    pub amount: Amount,
    /// Request transaction.
    pub request_tx: TxHash,
    /// Block of the request.
    pub block_number: u64,
    /// Time of the request.
    pub requested_at: DateTime<Utc>,
    /// Time the stake was withdrawn; `None` while pending.
    pub withdrawn_at: Option<DateTime<Utc>>,
    /// Pagination sort key.
    pub ordinal_index: OrdinalIndex,
}

impl WithdrawRequest {
    /// Builds a pending withdraw request ordered by its emitting log.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OrdinalOverflow`] if the position does not fit.
    pub fn new(
        key: WithdrawRequestKey,
        validator_id: u64,
        amount: Amount,
        request_tx: TxHash,
        position: BlockPosition,
        requested_at: DateTime<Utc>,
    ) -> Result<Self, IndexError> {
        Ok(Self {
            owner: key.owner,
            request_id: key.request_id,
            validator_id,
            amount,
            request_tx,
            block_number: position.block,
            requested_at,
            withdrawn_at: None,
            ordinal_index: OrdinalIndex::from_position(position)?,
        })
    }
}

impl Record for WithdrawRequest {
    type Key = WithdrawRequestKey;
    const KIND: RecordKind = RecordKind::WithdrawRequest;

    fn key(&self) -> WithdrawRequestKey {
        WithdrawRequestKey {
            owner: self.owner,
            request_id: self.request_id,
        }
    }

    fn ordinal(&self) -> OrdinalIndex {
        self.ordinal_index
    }

    fn set_ordinal(&mut self, ordinal: OrdinalIndex) {
        self.ordinal_index = ordinal;
    }
}
