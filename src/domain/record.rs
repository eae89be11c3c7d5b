//! The [`Record`] capability shared by every indexed entity.
//!
//! The pagination engine and the stores are written once against this
//! trait; each concrete entity (transaction, delegation, swap, ...) only
//! states its kind, its primary key and its ordinal.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::ordinal::OrdinalIndex;
use super::primitives::{Address, TxHash};
use crate::error::IndexError;

/// Discriminator for every indexed record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Chain transaction.
    Transaction,
    /// Stake delegated to a validator.
    Delegation,
    /// Claimed staking reward.
    RewardClaim,
    /// Request to withdraw delegated stake.
    WithdrawRequest,
    /// Sealed epoch.
    Epoch,
    /// Deployed smart contract.
    Contract,
    /// Token transfer emitted by a token contract.
    TokenTransaction,
    /// Swap or reserve-sync event on a DEX pair.
    Swap,
    /// Cumulative fee burn for a block.
    Burn,
}

impl RecordKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Transaction,
        Self::Delegation,
        Self::RewardClaim,
        Self::WithdrawRequest,
        Self::Epoch,
        Self::Contract,
        Self::TokenTransaction,
        Self::Swap,
        Self::Burn,
    ];

    /// Returns the kind as a static string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transaction => "transaction",
            Self::Delegation => "delegation",
            Self::RewardClaim => "reward_claim",
            Self::WithdrawRequest => "withdraw_request",
            Self::Epoch => "epoch",
            Self::Contract => "contract",
            Self::TokenTransaction => "token_transaction",
            Self::Swap => "swap",
            Self::Burn => "burn",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| IndexError::InvalidKey(format!("unknown record kind `{s}`")))
    }
}

/// A natural primary key with a canonical string form.
pub trait RecordKey: Clone + fmt::Debug + PartialEq + Eq + Hash + Send + Sync + 'static {
    /// Canonical string form used for storage and cursors.
    fn encode(&self) -> String;

    /// Parses the canonical string form.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidKey`] if `raw` is not a valid key.
    fn decode(raw: &str) -> Result<Self, IndexError>;
}

/// An indexed, paginated entity.
pub trait Record:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Natural primary key type.
    type Key: RecordKey;

    /// Kind tag carried by cursors and storage rows.
    const KIND: RecordKind;

    /// Returns the immutable primary key.
    fn key(&self) -> Self::Key;

    /// Returns the ordinal used as the pagination sort key.
    fn ordinal(&self) -> OrdinalIndex;

    /// Overwrites the ordinal; stores use this to keep the ordinal that
    /// was assigned on first insert.
    fn set_ordinal(&mut self, ordinal: OrdinalIndex);
}

impl RecordKey for TxHash {
    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(raw: &str) -> Result<Self, IndexError> {
        raw.parse()
    }
}

impl RecordKey for Address {
    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(raw: &str) -> Result<Self, IndexError> {
        raw.parse()
    }
}

impl RecordKey for u64 {
    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(raw: &str) -> Result<Self, IndexError> {
        raw.parse()
            .map_err(|e| IndexError::InvalidKey(format!("`{raw}`: {e}")))
    }
}

fn split_pair<'a>(raw: &'a str, what: &str) -> Result<(&'a str, &'a str), IndexError> {
    raw.split_once(':')
        .ok_or_else(|| IndexError::InvalidKey(format!("{what} `{raw}` is missing `:`")))
}

fn parse_u64(raw: &str, what: &str) -> Result<u64, IndexError> {
    raw.parse()
        .map_err(|e| IndexError::InvalidKey(format!("{what} `{raw}`: {e}")))
}

/// Key of a record emitted by a single log: transaction hash + log index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogKey {
    /// Transaction that emitted the log.
    pub tx_hash: TxHash,
    /// Log index within the transaction.
    pub log_index: u32,
}

impl RecordKey for LogKey {
    fn encode(&self) -> String {
        format!("{}:{}", self.tx_hash, self.log_index)
    }

    fn decode(raw: &str) -> Result<Self, IndexError> {
        let (hash, index) = split_pair(raw, "log key")?;
        let log_index = u32::try_from(parse_u64(index, "log index")?)
            .map_err(|e| IndexError::InvalidKey(format!("log index `{index}`: {e}")))?;
        Ok(Self {
            tx_hash: hash.parse()?,
            log_index,
        })
    }
}

/// Key of a delegation: delegator + validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DelegationKey {
    /// Delegating account.
    pub delegator: Address,
    /// Validator the stake is delegated to.
    pub validator_id: u64,
}

impl RecordKey for DelegationKey {
    fn encode(&self) -> String {
        format!("{}:{}", self.delegator, self.validator_id)
    }

    fn decode(raw: &str) -> Result<Self, IndexError> {
        let (delegator, validator) = split_pair(raw, "delegation key")?;
        Ok(Self {
            delegator: delegator.parse()?,
            validator_id: parse_u64(validator, "validator id")?,
        })
    }
}

/// Key of a withdraw request: request owner + request id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WithdrawRequestKey {
    /// Account that owns the request.
    pub owner: Address,
    /// Owner-scoped request id.
    pub request_id: u64,
}

impl RecordKey for WithdrawRequestKey {
    fn encode(&self) -> String {
        format!("{}:{}", self.owner, self.request_id)
    }

    fn decode(raw: &str) -> Result<Self, IndexError> {
        let (owner, request) = split_pair(raw, "withdraw request key")?;
        Ok(Self {
            owner: owner.parse()?,
            request_id: parse_u64(request, "request id")?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_its_own_name() {
        for kind in RecordKind::ALL {
            let Ok(parsed) = kind.as_str().parse::<RecordKind>() else {
                panic!("{kind} should parse");
            };
            assert_eq!(parsed, kind);
        }
        assert!("block".parse::<RecordKind>().is_err());
    }

    #[test]
    fn composite_keys_use_canonical_form() {
        let key = DelegationKey {
            delegator: Address::from_bytes([0xAB; 20]),
            validator_id: 17,
        };
        let encoded = key.encode();
        assert_eq!(encoded, format!("0x{}:17", "ab".repeat(20)));
        let Ok(decoded) = DelegationKey::decode(&encoded.to_uppercase().replacen("0X", "0x", 1))
        else {
            panic!("upper-case key should decode");
        };
        assert_eq!(decoded, key);
    }

    #[test]
    fn log_key_rejects_missing_separator() {
        let raw = format!("0x{}", "00".repeat(32));
        assert!(LogKey::decode(&raw).is_err());
        assert!(LogKey::decode(&format!("{raw}:x")).is_err());
        assert!(LogKey::decode(&format!("{raw}:3")).is_ok());
    }
}
