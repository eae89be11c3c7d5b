//! DEX swap and reserve-sync state.
//!
//! A single transaction can emit several swap-related logs for the same
//! pair (a `Sync` reserve snapshot and the `Swap` itself). They share one
//! [`SwapKey`], a SHA-256 digest of transaction hash and pair address, and
//! are reconciled into a single [`SwapState`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use super::ordinal::{BlockPosition, OrdinalIndex};
use super::primitives::{Address, Amount, TxHash};
use super::record::{Record, RecordKey, RecordKind};
use crate::error::IndexError;

/// Content-derived identity of a swap event.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwapKey([u8; 32]);

impl SwapKey {
    /// Derives the key from the emitting transaction and the pair.
    #[must_use]
    pub fn derive(tx_hash: &TxHash, pair: &Address) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(tx_hash.as_bytes());
        hasher.update(pair.as_bytes());
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());
        Self(digest)
    }
}

impl fmt::Display for SwapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for SwapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SwapKey({self})")
    }
}

impl RecordKey for SwapKey {
    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(raw: &str) -> Result<Self, IndexError> {
        // Same wire shape as a transaction hash.
        raw.parse::<TxHash>()
            .map(|hash| Self(*hash.as_bytes()))
            .map_err(|_| IndexError::InvalidKey(format!("swap key `{raw}`")))
    }
}

impl Serialize for SwapKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SwapKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::decode(&raw).map_err(serde::de::Error::custom)
    }
}

/// Shape of a swap-related event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapType {
    /// Trade event carrying in/out amounts.
    Swap,
    /// Reserve snapshot carrying only reserves.
    Sync,
}

/// Pair reserves after an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    /// Reserve of token 0.
    pub reserve0: Amount,
    /// Reserve of token 1.
    pub reserve1: Amount,
}

/// In/out amounts of a trade, per token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeAmounts {
    /// Token 0 paid in.
    pub amount0_in: Amount,
    /// Token 0 paid out.
    pub amount0_out: Amount,
    /// Token 1 paid in.
    pub amount1_in: Amount,
    /// Token 1 paid out.
    pub amount1_out: Amount,
}

/// Decimal places of the two pair tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairDecimals {
    /// Decimals of token 0.
    pub decimals0: u8,
    /// Decimals of token 1.
    pub decimals1: u8,
}

/// Reconciled swap state for one (transaction, pair).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapState {
    /// Content-derived identity.
    pub key: SwapKey,
    /// Event shape this state was last stored as.
    pub swap_type: SwapType,
    /// Pair contract.
    pub pair: Address,
    /// Emitting transaction.
    pub tx_hash: TxHash,
    /// Block of the event.
    pub block_number: u64,
    /// Trade amounts; all zero for a sync placeholder.
    #[serde(flatten)]
    pub amounts: TradeAmounts,
    /// Reserves after the event.
    #[serde(flatten)]
    pub reserves: Reserves,
    /// Token decimals of the pair.
    #[serde(flatten)]
    pub decimals: PairDecimals,
    /// Block timestamp.
    pub timestamp: DateTime<Utc>,
    /// Pagination sort key.
    pub ordinal_index: OrdinalIndex,
}

impl SwapState {
    /// Builds a swap-typed event.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OrdinalOverflow`] if the position does not fit.
    pub fn swap(
        pair: Address,
        tx_hash: TxHash,
        position: BlockPosition,
        amounts: TradeAmounts,
        decimals: PairDecimals,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, IndexError> {
        Ok(Self {
            key: SwapKey::derive(&tx_hash, &pair),
            swap_type: SwapType::Swap,
            pair,
            tx_hash,
            block_number: position.block,
            amounts,
            reserves: Reserves::default(),
            decimals,
            timestamp,
            ordinal_index: OrdinalIndex::from_position(position)?,
        })
    }

    /// Builds a sync-typed (reserve snapshot) event.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OrdinalOverflow`] if the position does not fit.
    pub fn sync(
        pair: Address,
        tx_hash: TxHash,
        position: BlockPosition,
        reserves: Reserves,
        decimals: PairDecimals,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, IndexError> {
        Ok(Self {
            key: SwapKey::derive(&tx_hash, &pair),
            swap_type: SwapType::Sync,
            pair,
            tx_hash,
            block_number: position.block,
            amounts: TradeAmounts::default(),
            reserves,
            decimals,
            timestamp,
            ordinal_index: OrdinalIndex::from_position(position)?,
        })
    }

    /// Per-token trade legs (`in + out`).
    #[must_use]
    pub const fn legs(&self) -> (Amount, Amount) {
        (
            self.amounts.amount0_in.saturating_add(self.amounts.amount0_out),
            self.amounts.amount1_in.saturating_add(self.amounts.amount1_out),
        )
    }

    /// Returns `true` when both legs truncate to zero at `precision`
    /// fractional digits.
    #[must_use]
    pub fn has_dust_legs(&self, precision: u8) -> bool {
        let (leg0, leg1) = self.legs();
        leg0.truncate_to_precision(self.decimals.decimals0, precision)
            .is_zero()
            && leg1
                .truncate_to_precision(self.decimals.decimals1, precision)
                .is_zero()
    }
}

impl Record for SwapState {
    type Key = SwapKey;
    const KIND: RecordKind = RecordKind::Swap;

    fn key(&self) -> SwapKey {
        self.key
    }

    fn ordinal(&self) -> OrdinalIndex {
        self.ordinal_index
    }

    fn set_ordinal(&mut self, ordinal: OrdinalIndex) {
        self.ordinal_index = ordinal;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const DECIMALS: PairDecimals = PairDecimals {
        decimals0: 18,
        decimals1: 6,
    };

    fn pair() -> Address {
        Address::from_bytes([0x11; 20])
    }

    #[test]
    fn key_depends_on_tx_and_pair() {
        let tx_a = TxHash::from_bytes([1; 32]);
        let tx_b = TxHash::from_bytes([2; 32]);
        let other_pair = Address::from_bytes([0x22; 20]);
        assert_eq!(SwapKey::derive(&tx_a, &pair()), SwapKey::derive(&tx_a, &pair()));
        assert_ne!(SwapKey::derive(&tx_a, &pair()), SwapKey::derive(&tx_b, &pair()));
        assert_ne!(SwapKey::derive(&tx_a, &pair()), SwapKey::derive(&tx_a, &other_pair));
    }

    #[test]
    fn key_encoding_round_trips() {
        let key = SwapKey::derive(&TxHash::from_bytes([9; 32]), &pair());
        let Ok(decoded) = SwapKey::decode(&key.encode()) else {
            panic!("key should decode");
        };
        assert_eq!(decoded, key);
    }

    #[test]
    fn dust_legs_detected_after_truncation() {
        let amounts = TradeAmounts {
            amount0_in: Amount::new(10),
            amount1_out: Amount::ZERO,
            ..TradeAmounts::default()
        };
        let Ok(dust) = SwapState::swap(
            pair(),
            TxHash::from_bytes([3; 32]),
            BlockPosition::log(5, 0, 1),
            amounts,
            DECIMALS,
            Utc::now(),
        ) else {
            panic!("swap should build");
        };
        assert!(dust.has_dust_legs(6));

        let real = SwapState {
            amounts: TradeAmounts {
                amount1_out: Amount::new(2_000_000),
                ..amounts
            },
            ..dust
        };
        assert!(!real.has_dust_legs(6));
    }

    #[test]
    fn flattened_fields_are_filterable() {
        let Ok(sync) = SwapState::sync(
            pair(),
            TxHash::from_bytes([4; 32]),
            BlockPosition::log(5, 0, 0),
            Reserves {
                reserve0: Amount::new(7),
                reserve1: Amount::new(8),
            },
            DECIMALS,
            Utc::now(),
        ) else {
            panic!("sync should build");
        };
        let Ok(json) = serde_json::to_value(&sync) else {
            panic!("sync should serialize");
        };
        assert_eq!(json.get("reserve0").and_then(|v| v.as_str()), Some("7"));
        assert_eq!(json.get("swap_type").and_then(|v| v.as_str()), Some("sync"));
    }
}
