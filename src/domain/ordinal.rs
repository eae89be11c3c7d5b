//! Ordinal index assignment.
//!
//! An [`OrdinalIndex`] is the per-record-type sort key used by keyset
//! pagination. It is a pure function of the record's position on chain:
//! block height, then transaction index within the block, then log index
//! within the transaction, packed into a single `u64`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Number of bits reserved for the in-block transaction index.
pub const TX_INDEX_BITS: u32 = 14;

/// Number of bits reserved for the in-transaction log index.
pub const LOG_INDEX_BITS: u32 = 10;

/// Highest block height that still packs into a signed 64-bit column.
pub const MAX_BLOCK: u64 = (1 << (63 - TX_INDEX_BITS - LOG_INDEX_BITS)) - 1;

/// Position of a record in blockchain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockPosition {
    /// Block height.
    pub block: u64,
    /// Transaction index within the block.
    pub tx_index: u32,
    /// Log index within the transaction.
    pub log_index: u32,
}

impl BlockPosition {
    /// Position of a whole transaction (no log).
    #[must_use]
    pub const fn transaction(block: u64, tx_index: u32) -> Self {
        Self {
            block,
            tx_index,
            log_index: 0,
        }
    }

    /// Position of a single log inside a transaction.
    #[must_use]
    pub const fn log(block: u64, tx_index: u32, log_index: u32) -> Self {
        Self {
            block,
            tx_index,
            log_index,
        }
    }
}

/// Monotonic per-record-type sort key.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct OrdinalIndex(u64);

impl OrdinalIndex {
    /// Wraps a raw ordinal value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Packs a block position into an ordinal.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OrdinalOverflow`] when any component exceeds
    /// the bits reserved for it.
    pub fn from_position(position: BlockPosition) -> Result<Self, IndexError> {
        let BlockPosition {
            block,
            tx_index,
            log_index,
        } = position;
        if block > MAX_BLOCK {
            return Err(IndexError::OrdinalOverflow(format!(
                "block {block} exceeds {MAX_BLOCK}"
            )));
        }
        if u64::from(tx_index) >= 1 << TX_INDEX_BITS {
            return Err(IndexError::OrdinalOverflow(format!(
                "transaction index {tx_index} exceeds {TX_INDEX_BITS} bits"
            )));
        }
        if u64::from(log_index) >= 1 << LOG_INDEX_BITS {
            return Err(IndexError::OrdinalOverflow(format!(
                "log index {log_index} exceeds {LOG_INDEX_BITS} bits"
            )));
        }
        let value = (((block << TX_INDEX_BITS) | u64::from(tx_index)) << LOG_INDEX_BITS)
            | u64::from(log_index);
        Ok(Self(value))
    }
}

impl fmt::Display for OrdinalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<OrdinalIndex> for i64 {
    type Error = IndexError;

    fn try_from(ordinal: OrdinalIndex) -> Result<Self, Self::Error> {
        Self::try_from(ordinal.0)
            .map_err(|_| IndexError::OrdinalOverflow(format!("{ordinal} exceeds i64")))
    }
}

impl TryFrom<i64> for OrdinalIndex {
    type Error = IndexError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| IndexError::OrdinalOverflow(format!("negative ordinal {value}")))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn ordinal(block: u64, tx: u32, log: u32) -> OrdinalIndex {
        let Ok(o) = OrdinalIndex::from_position(BlockPosition::log(block, tx, log)) else {
            panic!("position should pack");
        };
        o
    }

    #[test]
    fn orders_by_block_then_tx_then_log() {
        assert!(ordinal(10, 0, 0) < ordinal(10, 0, 1));
        assert!(ordinal(10, 0, 1023) < ordinal(10, 1, 0));
        assert!(ordinal(10, 16_383, 1023) < ordinal(11, 0, 0));
    }

    #[test]
    fn rejects_oversized_components() {
        assert!(OrdinalIndex::from_position(BlockPosition::log(1, 1 << 14, 0)).is_err());
        assert!(OrdinalIndex::from_position(BlockPosition::log(1, 0, 1 << 10)).is_err());
        assert!(OrdinalIndex::from_position(BlockPosition::log(MAX_BLOCK + 1, 0, 0)).is_err());
    }

    #[test]
    fn max_position_fits_signed_column() {
        let top = ordinal(MAX_BLOCK, 16_383, 1023);
        assert!(i64::try_from(top).is_ok());
    }
}
