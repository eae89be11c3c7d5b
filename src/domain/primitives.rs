//! Chain primitives: transaction hashes, addresses and token amounts.
//!
//! Hashes and addresses are parsed from `0x`-prefixed hex (any case) and
//! always rendered lowercase, so their string form is canonical and can be
//! used directly as a storage key or filter value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::IndexError;

fn decode_fixed<const N: usize>(raw: &str, what: &str) -> Result<[u8; N], IndexError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| IndexError::InvalidKey(format!("{what} `{raw}` is missing 0x prefix")))?;
    let mut out = [0u8; N];
    hex::decode_to_slice(digits, &mut out)
        .map_err(|e| IndexError::InvalidKey(format!("{what} `{raw}`: {e}")))?;
    Ok(out)
}

/// 32-byte transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxHash([u8; 32]);

impl TxHash {
    /// Wraps raw hash bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw hash bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// 20-byte account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// Wraps raw address bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Returns the raw address bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

macro_rules! hex_newtype {
    ($ty:ident, $len:literal, $what:literal) => {
        impl FromStr for $ty {
            type Err = IndexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                decode_fixed::<$len>(s, $what).map(Self)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_newtype!(TxHash, 32, "transaction hash");
hex_newtype!(Address, 20, "address");

/// Token amount in the token's smallest unit.
///
/// Serialized as a decimal string so `u128` precision survives JSON and
/// JSONB round trips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw amount.
    #[must_use]
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Returns the raw amount.
    #[must_use]
    pub const fn get(self) -> u128 {
        self.0
    }

    /// Adds two amounts, saturating at `u128::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Returns `true` if the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Drops the trailing `decimals - precision` digits, keeping at most
    /// `precision` fractional digits of a token with `decimals` places.
    #[must_use]
    pub fn truncate_to_precision(self, decimals: u8, precision: u8) -> Self {
        let drop = u32::from(decimals.saturating_sub(precision));
        match 10u128.checked_pow(drop) {
            Some(divisor) => Self(self.0 / divisor),
            None => Self::ZERO,
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u128>()
            .map(Self)
            .map_err(|e| serde::de::Error::custom(format!("amount `{raw}`: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn hash_parses_mixed_case_and_renders_lowercase() {
        let raw = format!("0x{}", "AB".repeat(32));
        let Ok(hash) = raw.parse::<TxHash>() else {
            panic!("hash should parse");
        };
        assert_eq!(hash.to_string(), format!("0x{}", "ab".repeat(32)));
    }

    #[test]
    fn address_rejects_wrong_length_and_prefix() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("12".repeat(20).parse::<Address>().is_err());
    }

    #[test]
    fn amount_serializes_as_string() {
        let amount = Amount::new(u128::MAX);
        let Ok(json) = serde_json::to_string(&amount) else {
            panic!("amount should serialize");
        };
        assert_eq!(json, format!("\"{}\"", u128::MAX));
        let Ok(back) = serde_json::from_str::<Amount>(&json) else {
            panic!("amount should deserialize");
        };
        assert_eq!(back, amount);
    }

    #[test]
    fn truncation_keeps_requested_precision() {
        // 0.0000004 of an 18-decimal token at 6 places of precision.
        let dust = Amount::new(400_000_000_000);
        assert!(dust.truncate_to_precision(18, 6).is_zero());
        // 1.5 tokens keep their value at 6 places.
        let whole = Amount::new(1_500_000_000_000_000_000);
        assert_eq!(whole.truncate_to_precision(18, 6).get(), 1_500_000);
        // Tokens with fewer decimals than the precision are untouched.
        assert_eq!(Amount::new(7).truncate_to_precision(2, 6).get(), 7);
    }
}
