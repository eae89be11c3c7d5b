//! Domain layer: ordinals, chain primitives, filters and record types.
//!
//! Every indexed entity implements [`Record`], which is the only thing the
//! pagination engine and the stores know about it.

pub mod burn;
pub mod chain;
pub mod filter;
pub mod ordinal;
pub mod primitives;
pub mod record;
pub mod staking;
pub mod swap;
pub mod transaction;

pub use burn::BurnLedgerEntry;
pub use chain::{Contract, Epoch, TokenTransaction, TokenType};
pub use filter::{Condition, Filter, FilterOp, FilterValue};
pub use ordinal::{BlockPosition, OrdinalIndex};
pub use primitives::{Address, Amount, TxHash};
pub use record::{DelegationKey, LogKey, Record, RecordKey, RecordKind, WithdrawRequestKey};
pub use staking::{Delegation, RewardClaim, WithdrawRequest};
pub use swap::{PairDecimals, Reserves, SwapKey, SwapState, SwapType, TradeAmounts};
pub use transaction::{Transaction, TxStatus};
