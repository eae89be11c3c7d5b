//! # ledger-index
//!
//! Off-chain index of blockchain-derived records served as stable,
//! bidirectional, keyset-paginated listings, with idempotent
//! reconciliation of the burn ledger and of swap/sync reserve state.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)                Ingestion
//!     │                             │
//!     ├── REST Handlers (api/)      ├── EventReconciler (reconcile/)
//!     │                             │
//!     ├── IndexService (service/) ──┤
//!     │                             │
//!     ├── ListEngine (pagination/)  ◄┘
//!     ├── RecordCache (cache)
//!     │
//!     └── RecordStore (persistence/): memory or PostgreSQL
//! ```
//!
//! Records are ordered by an [`domain::OrdinalIndex`] packed from their
//! block position. A listing is `list(filter, cursor, count)` where the
//! sign of `count` picks the direction; see [`pagination`].

pub mod api;
pub mod app_state;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod pagination;
pub mod persistence;
pub mod reconcile;
pub mod service;
