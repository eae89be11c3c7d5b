//! Data Transfer Objects for REST request/response serialization.
//!
//! Amounts inside records are serialized as JSON strings to prevent
//! precision loss on u128 values.

pub mod list_dto;

pub use list_dto::*;
