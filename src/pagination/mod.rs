//! Ordinal-indexed keyset pagination.
//!
//! A listing request is `(filter, cursor, count)`. The sign of `count`
//! picks the scan direction: positive pages down from the top (highest
//! ordinal), negative pages up from the bottom. The flow is:
//!
//! 1. [`Cursor`] decodes the opaque token into a typed primary key.
//! 2. [`RangeResolver`] turns it into a starting `(ordinal, key)` position
//!    within the filter.
//! 3. [`ListLoader`] scans `|count| + 1` records from there and fills a
//!    [`ListResult`], reversing backward pages so every page reads
//!    top-first.
//!
//! [`ListEngine`] ties these together for one record type, with an
//! optional cache in front of the store.

pub mod cursor;
pub mod engine;
pub mod list_result;
pub mod loader;
pub mod range;

pub use cursor::Cursor;
pub use engine::ListEngine;
pub use list_result::ListResult;
pub use loader::ListLoader;
pub use range::{Anchor, Direction, PageRequest, RangeResolver, ResolvedRange};
