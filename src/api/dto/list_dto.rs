//! Listing query parameters and page responses.

use serde::{Deserialize, Serialize};

use crate::domain::{Filter, OrdinalIndex, Record};
use crate::error::IndexError;
use crate::pagination::ListResult;

/// Query string of every listing endpoint.
///
/// `filter` is a JSON-encoded condition list, for example
/// `[{"field":"sender","op":"eq","value":"0x..."}]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    /// Token from a previous page's `first_cursor` or `last_cursor`.
    #[serde(default)]
    pub cursor: Option<String>,
    /// Signed page size; positive pages down, negative pages up.
    #[serde(default)]
    pub count: Option<i32>,
    /// JSON-encoded [`Filter`].
    #[serde(default)]
    pub filter: Option<String>,
}

impl ListQuery {
    /// Signed page size, defaulted and clamped to `max` in magnitude.
    ///
    /// Zero is passed through so the engine rejects it.
    #[must_use]
    pub fn count(&self, default: u32, max: u32) -> i32 {
        let max = i32::try_from(max).unwrap_or(i32::MAX);
        let default = i32::try_from(default).unwrap_or(max);
        match self.count {
            None => default.min(max),
            Some(count) => count.clamp(-max, max),
        }
    }

    /// Parses the filter parameter.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidFilter`] if it is not a valid filter.
    pub fn filter(&self) -> Result<Filter, IndexError> {
        let Some(raw) = self.filter.as_deref().filter(|raw| !raw.trim().is_empty()) else {
            return Ok(Filter::all());
        };
        let filter: Filter = serde_json::from_str(raw)
            .map_err(|e| IndexError::InvalidFilter(format!("filter is not valid JSON: {e}")))?;
        filter.validate()?;
        Ok(filter)
    }
}

/// One page of a listing.
#[derive(Debug, Serialize)]
pub struct ListResponse<R> {
    /// Records, highest ordinal first.
    pub data: Vec<R>,
    /// Records matching the filter.
    pub total: u64,
    /// Ordinal of the first record.
    pub first: Option<OrdinalIndex>,
    /// Ordinal of the last record.
    pub last: Option<OrdinalIndex>,
    /// Nothing exists above this page.
    pub is_start: bool,
    /// Nothing exists below this page.
    pub is_end: bool,
    /// Filter the page was scoped by.
    pub filter: Filter,
    /// Cursor for the page above (use with a negative `count`).
    pub first_cursor: Option<String>,
    /// Cursor for the page below (use with a positive `count`).
    pub last_cursor: Option<String>,
}

impl<R: Record> From<ListResult<R>> for ListResponse<R> {
    fn from(page: ListResult<R>) -> Self {
        let first_cursor = page.first_cursor().map(|cursor| cursor.encode());
        let last_cursor = page.last_cursor().map(|cursor| cursor.encode());
        Self {
            data: page.collection,
            total: page.total,
            first: page.first,
            last: page.last,
            is_start: page.is_start,
            is_end: page.is_end,
            filter: page.filter,
            first_cursor,
            last_cursor,
        }
    }
}
