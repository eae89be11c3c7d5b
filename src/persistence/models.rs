//! Database row models.

use serde_json::Value;
use sqlx::FromRow;

use crate::domain::{OrdinalIndex, Record, RecordKey};
use crate::error::IndexError;

/// A row of the `indexed_records` table.
#[derive(Debug, Clone, FromRow)]
pub struct StoredRecord {
    /// Record kind discriminator (e.g. `"transaction"`).
    pub kind: String,
    /// Canonical primary key.
    pub pk: String,
    /// Ordinal assigned on first insert.
    pub ordinal: i64,
    /// Full record as JSONB.
    pub payload: Value,
}

impl StoredRecord {
    /// Builds the row for a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the ordinal does not fit a signed column or the
    /// record fails to serialize.
    pub fn from_record<R: Record>(record: &R) -> Result<Self, IndexError> {
        Ok(Self {
            kind: R::KIND.as_str().to_string(),
            pk: record.key().encode(),
            ordinal: i64::try_from(record.ordinal())?,
            payload: serde_json::to_value(record)?,
        })
    }

    /// Decodes the payload back into a record, trusting the ordinal column.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not deserialize as `R`.
    pub fn into_record<R: Record>(self) -> Result<R, IndexError> {
        let mut record: R = serde_json::from_value(self.payload)?;
        record.set_ordinal(OrdinalIndex::try_from(self.ordinal)?);
        Ok(record)
    }
}
