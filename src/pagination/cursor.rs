//! Typed pagination cursors.
//!
//! A cursor carries the record kind and the primary key of the record a
//! page ended on. On the wire it is the token `"{kind}:{hex(key)}"`; the
//! key is hex-encoded so composite keys may contain any character.

use std::fmt;
use std::marker::PhantomData;

use crate::domain::{Record, RecordKey};
use crate::error::IndexError;

/// Position of a record inside a listing of `R`.
pub struct Cursor<R: Record> {
    key: R::Key,
    kind: PhantomData<fn() -> R>,
}

impl<R: Record> Cursor<R> {
    /// Cursor pointing at the record with `key`.
    #[must_use]
    pub fn new(key: R::Key) -> Self {
        Self {
            key,
            kind: PhantomData,
        }
    }

    /// Cursor pointing at `record`.
    #[must_use]
    pub fn of(record: &R) -> Self {
        Self::new(record.key())
    }

    /// Primary key the cursor points at.
    #[must_use]
    pub const fn key(&self) -> &R::Key {
        &self.key
    }

    /// Renders the opaque token.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{}:{}",
            R::KIND.as_str(),
            hex::encode(self.key.encode().as_bytes())
        )
    }

    /// Parses a token produced by [`Cursor::encode`] for the same kind.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidCursor`] if the token is malformed or
    /// was issued for another record kind.
    pub fn decode(token: &str) -> Result<Self, IndexError> {
        let Some((kind, payload)) = token.split_once(':') else {
            return Err(IndexError::InvalidCursor(format!("malformed cursor `{token}`")));
        };
        if kind != R::KIND.as_str() {
            return Err(IndexError::InvalidCursor(format!(
                "cursor for `{kind}` used on a `{}` listing",
                R::KIND
            )));
        }
        let bytes = hex::decode(payload)
            .map_err(|e| IndexError::InvalidCursor(format!("cursor payload: {e}")))?;
        let raw = String::from_utf8(bytes)
            .map_err(|_| IndexError::InvalidCursor("cursor payload is not text".to_string()))?;
        let key = R::Key::decode(&raw)
            .map_err(|e| IndexError::InvalidCursor(format!("cursor key: {e}")))?;
        Ok(Self::new(key))
    }
}

impl<R: Record> Clone for Cursor<R> {
    fn clone(&self) -> Self {
        Self::new(self.key.clone())
    }
}

impl<R: Record> PartialEq for Cursor<R> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<R: Record> Eq for Cursor<R> {}

impl<R: Record> fmt::Debug for Cursor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("kind", &R::KIND)
            .field("key", &self.key)
            .finish()
    }
}

impl<R: Record> fmt::Display for Cursor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
