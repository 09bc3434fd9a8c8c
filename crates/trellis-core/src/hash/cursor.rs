//! # Hash Cursor
//!
//! A positioned iterator over one hash's key/value pairs.
//!
//! The generic layer owns the state machine; backends only move.
//!
//! ```text
//! Uninitialized --First--> Positioned | Exhausted
//! Positioned   --Next----> Positioned | Exhausted
//! Positioned   --NextValue-> Positioned | ValuesExhausted
//! ValuesExhausted --Next--> Positioned | Exhausted
//! any          --First---> Positioned | Exhausted
//! ```
//!
//! `Next` or `NextValue` before the first `First` is an `InvalidArgument`.

use super::backend::BackendCursor;
use super::datum::HashDatum;
use crate::types::{TrellisError, TrellisResult};

/// Cursor positioning flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorFlag {
    /// Reposition to the smallest key.
    First = 0,
    /// Advance to the next distinct key.
    Next = 1,
    /// Advance among the values of the current key.
    NextValue = 2,
}

impl TryFrom<u32> for CursorFlag {
    type Error = TrellisError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::First),
            1 => Ok(Self::Next),
            2 => Ok(Self::NextValue),
            other => Err(TrellisError::InvalidArgument(format!(
                "illegal cursor flag {}",
                other
            ))),
        }
    }
}

/// Observable cursor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Uninitialized,
    Positioned,
    /// The current key has no further values; `Next` still works.
    ValuesExhausted,
    /// No further keys.
    Exhausted,
}

/// A pair returned by a cursor.
pub type CursorEntry = (HashDatum, HashDatum);

/// Cursor bound to one open hash for its lifetime `'h`.
pub struct HashCursor<'h> {
    inner: Option<Box<dyn BackendCursor + 'h>>,
    state: CursorState,
}

impl std::fmt::Debug for HashCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashCursor")
            .field("state", &self.state)
            .field("finished", &self.inner.is_none())
            .finish()
    }
}

impl<'h> HashCursor<'h> {
    pub(crate) fn new(inner: Box<dyn BackendCursor + 'h>) -> Self {
        tracing::debug!("hash cursor initialized");
        Self {
            inner: Some(inner),
            state: CursorState::Uninitialized,
        }
    }

    #[must_use]
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Move according to `flag` and return the pair under the cursor.
    pub fn get(&mut self, flag: CursorFlag) -> TrellisResult<Option<CursorEntry>> {
        let Some(inner) = self.inner.as_mut() else {
            return Err(TrellisError::Resource(
                "cursor already finished".to_string(),
            ));
        };

        match (flag, self.state) {
            (CursorFlag::First, _) => {
                let entry = inner.get(CursorFlag::First)?;
                self.state = if entry.is_some() {
                    CursorState::Positioned
                } else {
                    CursorState::Exhausted
                };
                Ok(entry)
            }
            (_, CursorState::Uninitialized) => Err(TrellisError::InvalidArgument(format!(
                "cursor {:?} issued before First",
                flag
            ))),
            (_, CursorState::Exhausted) => Ok(None),
            (CursorFlag::Next, _) => {
                let entry = inner.get(CursorFlag::Next)?;
                self.state = if entry.is_some() {
                    CursorState::Positioned
                } else {
                    CursorState::Exhausted
                };
                Ok(entry)
            }
            (CursorFlag::NextValue, CursorState::ValuesExhausted) => Ok(None),
            (CursorFlag::NextValue, _) => {
                let entry = inner.get(CursorFlag::NextValue)?;
                if entry.is_none() {
                    self.state = CursorState::ValuesExhausted;
                }
                Ok(entry)
            }
        }
    }

    /// Position on the first value of exactly `key`.
    ///
    /// Like `First`, this is legal in any state. A missing key leaves the
    /// cursor `Exhausted`.
    pub fn set(&mut self, key: &[u8]) -> TrellisResult<Option<CursorEntry>> {
        let Some(inner) = self.inner.as_mut() else {
            return Err(TrellisError::Resource(
                "cursor already finished".to_string(),
            ));
        };
        let entry = inner.set(key)?;
        self.state = if entry.is_some() {
            CursorState::Positioned
        } else {
            CursorState::Exhausted
        };
        Ok(entry)
    }

    pub fn get_first(&mut self) -> TrellisResult<Option<CursorEntry>> {
        self.get(CursorFlag::First)
    }

    pub fn get_next(&mut self) -> TrellisResult<Option<CursorEntry>> {
        self.get(CursorFlag::Next)
    }

    pub fn get_next_value(&mut self) -> TrellisResult<Option<CursorEntry>> {
        self.get(CursorFlag::NextValue)
    }

    /// Whether `finish` has run.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.is_none()
    }

    /// Release the backend cursor now.
    pub fn finish(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            inner.finish();
            tracing::debug!("hash cursor finished");
        }
    }
}

impl Drop for HashCursor<'_> {
    fn drop(&mut self) {
        self.release();
    }
}
