//! # Hash Layer
//!
//! Generic key/value store with a pluggable backend.
//!
//! A `Hash` owns exactly one backend instance, created by the `HashFactory`
//! it was built from. The generic layer enforces the open/close protocol
//! and the cursor state machine, and builds the convenience operations
//! (`get`, `get_all`, bulk import, typed decoding, printing) on top of the
//! backend's ten primitive operations.

mod backend;
mod cursor;
mod datum;
mod iter;
mod registry;

pub use backend::{BackendCursor, HashBackend, OpenOptions, PutFlags};
pub use cursor::{CursorEntry, CursorFlag, CursorState, HashCursor};
pub use datum::HashDatum;
pub use iter::{Entries, Keys, Values};
pub use registry::{HashFactory, HashRegistry};

use crate::primitives::{FALSE_TOKENS, MEMORY_BACKEND, RECORD_SEPARATOR, TRUE_TOKENS};
use crate::storage::MemoryHash;
use crate::types::{TrellisError, TrellisResult};
use std::fs::File;
use std::io::Write;

/// A handle bound to one backend instance.
pub struct Hash {
    factory: String,
    backend: Box<dyn HashBackend>,
    identifier: Option<String>,
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hash")
            .field("factory", &self.factory)
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

fn write_error(e: std::io::Error) -> TrellisError {
    TrellisError::Resource(e.to_string())
}

impl Hash {
    pub(crate) fn from_backend(factory: String, backend: Box<dyn HashBackend>) -> Self {
        Self {
            factory,
            backend,
            identifier: None,
        }
    }

    /// An opened in-memory hash, without going through a registry.
    ///
    /// Handy for option hashes and scratch data.
    pub fn memory() -> TrellisResult<Self> {
        let mut hash = Self::from_backend(MEMORY_BACKEND.to_string(), MemoryHash::boxed());
        hash.open(MEMORY_BACKEND, &OpenOptions::default())?;
        Ok(hash)
    }

    /// Name of the factory this hash was created from.
    #[must_use]
    pub fn factory_name(&self) -> &str {
        &self.factory
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.identifier.is_some()
    }

    /// Identifier passed to the successful `open`.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    fn ensure_open(&self) -> TrellisResult<()> {
        if self.identifier.is_none() {
            return Err(TrellisError::Resource(format!(
                "{} hash is not open",
                self.factory
            )));
        }
        Ok(())
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Acquire the backend resource named by `identifier`.
    pub fn open(&mut self, identifier: &str, options: &OpenOptions) -> TrellisResult<()> {
        if let Some(current) = &self.identifier {
            return Err(TrellisError::Resource(format!(
                "{} hash already open on '{}'",
                self.factory, current
            )));
        }
        self.backend.open(identifier, options)?;
        self.identifier = Some(identifier.to_string());
        Ok(())
    }

    /// End the association with the backend resource.
    pub fn close(&mut self) -> TrellisResult<()> {
        self.ensure_open()?;
        self.backend.close()?;
        self.identifier = None;
        Ok(())
    }

    /// Flush cached backend state to persistent storage.
    pub fn sync(&mut self) -> TrellisResult<()> {
        self.ensure_open()?;
        self.backend.sync()
    }

    /// A lockable file for file-based backends.
    pub fn get_fd(&self) -> TrellisResult<&File> {
        self.ensure_open()?;
        self.backend.get_fd()
    }

    // =========================================================================
    // PRIMITIVES
    // =========================================================================

    /// Store `value` under `key` according to `flags`.
    pub fn put(
        &mut self,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
        flags: PutFlags,
    ) -> TrellisResult<()> {
        self.ensure_open()?;
        let key = key.as_ref();
        if flags.contains(PutFlags::NO_OVERWRITE) && self.backend.exists(key)? {
            return Err(TrellisError::Duplicate(format!(
                "key '{}' already present",
                String::from_utf8_lossy(key)
            )));
        }
        let flags = PutFlags::from_bits(flags.bits() & !PutFlags::NO_OVERWRITE.bits());
        self.backend.put(key, value.as_ref(), flags)
    }

    /// Whether `key` has a value. Never materializes the value.
    pub fn exists(&self, key: impl AsRef<[u8]>) -> TrellisResult<bool> {
        self.ensure_open()?;
        self.backend.exists(key.as_ref())
    }

    /// Remove every value under `key`. Returns whether the key existed.
    pub fn delete(&mut self, key: impl AsRef<[u8]>) -> TrellisResult<bool> {
        self.ensure_open()?;
        self.backend.delete(key.as_ref())
    }

    /// Create a cursor. Only one can be alive per hash.
    pub fn cursor(&self) -> TrellisResult<HashCursor<'_>> {
        self.ensure_open()?;
        Ok(HashCursor::new(self.backend.cursor()?))
    }

    // =========================================================================
    // RETRIEVAL
    // =========================================================================

    /// First value under `key`, or `None`.
    pub fn get_one(&self, key: &HashDatum) -> TrellisResult<Option<HashDatum>> {
        let mut cursor = self.cursor()?;
        let value = cursor.set(key.data())?.map(|(_, value)| value);
        cursor.finish();
        Ok(value)
    }

    /// First value under a string key, as a string.
    ///
    /// `NotFound` if the key is absent.
    pub fn get(&self, key: &str) -> TrellisResult<String> {
        let value = self
            .get_one(&HashDatum::from(key))?
            .ok_or_else(|| TrellisError::NotFound(format!("key '{}'", key)))?;
        String::from_utf8(value.into_bytes())
            .map_err(|_| TrellisError::InvalidArgument(format!("value of '{}' is not UTF-8", key)))
    }

    /// Lazy iterator over every value stored under `key`.
    pub fn get_all(&self, key: impl Into<HashDatum>) -> TrellisResult<Values<'_>> {
        self.ensure_open()?;
        Ok(Values::new(self, key.into()))
    }

    /// Lazy iterator over distinct keys, in key order.
    pub fn keys(&self) -> TrellisResult<Keys<'_>> {
        self.ensure_open()?;
        Ok(Keys::new(self))
    }

    /// Lazy iterator over every (key, value) pair, duplicates included.
    pub fn entries(&self) -> TrellisResult<Entries<'_>> {
        self.ensure_open()?;
        Ok(Entries::new(self))
    }

    // =========================================================================
    // TYPED DECODING
    // =========================================================================

    /// Decode the value under `key` as a boolean.
    ///
    /// Accepts (case-insensitive) `yes|true|1|on` and `no|false|0|off`.
    pub fn get_as_boolean(&self, key: &str) -> TrellisResult<bool> {
        let value = self.get(key)?;
        let token = value.trim().to_ascii_lowercase();
        if TRUE_TOKENS.contains(&token.as_str()) {
            Ok(true)
        } else if FALSE_TOKENS.contains(&token.as_str()) {
            Ok(false)
        } else {
            Err(TrellisError::InvalidArgument(format!(
                "value '{}' of '{}' is not a boolean",
                value, key
            )))
        }
    }

    /// Decode the value under `key` as a base-10 signed integer.
    pub fn get_as_long(&self, key: &str) -> TrellisResult<i64> {
        let value = self.get(key)?;
        value.trim().parse::<i64>().map_err(|_| {
            TrellisError::InvalidArgument(format!("value '{}' of '{}' is not a long", value, key))
        })
    }

    // =========================================================================
    // BULK IMPORT
    // =========================================================================

    /// Load newline-delimited `key=value` records.
    ///
    /// Every record is validated before anything is written, so a malformed
    /// record leaves the hash untouched. Returns the number of records.
    pub fn from_string(&mut self, text: &str) -> TrellisResult<usize> {
        self.ensure_open()?;
        let mut records = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(RECORD_SEPARATOR) else {
                return Err(TrellisError::InvalidArgument(format!(
                    "line {}: expected key{}value",
                    index + 1,
                    RECORD_SEPARATOR
                )));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(TrellisError::InvalidArgument(format!(
                    "line {}: empty key",
                    index + 1
                )));
            }
            records.push((key, value.trim()));
        }

        for (key, value) in &records {
            self.put(key, value, PutFlags::REPLACE)?;
        }
        Ok(records.len())
    }

    /// Load a flat `[key, value, key, value, ...]` sequence.
    pub fn from_array_of_strings(&mut self, items: &[&str]) -> TrellisResult<usize> {
        self.ensure_open()?;
        if items.len() % 2 != 0 {
            return Err(TrellisError::InvalidArgument(format!(
                "odd number of items ({}) in key/value array",
                items.len()
            )));
        }
        if let Some(position) = items.iter().step_by(2).position(|k| k.is_empty()) {
            return Err(TrellisError::InvalidArgument(format!(
                "empty key at item {}",
                position * 2
            )));
        }

        for pair in items.chunks_exact(2) {
            self.put(pair[0], pair[1], PutFlags::REPLACE)?;
        }
        Ok(items.len() / 2)
    }

    // =========================================================================
    // PRINTING
    // =========================================================================

    /// Write every pair as `'key'=>'value'`, one per line, inside braces.
    pub fn print(&self, out: &mut impl Write) -> TrellisResult<()> {
        writeln!(out, "{{").map_err(write_error)?;
        for (key, value) in self.entries()? {
            writeln!(out, "  '{}'=>'{}'", key, value).map_err(write_error)?;
        }
        writeln!(out, "}}").map_err(write_error)
    }

    /// Write every distinct key, one per line, inside braces.
    pub fn print_keys(&self, out: &mut impl Write) -> TrellisResult<()> {
        writeln!(out, "{{").map_err(write_error)?;
        for key in self.keys()? {
            writeln!(out, "  '{}'", key).map_err(write_error)?;
        }
        writeln!(out, "}}").map_err(write_error)
    }
}

impl Drop for Hash {
    fn drop(&mut self) {
        if self.identifier.take().is_some()
            && let Err(e) = self.backend.close()
        {
            tracing::warn!(factory = %self.factory, error = %e, "close on drop failed");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
