//! # Backend Contract
//!
//! The operation set every storage backend provides. The generic `Hash`
//! layer owns one boxed backend and never looks at its state.
//!
//! Backends may assume the generic layer has already:
//! - rejected operations on a closed hash
//! - rejected a second `open`
//! - resolved `PutFlags::NO_OVERWRITE` into an existence check
//! - issued `CursorFlag::First` before any `Next`

use super::Hash;
use super::cursor::CursorFlag;
use super::datum::HashDatum;
use crate::primitives::DEFAULT_MODE;
use crate::types::{TrellisError, TrellisResult};
use std::fs::File;

// =============================================================================
// PUT FLAGS
// =============================================================================

/// Bit field selecting `put` semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PutFlags(u32);

impl PutFlags {
    /// Replace every existing value under the key.
    pub const REPLACE: Self = Self(0);
    /// Store an additional value under the key.
    pub const DUPLICATE: Self = Self(1);
    /// Fail with `TrellisError::Duplicate` if the key already exists.
    pub const NO_OVERWRITE: Self = Self(2);

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn allows_duplicates(self) -> bool {
        self.contains(Self::DUPLICATE)
    }
}

impl std::ops::BitOr for PutFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// =============================================================================
// OPEN OPTIONS
// =============================================================================

/// Options passed to `HashBackend::open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    /// Permission bits for file backends that create files.
    pub mode: u32,
    /// Discard any existing content.
    pub new: bool,
    /// Allow writes. A read-only open requires existing storage.
    pub write: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            mode: DEFAULT_MODE,
            new: false,
            write: true,
        }
    }
}

impl OpenOptions {
    /// Read `mode`, `new` and `write` from an options hash.
    ///
    /// Absent keys keep their defaults; present keys that fail to decode
    /// are an error.
    pub fn from_hash(options: &Hash) -> TrellisResult<Self> {
        let defaults = Self::default();
        let mode = match options.get_as_long("mode") {
            Ok(v) => u32::try_from(v).map_err(|_| mode_out_of_range(v))?,
            Err(TrellisError::NotFound(_)) => defaults.mode,
            Err(e) => return Err(e),
        };
        let new = match options.get_as_boolean("new") {
            Ok(v) => v,
            Err(TrellisError::NotFound(_)) => defaults.new,
            Err(e) => return Err(e),
        };
        let write = match options.get_as_boolean("write") {
            Ok(v) => v,
            Err(TrellisError::NotFound(_)) => defaults.write,
            Err(e) => return Err(e),
        };
        Ok(Self { mode, new, write })
    }
}

fn mode_out_of_range(mode: i64) -> TrellisError {
    TrellisError::InvalidArgument(format!("mode {} out of range", mode))
}

// =============================================================================
// BACKEND TRAITS
// =============================================================================

/// A concrete storage implementation.
pub trait HashBackend {
    /// Acquire the resource named by `identifier`.
    fn open(&mut self, identifier: &str, options: &OpenOptions) -> TrellisResult<()>;

    /// Release the resource.
    fn close(&mut self) -> TrellisResult<()>;

    /// Store `value` under `key`. `flags` is `REPLACE` or `DUPLICATE`.
    fn put(&mut self, key: &[u8], value: &[u8], flags: PutFlags) -> TrellisResult<()>;

    /// Whether `key` has at least one value. Never materializes a value.
    fn exists(&self, key: &[u8]) -> TrellisResult<bool>;

    /// Remove every value under `key`. Returns whether the key existed.
    fn delete(&mut self, key: &[u8]) -> TrellisResult<bool>;

    /// Flush cached state to persistent storage.
    fn sync(&mut self) -> TrellisResult<()>;

    /// A file usable for external locking, for file-based backends.
    fn get_fd(&self) -> TrellisResult<&File> {
        Err(TrellisError::NotSupported("get_fd on a non-file backend"))
    }

    /// Create a cursor over this backend's pairs.
    fn cursor(&self) -> TrellisResult<Box<dyn BackendCursor + '_>>;
}

/// Positioned iteration state owned by a backend.
pub trait BackendCursor {
    /// Move according to `flag` and return the pair now under the cursor.
    ///
    /// `Ok(None)` means nothing is left for this flag.
    fn get(&mut self, flag: CursorFlag) -> TrellisResult<Option<(HashDatum, HashDatum)>>;

    /// Position on the first value of exactly `key`.
    ///
    /// The default walks keys from `First`, relying on ascending key order.
    fn set(&mut self, key: &[u8]) -> TrellisResult<Option<(HashDatum, HashDatum)>> {
        let mut entry = self.get(CursorFlag::First)?;
        while let Some((k, v)) = entry {
            if k.data() == key {
                return Ok(Some((k, v)));
            }
            if k.data() > key {
                break;
            }
            entry = self.get(CursorFlag::Next)?;
        }
        Ok(None)
    }

    /// Release cursor resources. Called exactly once by `HashCursor`.
    fn finish(&mut self) {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn put_flag_bits() {
        assert!(!PutFlags::REPLACE.allows_duplicates());
        assert!(PutFlags::DUPLICATE.allows_duplicates());
        let both = PutFlags::DUPLICATE | PutFlags::NO_OVERWRITE;
        assert!(both.contains(PutFlags::NO_OVERWRITE));
        assert_eq!(both.bits(), 3);
        assert_eq!(PutFlags::from_bits(3), both);
    }

    #[test]
    fn open_options_defaults() {
        let o = OpenOptions::default();
        assert_eq!(o.mode, 0o644);
        assert!(!o.new);
        assert!(o.write);
    }

    #[test]
    fn open_options_from_hash() {
        let mut options = Hash::memory().expect("hash");
        options
            .from_string("new=yes\nwrite=false\nmode=384")
            .expect("import");
        let o = OpenOptions::from_hash(&options).expect("options");
        assert!(o.new);
        assert!(!o.write);
        assert_eq!(o.mode, 0o600);
    }

    #[test]
    fn open_options_from_hash_keeps_defaults() {
        let options = Hash::memory().expect("hash");
        let o = OpenOptions::from_hash(&options).expect("options");
        assert_eq!(o, OpenOptions::default());
    }

    #[test]
    fn open_options_from_hash_rejects_bad_boolean() {
        let mut options = Hash::memory().expect("hash");
        options.from_string("new=maybe").expect("import");
        assert!(matches!(
            OpenOptions::from_hash(&options),
            Err(TrellisError::InvalidArgument(_))
        ));
    }
}
