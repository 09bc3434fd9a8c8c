//! # Uri Identity
//!
//! An immutable, owned URI string with its length cached.
//!
//! Equality checks the cached lengths first and only compares content when
//! they match, so most mismatches are decided without touching the bytes.
//!
//! `Clone` makes an independent copy. When several nodes must share one Uri,
//! share the enclosing `Rc<Node>` instead.

use crate::types::{TrellisError, TrellisResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An owned URI string.
#[derive(Debug, Clone)]
pub struct Uri {
    string: String,
    length: usize,
}

impl Uri {
    /// Create a Uri by copying `string`.
    ///
    /// Returns `TrellisError::InvalidArgument` for an empty string.
    pub fn new(string: &str) -> TrellisResult<Self> {
        if string.is_empty() {
            return Err(TrellisError::InvalidArgument(
                "URI string must not be empty".to_string(),
            ));
        }
        Ok(Self {
            string: string.to_owned(),
            length: string.len(),
        })
    }

    /// Borrow the URI string. Valid for as long as the Uri.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.string
    }

    /// Cached byte length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Always false; an empty Uri cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Compare with `other` using `content_eq` for the content step.
    ///
    /// `content_eq` is only called when the cached lengths match.
    pub fn equals_with<F>(&self, other: &Self, content_eq: F) -> bool
    where
        F: FnOnce(&str, &str) -> bool,
    {
        if self.length != other.length {
            return false;
        }
        content_eq(&self.string, &other.string)
    }

    /// BLAKE3 digest of the URI string.
    #[cfg(feature = "digest")]
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        *blake3::hash(self.string.as_bytes()).as_bytes()
    }
}

impl PartialEq for Uri {
    fn eq(&self, other: &Self) -> bool {
        self.equals_with(other, |a, b| a == b)
    }
}

impl Eq for Uri {}

impl Hash for Uri {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.string.hash(state);
    }
}

impl PartialOrd for Uri {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Uri {
    fn cmp(&self, other: &Self) -> Ordering {
        self.string.cmp(&other.string)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string)
    }
}

impl AsRef<str> for Uri {
    fn as_ref(&self) -> &str {
        &self.string
    }
}

impl TryFrom<&str> for Uri {
    type Error = TrellisError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Serialize for Uri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.string)
    }
}

impl<'de> Deserialize<'de> for Uri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = String::deserialize(deserializer)?;
        Self::new(&string).map_err(serde::de::Error::custom)
    }
}
