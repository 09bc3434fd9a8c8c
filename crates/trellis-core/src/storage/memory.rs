//! # In-Memory Backend
//!
//! Ordered `BTreeMap` of keys to value lists. Values keep insertion order
//! and identical duplicates are kept. Nothing survives `close`.

use crate::hash::{BackendCursor, CursorFlag, HashBackend, HashDatum, OpenOptions, PutFlags};
use crate::types::TrellisResult;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Volatile hash backend.
#[derive(Debug, Default)]
pub struct MemoryHash {
    entries: BTreeMap<Vec<u8>, Vec<Vec<u8>>>,
    values: usize,
}

impl MemoryHash {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory init function for the registry.
    #[must_use]
    pub fn boxed() -> Box<dyn HashBackend> {
        Box::new(Self::new())
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of stored values across all keys.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.values
    }
}

impl HashBackend for MemoryHash {
    fn open(&mut self, identifier: &str, options: &OpenOptions) -> TrellisResult<()> {
        if options.new {
            self.entries.clear();
            self.values = 0;
        }
        tracing::debug!(identifier, "memory hash opened");
        Ok(())
    }

    fn close(&mut self) -> TrellisResult<()> {
        self.entries.clear();
        self.values = 0;
        Ok(())
    }

    fn put(&mut self, key: &[u8], value: &[u8], flags: PutFlags) -> TrellisResult<()> {
        let values = self.entries.entry(key.to_vec()).or_default();
        if !flags.allows_duplicates() {
            self.values = self.values.saturating_sub(values.len());
            values.clear();
        }
        values.push(value.to_vec());
        self.values = self.values.saturating_add(1);
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> TrellisResult<bool> {
        Ok(self.entries.contains_key(key))
    }

    fn delete(&mut self, key: &[u8]) -> TrellisResult<bool> {
        match self.entries.remove(key) {
            Some(values) => {
                self.values = self.values.saturating_sub(values.len());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn sync(&mut self) -> TrellisResult<()> {
        Ok(())
    }

    fn cursor(&self) -> TrellisResult<Box<dyn BackendCursor + '_>> {
        Ok(Box::new(MemoryCursor {
            entries: &self.entries,
            key: None,
            index: 0,
        }))
    }
}

struct MemoryCursor<'a> {
    entries: &'a BTreeMap<Vec<u8>, Vec<Vec<u8>>>,
    key: Option<&'a [u8]>,
    index: usize,
}

impl<'a> MemoryCursor<'a> {
    fn position(
        &mut self,
        found: Option<(&'a Vec<u8>, &'a Vec<Vec<u8>>)>,
    ) -> Option<(HashDatum, HashDatum)> {
        let (key, values) = found?;
        let value = values.first()?;
        self.key = Some(key.as_slice());
        self.index = 0;
        Some((
            HashDatum::from(key.as_slice()),
            HashDatum::from(value.as_slice()),
        ))
    }
}

impl BackendCursor for MemoryCursor<'_> {
    fn get(&mut self, flag: CursorFlag) -> TrellisResult<Option<(HashDatum, HashDatum)>> {
        let entries = self.entries;
        match flag {
            CursorFlag::First => Ok(self.position(entries.iter().next())),
            CursorFlag::Next => {
                let Some(current) = self.key else {
                    return Ok(None);
                };
                let found = entries
                    .range::<[u8], _>((Bound::Excluded(current), Bound::Unbounded))
                    .next();
                Ok(self.position(found))
            }
            CursorFlag::NextValue => {
                let Some(current) = self.key else {
                    return Ok(None);
                };
                let next_index = self.index.saturating_add(1);
                let value = entries
                    .get(current)
                    .and_then(|values| values.get(next_index));
                Ok(value.map(|v| {
                    self.index = next_index;
                    (HashDatum::from(current), HashDatum::from(v.as_slice()))
                }))
            }
        }
    }

    fn set(&mut self, key: &[u8]) -> TrellisResult<Option<(HashDatum, HashDatum)>> {
        let entries = self.entries;
        Ok(self.position(entries.get_key_value(key)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn put_replace_and_duplicate() {
        let mut m = MemoryHash::new();
        m.put(b"k", b"1", PutFlags::REPLACE).expect("put");
        m.put(b"k", b"2", PutFlags::DUPLICATE).expect("put");
        m.put(b"k", b"2", PutFlags::DUPLICATE).expect("put");
        assert_eq!(m.value_count(), 3);

        m.put(b"k", b"3", PutFlags::REPLACE).expect("put");
        assert_eq!(m.value_count(), 1);
        assert_eq!(m.key_count(), 1);
    }

    #[test]
    fn delete_reports_existence() {
        let mut m = MemoryHash::new();
        m.put(b"k", b"1", PutFlags::REPLACE).expect("put");
        assert!(m.delete(b"k").expect("delete"));
        assert!(!m.delete(b"k").expect("delete"));
        assert!(!m.exists(b"k").expect("exists"));
        assert_eq!(m.value_count(), 0);
    }

    #[test]
    fn open_new_clears() {
        let mut m = MemoryHash::new();
        m.put(b"k", b"1", PutFlags::REPLACE).expect("put");
        let options = OpenOptions {
            new: true,
            ..OpenOptions::default()
        };
        m.open("x", &options).expect("open");
        assert_eq!(m.key_count(), 0);
    }

    #[test]
    fn cursor_duplicates_in_insertion_order() {
        let mut m = MemoryHash::new();
        m.put(b"k", b"z", PutFlags::REPLACE).expect("put");
        m.put(b"k", b"a", PutFlags::DUPLICATE).expect("put");
        let mut c = m.cursor().expect("cursor");
        let (_, v) = c.get(CursorFlag::First).expect("first").expect("entry");
        assert_eq!(v.data(), b"z");
        let (_, v) = c.get(CursorFlag::NextValue).expect("nv").expect("entry");
        assert_eq!(v.data(), b"a");
        assert!(c.get(CursorFlag::NextValue).expect("nv").is_none());
    }

    #[test]
    fn get_fd_not_supported() {
        let m = MemoryHash::new();
        assert!(matches!(
            m.get_fd(),
            Err(crate::TrellisError::NotSupported(_))
        ));
    }
}
