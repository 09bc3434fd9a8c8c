//! Lazy iterators over a hash.
//!
//! Each iterator creates its cursor on the first `next` call and finishes it
//! exactly once: when it runs dry, on a backend error, or on drop.
//! Backend errors end the iteration and are logged.

use super::Hash;
use super::cursor::{CursorEntry, HashCursor};
use super::datum::HashDatum;

enum Walk {
    Values(HashDatum),
    Keys,
    Entries,
}

struct CursorWalk<'h> {
    hash: &'h Hash,
    walk: Walk,
    cursor: Option<HashCursor<'h>>,
    done: bool,
}

impl<'h> CursorWalk<'h> {
    fn new(hash: &'h Hash, walk: Walk) -> Self {
        Self {
            hash,
            walk,
            cursor: None,
            done: false,
        }
    }

    fn stop(&mut self) {
        self.done = true;
        if let Some(cursor) = self.cursor.take() {
            cursor.finish();
        }
    }

    fn step(&mut self) -> Option<CursorEntry> {
        if self.done {
            return None;
        }

        let first_use = self.cursor.is_none();
        if first_use {
            match self.hash.cursor() {
                Ok(cursor) => self.cursor = Some(cursor),
                Err(e) => {
                    tracing::warn!(error = %e, "hash cursor unavailable");
                    self.done = true;
                    return None;
                }
            }
        }
        let cursor = self.cursor.as_mut()?;

        let result = match (&self.walk, first_use) {
            (Walk::Values(key), true) => cursor.set(key.data()),
            (Walk::Keys | Walk::Entries, true) => cursor.get_first(),
            (Walk::Values(_), false) => cursor.get_next_value(),
            (Walk::Keys, false) => cursor.get_next(),
            (Walk::Entries, false) => match cursor.get_next_value() {
                Ok(None) => cursor.get_next(),
                other => other,
            },
        };

        match result {
            Ok(Some(entry)) => Some(entry),
            Ok(None) => {
                self.stop();
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "hash iteration stopped");
                self.stop();
                None
            }
        }
    }
}

/// Every value stored under one key.
pub struct Values<'h>(CursorWalk<'h>);

impl<'h> Values<'h> {
    pub(super) fn new(hash: &'h Hash, key: HashDatum) -> Self {
        Self(CursorWalk::new(hash, Walk::Values(key)))
    }
}

impl Iterator for Values<'_> {
    type Item = HashDatum;

    fn next(&mut self) -> Option<HashDatum> {
        self.0.step().map(|(_, value)| value)
    }
}

/// Distinct keys in key order.
pub struct Keys<'h>(CursorWalk<'h>);

impl<'h> Keys<'h> {
    pub(super) fn new(hash: &'h Hash) -> Self {
        Self(CursorWalk::new(hash, Walk::Keys))
    }
}

impl Iterator for Keys<'_> {
    type Item = HashDatum;

    fn next(&mut self) -> Option<HashDatum> {
        self.0.step().map(|(key, _)| key)
    }
}

/// Every (key, value) pair, duplicates included.
pub struct Entries<'h>(CursorWalk<'h>);

impl<'h> Entries<'h> {
    pub(super) fn new(hash: &'h Hash) -> Self {
        Self(CursorWalk::new(hash, Walk::Entries))
    }
}

impl Iterator for Entries<'_> {
    type Item = CursorEntry;

    fn next(&mut self) -> Option<CursorEntry> {
        self.0.step()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use crate::hash::{
        BackendCursor, CursorFlag, Hash, HashBackend, HashDatum, HashFactory, OpenOptions,
        PutFlags,
    };
    use crate::storage::MemoryHash;
    use crate::types::TrellisResult;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Memory backend that counts cursor inits and finishes.
    struct Counting {
        inner: MemoryHash,
        inits: Rc<Cell<usize>>,
        finishes: Rc<Cell<usize>>,
    }

    struct CountingCursor<'a> {
        inner: Box<dyn BackendCursor + 'a>,
        finishes: Rc<Cell<usize>>,
    }

    impl HashBackend for Counting {
        fn open(&mut self, identifier: &str, options: &OpenOptions) -> TrellisResult<()> {
            self.inner.open(identifier, options)
        }
        fn close(&mut self) -> TrellisResult<()> {
            self.inner.close()
        }
        fn put(&mut self, key: &[u8], value: &[u8], flags: PutFlags) -> TrellisResult<()> {
            self.inner.put(key, value, flags)
        }
        fn exists(&self, key: &[u8]) -> TrellisResult<bool> {
            self.inner.exists(key)
        }
        fn delete(&mut self, key: &[u8]) -> TrellisResult<bool> {
            self.inner.delete(key)
        }
        fn sync(&mut self) -> TrellisResult<()> {
            Ok(())
        }
        fn cursor(&self) -> TrellisResult<Box<dyn BackendCursor + '_>> {
            self.inits.set(self.inits.get() + 1);
            Ok(Box::new(CountingCursor {
                inner: self.inner.cursor()?,
                finishes: Rc::clone(&self.finishes),
            }))
        }
    }

    impl BackendCursor for CountingCursor<'_> {
        fn get(&mut self, flag: CursorFlag) -> TrellisResult<Option<(HashDatum, HashDatum)>> {
            self.inner.get(flag)
        }
        fn set(&mut self, key: &[u8]) -> TrellisResult<Option<(HashDatum, HashDatum)>> {
            self.inner.set(key)
        }
        fn finish(&mut self) {
            self.finishes.set(self.finishes.get() + 1);
        }
    }

    fn counting_hash() -> (Hash, Rc<Cell<usize>>, Rc<Cell<usize>>) {
        let inits = Rc::new(Cell::new(0));
        let finishes = Rc::new(Cell::new(0));
        let (i, f) = (Rc::clone(&inits), Rc::clone(&finishes));
        let factory = HashFactory::new("count", move || {
            Box::new(Counting {
                inner: MemoryHash::new(),
                inits: Rc::clone(&i),
                finishes: Rc::clone(&f),
            }) as Box<dyn HashBackend>
        });
        let mut hash = factory.new_hash();
        hash.open("count", &OpenOptions::default()).expect("open");
        hash.put("k", "1", PutFlags::REPLACE).expect("put");
        hash.put("k", "2", PutFlags::DUPLICATE).expect("put");
        hash.put("z", "9", PutFlags::REPLACE).expect("put");
        (hash, inits, finishes)
    }

    #[test]
    fn values_cursor_is_lazy_and_finished_once() {
        let (hash, inits, finishes) = counting_hash();
        let mut values = hash.get_all("k").expect("get_all");
        assert_eq!(inits.get(), 0);

        assert_eq!(values.next(), Some(HashDatum::from("1")));
        assert_eq!(inits.get(), 1);
        assert_eq!(values.next(), Some(HashDatum::from("2")));
        assert_eq!(values.next(), None);
        assert_eq!(finishes.get(), 1);

        assert_eq!(values.next(), None);
        drop(values);
        assert_eq!(finishes.get(), 1);
    }

    #[test]
    fn abandoned_iterator_finishes_on_drop() {
        let (hash, inits, finishes) = counting_hash();
        let mut entries = hash.entries().expect("entries");
        assert!(entries.next().is_some());
        drop(entries);
        assert_eq!(inits.get(), 1);
        assert_eq!(finishes.get(), 1);
    }

    #[test]
    fn unused_iterator_never_opens_cursor() {
        let (hash, inits, finishes) = counting_hash();
        drop(hash.keys().expect("keys"));
        assert_eq!(inits.get(), 0);
        assert_eq!(finishes.get(), 0);
    }

    #[test]
    fn entries_include_duplicates() {
        let (hash, _, finishes) = counting_hash();
        let pairs: Vec<(String, String)> = hash
            .entries()
            .expect("entries")
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("k".to_string(), "1".to_string()),
                ("k".to_string(), "2".to_string()),
                ("z".to_string(), "9".to_string()),
            ]
        );
        assert_eq!(finishes.get(), 1);
    }

    #[test]
    fn keys_are_distinct() {
        let (hash, _, _) = counting_hash();
        let keys: Vec<String> = hash.keys().expect("keys").map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["k", "z"]);
    }
}
