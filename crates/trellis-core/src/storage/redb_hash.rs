//! # redb-backed Hash Storage
//!
//! A disk-backed hash backend using the redb embedded database.
//!
//! All pairs live in one multimap table, providing:
//! - ACID transactions (one write transaction per mutation)
//! - Crash safety (copy-on-write B-trees)
//! - Ordered keys, with the values of each key sorted and unique
//!
//! ## Locking
//!
//! redb holds an exclusive lock on the database file while it is open, so a
//! second handle onto the same file fails to open. `get_fd` exposes a plain
//! file handle on the database path for callers that coordinate externally.

use crate::hash::{BackendCursor, CursorFlag, HashBackend, HashDatum, OpenOptions, PutFlags};
use crate::types::{TrellisError, TrellisResult};
use redb::{
    Database, MultimapRange, MultimapTableDefinition, MultimapValue, ReadOnlyMultimapTable,
    ReadableDatabase, ReadableMultimapTable, TableError,
};
use std::fs::File;
use std::ops::Bound;
use std::path::{Path, PathBuf};

/// Table for pairs: key bytes -> set of value bytes
const PAIRS: MultimapTableDefinition<&[u8], &[u8]> = MultimapTableDefinition::new("pairs");

type PairsTable = ReadOnlyMultimapTable<&'static [u8], &'static [u8]>;

fn resource<E: std::fmt::Display>(e: E) -> TrellisError {
    TrellisError::Resource(e.to_string())
}

struct OpenDatabase {
    db: Database,
    lock_file: File,
    path: PathBuf,
    writable: bool,
}

/// A disk-backed hash backend using redb.
#[derive(Default)]
pub struct RedbHash {
    inner: Option<OpenDatabase>,
}

impl std::fmt::Debug for RedbHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbHash")
            .field("path", &self.inner.as_ref().map(|o| o.path.as_path()))
            .field("writable", &self.inner.as_ref().map(|o| o.writable))
            .finish_non_exhaustive()
    }
}

impl RedbHash {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory init function for the registry.
    #[must_use]
    pub fn boxed() -> Box<dyn HashBackend> {
        Box::new(Self::new())
    }

    /// Path of the open database file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.inner.as_ref().map(|o| o.path.as_path())
    }

    /// Compact the database file (optional optimization).
    pub fn compact(&mut self) -> TrellisResult<()> {
        let open = self.open_mut()?;
        open.db.compact().map_err(resource)?;
        Ok(())
    }

    fn open_ref(&self) -> TrellisResult<&OpenDatabase> {
        self.inner
            .as_ref()
            .ok_or_else(|| TrellisError::Resource("redb hash is not open".to_string()))
    }

    fn open_mut(&mut self) -> TrellisResult<&mut OpenDatabase> {
        self.inner
            .as_mut()
            .ok_or_else(|| TrellisError::Resource("redb hash is not open".to_string()))
    }

    fn writable(&self) -> TrellisResult<&Database> {
        let open = self.open_ref()?;
        if !open.writable {
            return Err(TrellisError::Resource(format!(
                "{} is open read-only",
                open.path.display()
            )));
        }
        Ok(&open.db)
    }

    /// Open the pairs table in a fresh read transaction.
    ///
    /// A database created outside this backend may lack the table; that
    /// reads as empty.
    fn read_table(&self) -> TrellisResult<Option<PairsTable>> {
        let read_txn = self.open_ref()?.db.begin_read().map_err(resource)?;
        match read_txn.open_multimap_table(PAIRS) {
            Ok(table) => Ok(Some(table)),
            Err(TableError::TableDoesNotExist(_)) => Ok(None),
            Err(e) => Err(resource(e)),
        }
    }
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> TrellisResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(resource)
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) -> TrellisResult<()> {
    Ok(())
}

impl HashBackend for RedbHash {
    fn open(&mut self, identifier: &str, options: &OpenOptions) -> TrellisResult<()> {
        if self.inner.is_some() {
            return Err(TrellisError::Resource(format!(
                "redb hash already open on {}",
                identifier
            )));
        }
        if identifier.is_empty() {
            return Err(TrellisError::Resource(
                "redb hash needs a file identifier".to_string(),
            ));
        }

        if options.new && !options.write {
            return Err(TrellisError::InvalidArgument(
                "redb hash cannot be both new and read-only".to_string(),
            ));
        }

        let path = PathBuf::from(identifier);
        let existed = path.exists();

        // Opening takes redb's file lock, so a file held elsewhere fails here
        // before anything is cleared.
        let db = if options.write {
            Database::create(&path).map_err(resource)?
        } else {
            Database::open(&path).map_err(resource)?
        };

        if options.write {
            let write_txn = db.begin_write().map_err(resource)?;
            if options.new {
                write_txn.delete_multimap_table(PAIRS).map_err(resource)?;
            }
            let _ = write_txn.open_multimap_table(PAIRS).map_err(resource)?;
            write_txn.commit().map_err(resource)?;
            if !existed {
                apply_mode(&path, options.mode)?;
            }
        }

        let lock_file = File::open(&path).map_err(resource)?;
        tracing::debug!(path = %path.display(), write = options.write, "redb hash opened");

        self.inner = Some(OpenDatabase {
            db,
            lock_file,
            path,
            writable: options.write,
        });
        Ok(())
    }

    fn close(&mut self) -> TrellisResult<()> {
        match self.inner.take() {
            Some(open) => {
                tracing::debug!(path = %open.path.display(), "redb hash closed");
                Ok(())
            }
            None => Err(TrellisError::Resource("redb hash is not open".to_string())),
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8], flags: PutFlags) -> TrellisResult<()> {
        let db = self.writable()?;
        let write_txn = db.begin_write().map_err(resource)?;
        {
            let mut table = write_txn.open_multimap_table(PAIRS).map_err(resource)?;
            if !flags.allows_duplicates() {
                let _ = table.remove_all(key).map_err(resource)?;
            }
            table.insert(key, value).map_err(resource)?;
        }
        write_txn.commit().map_err(resource)?;
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> TrellisResult<bool> {
        let Some(table) = self.read_table()? else {
            return Ok(false);
        };
        let mut values = table.get(key).map_err(resource)?;
        Ok(values.next().is_some())
    }

    fn delete(&mut self, key: &[u8]) -> TrellisResult<bool> {
        let db = self.writable()?;
        let write_txn = db.begin_write().map_err(resource)?;
        let existed = {
            let mut table = write_txn.open_multimap_table(PAIRS).map_err(resource)?;
            let mut removed = table.remove_all(key).map_err(resource)?;
            removed.next().is_some()
        };
        write_txn.commit().map_err(resource)?;
        Ok(existed)
    }

    fn sync(&mut self) -> TrellisResult<()> {
        let open = self.open_ref()?;
        if open.writable {
            // An empty durable commit flushes anything still buffered.
            let write_txn = open.db.begin_write().map_err(resource)?;
            write_txn.commit().map_err(resource)?;
        }
        Ok(())
    }

    fn get_fd(&self) -> TrellisResult<&File> {
        Ok(&self.open_ref()?.lock_file)
    }

    fn cursor(&self) -> TrellisResult<Box<dyn BackendCursor + '_>> {
        Ok(Box::new(RedbCursor {
            table: self.read_table()?,
            key: None,
            value: None,
        }))
    }
}

// =============================================================================
// CURSOR
// =============================================================================

/// Cursor over a read snapshot taken at init.
///
/// Keeps the current key and value as owned bytes and re-queries the
/// snapshot on every step, so no redb guard outlives a call.
struct RedbCursor {
    table: Option<PairsTable>,
    key: Option<Vec<u8>>,
    value: Option<Vec<u8>>,
}

fn first_value(mut values: MultimapValue<'_, &'static [u8]>) -> TrellisResult<Option<Vec<u8>>> {
    match values.next() {
        Some(guard) => Ok(Some(guard.map_err(resource)?.value().to_vec())),
        None => Ok(None),
    }
}

/// First (key, first value) of a range.
fn head(
    mut range: MultimapRange<'_, &'static [u8], &'static [u8]>,
) -> TrellisResult<Option<(Vec<u8>, Vec<u8>)>> {
    let Some(entry) = range.next() else {
        return Ok(None);
    };
    let (key, values) = entry.map_err(resource)?;
    let key = key.value().to_vec();
    Ok(first_value(values)?.map(|value| (key, value)))
}

impl RedbCursor {
    fn first(table: &PairsTable) -> TrellisResult<Option<(Vec<u8>, Vec<u8>)>> {
        head(table.iter().map_err(resource)?)
    }

    fn after(table: &PairsTable, key: &[u8]) -> TrellisResult<Option<(Vec<u8>, Vec<u8>)>> {
        let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (Bound::Excluded(key), Bound::Unbounded);
        head(table.range::<&[u8]>(bounds).map_err(resource)?)
    }

    fn value_after(table: &PairsTable, key: &[u8], last: &[u8]) -> TrellisResult<Option<Vec<u8>>> {
        for guard in table.get(key).map_err(resource)? {
            let guard = guard.map_err(resource)?;
            if guard.value() > last {
                return Ok(Some(guard.value().to_vec()));
            }
        }
        Ok(None)
    }

    fn position(&mut self, found: Option<(Vec<u8>, Vec<u8>)>) -> Option<(HashDatum, HashDatum)> {
        let (key, value) = found?;
        let pair = (
            HashDatum::from(key.as_slice()),
            HashDatum::from(value.as_slice()),
        );
        self.key = Some(key);
        self.value = Some(value);
        Some(pair)
    }
}

impl BackendCursor for RedbCursor {
    fn get(&mut self, flag: CursorFlag) -> TrellisResult<Option<(HashDatum, HashDatum)>> {
        let Some(table) = self.table.as_ref() else {
            return Ok(None);
        };
        match flag {
            CursorFlag::First => {
                let found = Self::first(table)?;
                Ok(self.position(found))
            }
            CursorFlag::Next => {
                let Some(key) = self.key.as_deref() else {
                    return Ok(None);
                };
                let found = Self::after(table, key)?;
                Ok(self.position(found))
            }
            CursorFlag::NextValue => {
                let (Some(key), Some(last)) = (self.key.as_deref(), self.value.as_deref()) else {
                    return Ok(None);
                };
                let Some(value) = Self::value_after(table, key, last)? else {
                    return Ok(None);
                };
                let pair = (HashDatum::from(key), HashDatum::from(value.as_slice()));
                self.value = Some(value);
                Ok(Some(pair))
            }
        }
    }

    fn set(&mut self, key: &[u8]) -> TrellisResult<Option<(HashDatum, HashDatum)>> {
        let Some(table) = self.table.as_ref() else {
            return Ok(None);
        };
        let found = first_value(table.get(key).map_err(resource)?)?;
        Ok(self.position(found.map(|value| (key.to_vec(), value))))
    }

    fn finish(&mut self) {
        self.table = None;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_at(path: &Path) -> RedbHash {
        let mut hash = RedbHash::new();
        hash.open(path.to_str().expect("utf8 path"), &OpenOptions::default())
            .expect("open db");
        hash
    }

    #[test]
    fn basic_operations() {
        let temp = tempdir().expect("temp dir");
        let mut hash = open_at(&temp.path().join("test.redb"));

        hash.put(b"k", b"v", PutFlags::REPLACE).expect("put");
        assert!(hash.exists(b"k").expect("exists"));
        assert!(!hash.exists(b"other").expect("exists"));

        assert!(hash.delete(b"k").expect("delete"));
        assert!(!hash.exists(b"k").expect("exists"));
        assert!(!hash.delete(b"k").expect("delete"));
    }

    #[test]
    fn double_open_fails() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("test.redb");
        let mut hash = open_at(&path);
        let again = hash.open(path.to_str().expect("utf8"), &OpenOptions::default());
        assert!(matches!(again, Err(TrellisError::Resource(_))));
    }

    #[test]
    fn second_handle_on_same_file_fails() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("test.redb");
        let _first = open_at(&path);
        let mut second = RedbHash::new();
        let result = second.open(path.to_str().expect("utf8"), &OpenOptions::default());
        assert!(matches!(result, Err(TrellisError::Resource(_))));
    }

    #[test]
    fn new_on_held_file_fails_and_keeps_data() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("live.redb");
        let mut first = open_at(&path);
        first.put(b"k", b"v", PutFlags::REPLACE).expect("put");

        let mut second = RedbHash::new();
        let options = OpenOptions {
            new: true,
            ..OpenOptions::default()
        };
        let result = second.open(path.to_str().expect("utf8"), &options);
        assert!(matches!(result, Err(TrellisError::Resource(_))));
        assert!(first.exists(b"k").expect("exists"));

        first.close().expect("close");
        let reopened = open_at(&path);
        assert!(reopened.exists(b"k").expect("exists"));
    }

    #[test]
    fn new_and_read_only_rejected() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("test.redb");
        {
            let mut hash = open_at(&path);
            hash.put(b"k", b"v", PutFlags::REPLACE).expect("put");
            hash.close().expect("close");
        }

        let mut hash = RedbHash::new();
        let options = OpenOptions {
            new: true,
            write: false,
            ..OpenOptions::default()
        };
        let result = hash.open(path.to_str().expect("utf8"), &options);
        assert!(matches!(result, Err(TrellisError::InvalidArgument(_))));
        assert!(path.exists());

        let hash = open_at(&path);
        assert!(hash.exists(b"k").expect("exists"));
    }

    #[test]
    fn read_only_requires_existing_file() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("missing.redb");
        let mut hash = RedbHash::new();
        let options = OpenOptions {
            write: false,
            ..OpenOptions::default()
        };
        let result = hash.open(path.to_str().expect("utf8"), &options);
        assert!(matches!(result, Err(TrellisError::Resource(_))));
    }

    #[test]
    fn read_only_rejects_writes() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("test.redb");
        {
            let mut hash = open_at(&path);
            hash.put(b"k", b"v", PutFlags::REPLACE).expect("put");
            hash.close().expect("close");
        }

        let mut hash = RedbHash::new();
        let options = OpenOptions {
            write: false,
            ..OpenOptions::default()
        };
        let name = path.to_str().expect("utf8");
        hash.open(name, &options).expect("open ro");
        assert!(hash.exists(b"k").expect("exists"));
        assert!(matches!(
            hash.put(b"k", b"w", PutFlags::REPLACE),
            Err(TrellisError::Resource(_))
        ));
        assert!(matches!(hash.delete(b"k"), Err(TrellisError::Resource(_))));
    }

    #[test]
    fn replace_and_duplicate_values() {
        let temp = tempdir().expect("temp dir");
        let hash_path = temp.path().join("test.redb");
        let mut hash = open_at(&hash_path);

        hash.put(b"k", b"b", PutFlags::REPLACE).expect("put");
        hash.put(b"k", b"a", PutFlags::DUPLICATE).expect("put");
        let mut cursor = hash.cursor().expect("cursor");
        let (_, v) = cursor.get(CursorFlag::First).expect("get").expect("pair");
        assert_eq!(v.data(), b"a");
        let (_, v) = cursor.get(CursorFlag::NextValue).expect("nv").expect("kv");
        assert_eq!(v.data(), b"b");
        assert!(cursor.get(CursorFlag::NextValue).expect("nv").is_none());
        drop(cursor);

        hash.put(b"k", b"c", PutFlags::REPLACE).expect("put");
        let mut cursor = hash.cursor().expect("cursor");
        let (_, v) = cursor.get(CursorFlag::First).expect("get").expect("pair");
        assert_eq!(v.data(), b"c");
        assert!(cursor.get(CursorFlag::NextValue).expect("nv").is_none());
    }

    #[test]
    fn cursor_walks_keys_in_order() {
        let temp = tempdir().expect("temp dir");
        let mut hash = open_at(&temp.path().join("test.redb"));
        for k in [b"c", b"a", b"b"] {
            hash.put(k, b"v", PutFlags::REPLACE).expect("put");
        }

        let mut cursor = hash.cursor().expect("cursor");
        let mut keys = Vec::new();
        let mut entry = cursor.get(CursorFlag::First).expect("first");
        while let Some((k, _)) = entry {
            keys.push(k.into_bytes());
            entry = cursor.get(CursorFlag::Next).expect("next");
        }
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn persistence_after_reopen() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("test.redb");
        {
            let mut hash = open_at(&path);
            hash.put(b"k", b"v", PutFlags::REPLACE).expect("put");
            hash.sync().expect("sync");
            hash.close().expect("close");
        }
        let hash = open_at(&path);
        assert!(hash.exists(b"k").expect("exists"));
    }

    #[test]
    fn open_new_discards_content() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("test.redb");
        {
            let mut hash = open_at(&path);
            hash.put(b"k", b"v", PutFlags::REPLACE).expect("put");
        }
        let mut hash = RedbHash::new();
        let options = OpenOptions {
            new: true,
            ..OpenOptions::default()
        };
        let name = path.to_str().expect("utf8");
        hash.open(name, &options).expect("open");
        assert!(!hash.exists(b"k").expect("exists"));
    }

    #[test]
    fn get_fd_returns_file() {
        let temp = tempdir().expect("temp dir");
        let hash = open_at(&temp.path().join("test.redb"));
        let file = hash.get_fd().expect("fd");
        assert!(file.metadata().expect("metadata").is_file());
    }

    #[test]
    fn close_twice_fails() {
        let temp = tempdir().expect("temp dir");
        let mut hash = open_at(&temp.path().join("test.redb"));
        hash.close().expect("close");
        assert!(matches!(hash.close(), Err(TrellisError::Resource(_))));
    }

    #[test]
    fn compact_and_reopen() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("test.redb");
        {
            let mut hash = open_at(&path);
            for i in 0u8..50 {
                hash.put(&[i], b"v", PutFlags::REPLACE).expect("put");
            }
            for i in 0u8..25 {
                hash.delete(&[i]).expect("delete");
            }
            hash.compact().expect("compact");
        }
        let hash = open_at(&path);
        assert!(!hash.exists(&[0]).expect("exists"));
        assert!(hash.exists(&[49]).expect("exists"));
    }
}
