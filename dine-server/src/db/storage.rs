//! redb-based document storage
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | one per [`Document`] | `id: i64` | JSON document | Collection |
//! | `sequence_counter` | table name | `u64` | Id allocation |
//! | `unique_keys` | `{table}:{tenant}:{key}` | `i64` | Secondary unique index |
//!
//! # Guarded updates
//!
//! Every mutation touches exactly one document inside its own write
//! transaction: read, check the caller's guard, apply, write, commit.
//! redb serializes writers, so "update where status = S" is atomic without
//! any in-process lock. Operations that touch several documents issue several
//! guarded updates in a fixed order; they are never wrapped in one
//! transaction.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for id allocation: key = document table name, value = last id
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

/// Table for unique secondary keys: key = scoped key, value = owning document id
const UNIQUE_KEYS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("unique_keys");

/// A JSON document persisted in its own redb table
pub trait Document: Serialize + DeserializeOwned {
    /// redb table name
    const TABLE_NAME: &'static str;

    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
    /// Tenant discriminator
    fn restaurant_id(&self) -> &str;
}

fn table_of<D: Document>() -> TableDefinition<'static, i64, &'static [u8]> {
    TableDefinition::new(D::TABLE_NAME)
}

fn unique_key<D: Document>(tenant: &str, key: &str) -> String {
    format!("{}:{}:{}", D::TABLE_NAME, tenant, key)
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of a guarded single-document update
#[derive(Debug, Clone)]
pub enum Guarded<D> {
    /// Guard held; carries the document as written
    Applied(D),
    /// Guard failed; carries the document as found, untouched
    Rejected(D),
    /// No such document in the caller's tenant
    Missing,
}

impl<D> Guarded<D> {
    pub fn applied(self) -> Option<D> {
        match self {
            Guarded::Applied(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Guarded::Applied(_))
    }
}

/// Document storage backed by redb
#[derive(Clone)]
pub struct Storage {
    db: Arc<Database>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").field("db", &"<redb::Database>").finish()
    }
}

impl Storage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate` by default: once `commit()`
    /// returns the write survives a power cut.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests and throwaway runs)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SEQUENCE_TABLE)?;
            let _ = write_txn.open_table(UNIQUE_KEYS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    // ========== Sequence Operations ==========

    fn next_id(txn: &WriteTransaction, table_name: &str) -> StorageResult<i64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table
            .get(table_name)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(table_name, next)?;
        Ok(next as i64)
    }

    // ========== Writes ==========

    /// Insert a new document, assigning its id
    pub fn insert<D: Document>(&self, mut doc: D) -> StorageResult<D> {
        let txn = self.db.begin_write()?;
        {
            let id = Self::next_id(&txn, D::TABLE_NAME)?;
            doc.set_id(id);
            let mut table = txn.open_table(table_of::<D>())?;
            let value = serde_json::to_vec(&doc)?;
            table.insert(id, value.as_slice())?;
        }
        txn.commit()?;
        Ok(doc)
    }

    /// Insert a new document claiming a unique secondary key
    ///
    /// Returns `None` (and writes nothing) if the key is already held.
    pub fn insert_unique<D: Document>(&self, mut doc: D, key: &str) -> StorageResult<Option<D>> {
        let scoped = unique_key::<D>(doc.restaurant_id(), key);
        let txn = self.db.begin_write()?;
        {
            let mut keys = txn.open_table(UNIQUE_KEYS_TABLE)?;
            if keys.get(scoped.as_str())?.is_some() {
                return Ok(None);
            }
            let id = Self::next_id(&txn, D::TABLE_NAME)?;
            doc.set_id(id);
            keys.insert(scoped.as_str(), id)?;
            let mut table = txn.open_table(table_of::<D>())?;
            let value = serde_json::to_vec(&doc)?;
            table.insert(id, value.as_slice())?;
        }
        txn.commit()?;
        Ok(Some(doc))
    }

    /// Release a unique secondary key so it can be claimed again
    pub fn release_unique<D: Document>(&self, tenant: &str, key: &str) -> StorageResult<()> {
        let scoped = unique_key::<D>(tenant, key);
        let txn = self.db.begin_write()?;
        {
            let mut keys = txn.open_table(UNIQUE_KEYS_TABLE)?;
            keys.remove(scoped.as_str())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Guarded single-document update
    ///
    /// Reads the document, evaluates `guard` against it, and only when the
    /// guard holds runs `apply` and writes the result. All of it happens in
    /// one write transaction.
    pub fn update_if<D, G, F>(
        &self,
        tenant: &str,
        id: i64,
        guard: G,
        apply: F,
    ) -> StorageResult<Guarded<D>>
    where
        D: Document,
        G: FnOnce(&D) -> bool,
        F: FnOnce(&mut D),
    {
        let txn = self.db.begin_write()?;
        let outcome = {
            let mut table = txn.open_table(table_of::<D>())?;
            let current: Option<D> = match table.get(id)? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };

            match current {
                Some(doc) if doc.restaurant_id() == tenant => {
                    if guard(&doc) {
                        let mut doc = doc;
                        apply(&mut doc);
                        let value = serde_json::to_vec(&doc)?;
                        table.insert(id, value.as_slice())?;
                        Guarded::Applied(doc)
                    } else {
                        Guarded::Rejected(doc)
                    }
                }
                _ => Guarded::Missing,
            }
        };

        if outcome.is_applied() {
            txn.commit()?;
        } else {
            txn.abort()?;
        }
        Ok(outcome)
    }

    /// Unconditional single-document update
    pub fn update<D, F>(&self, tenant: &str, id: i64, apply: F) -> StorageResult<Option<D>>
    where
        D: Document,
        F: FnOnce(&mut D),
    {
        Ok(self.update_if(tenant, id, |_: &D| true, apply)?.applied())
    }

    // ========== Reads ==========

    /// Get a document by id within a tenant
    pub fn get<D: Document>(&self, tenant: &str, id: i64) -> StorageResult<Option<D>> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(table_of::<D>()) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match table.get(id)? {
            Some(value) => {
                let doc: D = serde_json::from_slice(value.value())?;
                Ok(Some(doc).filter(|d| d.restaurant_id() == tenant))
            }
            None => Ok(None),
        }
    }

    /// All documents of a tenant matching `filter`, in id order
    pub fn scan<D, P>(&self, tenant: &str, filter: P) -> StorageResult<Vec<D>>
    where
        D: Document,
        P: Fn(&D) -> bool,
    {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(table_of::<D>()) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut docs = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let doc: D = serde_json::from_slice(value.value())?;
            if doc.restaurant_id() == tenant && filter(&doc) {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    /// Newest (highest id) document matching `filter`
    pub fn find_latest<D, P>(&self, tenant: &str, filter: P) -> StorageResult<Option<D>>
    where
        D: Document,
        P: Fn(&D) -> bool,
    {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(table_of::<D>()) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        for result in table.iter()?.rev() {
            let (_key, value) = result?;
            let doc: D = serde_json::from_slice(value.value())?;
            if doc.restaurant_id() == tenant && filter(&doc) {
                return Ok(Some(doc));
            }
        }
        Ok(None)
    }

    /// Resolve a unique secondary key to a document
    pub fn get_by_unique<D: Document>(&self, tenant: &str, key: &str) -> StorageResult<Option<D>> {
        let scoped = unique_key::<D>(tenant, key);
        let id = {
            let read_txn = self.db.begin_read()?;
            let keys = read_txn.open_table(UNIQUE_KEYS_TABLE)?;
            keys.get(scoped.as_str())?.map(|guard| guard.value())
        };
        match id {
            Some(id) => self.get(tenant, id),
            None => Ok(None),
        }
    }

    /// Number of documents in a collection, all tenants
    pub fn count<D: Document>(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        match read_txn.open_table(table_of::<D>()) {
            Ok(table) => Ok(table.len()?),
            Err(redb::TableError::TableDoesNotExist(_)) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

/// Implement [`Document`] for a model with `id` and `restaurant_id` fields
macro_rules! impl_document {
    ($ty:ty, $table:literal) => {
        impl $crate::db::storage::Document for $ty {
            const TABLE_NAME: &'static str = $table;

            fn id(&self) -> i64 {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = id;
            }

            fn restaurant_id(&self) -> &str {
                &self.restaurant_id
            }
        }
    };
}

pub(crate) use impl_document;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: i64,
        restaurant_id: String,
        status: String,
        body: String,
    }

    impl_document!(Note, "test_notes");

    fn note(tenant: &str, status: &str) -> Note {
        Note {
            id: 0,
            restaurant_id: tenant.to_string(),
            status: status.to_string(),
            body: "hello".to_string(),
        }
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let storage = Storage::open_in_memory().unwrap();
        let a = storage.insert(note("r1", "open")).unwrap();
        let b = storage.insert(note("r1", "open")).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(storage.count::<Note>().unwrap(), 2);
    }

    #[test]
    fn test_get_is_tenant_scoped() {
        let storage = Storage::open_in_memory().unwrap();
        let a = storage.insert(note("r1", "open")).unwrap();

        assert_eq!(storage.get::<Note>("r1", a.id).unwrap(), Some(a.clone()));
        assert_eq!(storage.get::<Note>("r2", a.id).unwrap(), None);
        assert_eq!(storage.get::<Note>("r1", 99).unwrap(), None);
    }

    #[test]
    fn test_read_before_any_insert() {
        let storage = Storage::open_in_memory().unwrap();
        assert!(storage.get::<Note>("r1", 1).unwrap().is_none());
        assert!(storage.scan::<Note, _>("r1", |_| true).unwrap().is_empty());
        assert!(storage.find_latest::<Note, _>("r1", |_| true).unwrap().is_none());
    }

    #[test]
    fn test_update_if_applies_only_when_guard_holds() {
        let storage = Storage::open_in_memory().unwrap();
        let a = storage.insert(note("r1", "open")).unwrap();

        let first = storage
            .update_if("r1", a.id, |n: &Note| n.status == "open", |n| n.status = "closed".into())
            .unwrap();
        assert!(matches!(first, Guarded::Applied(ref n) if n.status == "closed"));

        let second = storage
            .update_if("r1", a.id, |n: &Note| n.status == "open", |n| n.body = "changed".into())
            .unwrap();
        assert!(matches!(second, Guarded::Rejected(ref n) if n.body == "hello"));

        let stored: Note = storage.get("r1", a.id).unwrap().unwrap();
        assert_eq!(stored.status, "closed");
        assert_eq!(stored.body, "hello");
    }

    #[test]
    fn test_update_if_foreign_tenant_is_missing() {
        let storage = Storage::open_in_memory().unwrap();
        let a = storage.insert(note("r1", "open")).unwrap();
        let outcome = storage
            .update_if("r2", a.id, |_: &Note| true, |n| n.status = "x".into())
            .unwrap();
        assert!(matches!(outcome, Guarded::Missing));
    }

    #[test]
    fn test_scan_and_find_latest() {
        let storage = Storage::open_in_memory().unwrap();
        storage.insert(note("r1", "open")).unwrap();
        storage.insert(note("r2", "open")).unwrap();
        let c = storage.insert(note("r1", "open")).unwrap();
        storage.insert(note("r1", "closed")).unwrap();

        let open: Vec<Note> = storage.scan("r1", |n: &Note| n.status == "open").unwrap();
        assert_eq!(open.len(), 2);

        let latest: Option<Note> = storage.find_latest("r1", |n: &Note| n.status == "open").unwrap();
        assert_eq!(latest.map(|n| n.id), Some(c.id));
    }

    #[test]
    fn test_unique_keys() {
        let storage = Storage::open_in_memory().unwrap();
        let a = storage.insert_unique(note("r1", "open"), "k1").unwrap();
        assert!(a.is_some());
        assert!(storage.insert_unique(note("r1", "open"), "k1").unwrap().is_none());
        // same key in another tenant is independent
        assert!(storage.insert_unique(note("r2", "open"), "k1").unwrap().is_some());

        let found: Option<Note> = storage.get_by_unique("r1", "k1").unwrap();
        assert_eq!(found.map(|n| n.id), a.map(|n| n.id));

        storage.release_unique::<Note>("r1", "k1").unwrap();
        assert!(storage.insert_unique(note("r1", "open"), "k1").unwrap().is_some());
    }

    #[test]
    fn test_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dine.redb");

        let id = {
            let storage = Storage::open(&path).unwrap();
            storage.insert(note("r1", "open")).unwrap().id
        };

        let storage = Storage::open(&path).unwrap();
        let stored: Option<Note> = storage.get("r1", id).unwrap();
        assert!(stored.is_some());
        assert_eq!(storage.insert(note("r1", "open")).unwrap().id, id + 1);
    }
}
