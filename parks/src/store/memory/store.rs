use crate::errors::{ErrorKind, ParksError, ParksResult};
use crate::record::{Record, ID_FIELD};
use crate::spatial::{SpatialIndex, WithinBox};
use crate::store::ParkStoreProvider;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Shared state of an in-memory reference collection.
///
/// # Purpose
/// `InMemoryDatabase` plays the part of the database server: its documents and
/// indexes outlive any single connection, so closing a store and dialing again
/// sees the same data, exactly as a remote store would behave.
///
/// Records and indexes sit behind separate reader/writer locks, so creating an
/// index never blocks concurrent reads.
///
/// # Fault injection
/// [`set_available`](InMemoryDatabase::set_available) makes every store
/// operation fail with `QueryError`, and
/// [`operation_count`](InMemoryDatabase::operation_count) reports how many
/// store operations reached the collection.
#[derive(Clone)]
pub struct InMemoryDatabase {
    inner: Arc<InMemoryDatabaseInner>,
}

struct InMemoryDatabaseInner {
    database_name: String,
    collection_name: String,
    records: RwLock<Vec<Record>>,
    indexes: RwLock<HashSet<SpatialIndex>>,
    available: AtomicBool,
    operations: AtomicU64,
}

impl InMemoryDatabase {
    pub fn new(database_name: &str, collection_name: &str) -> InMemoryDatabase {
        InMemoryDatabase {
            inner: Arc::new(InMemoryDatabaseInner {
                database_name: database_name.to_string(),
                collection_name: collection_name.to_string(),
                records: RwLock::new(Vec::new()),
                indexes: RwLock::new(HashSet::new()),
                available: AtomicBool::new(true),
                operations: AtomicU64::new(0),
            }),
        }
    }

    pub fn database_name(&self) -> &str {
        &self.inner.database_name
    }

    pub fn collection_name(&self) -> &str {
        &self.inner.collection_name
    }

    pub fn namespace(&self) -> String {
        format!("{}.{}", self.inner.database_name, self.inner.collection_name)
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.inner.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.records.read().is_empty()
    }

    pub fn has_index(&self, index: &SpatialIndex) -> bool {
        self.inner.indexes.read().contains(index)
    }

    pub fn index_count(&self) -> usize {
        self.inner.indexes.read().len()
    }

    /// Removes every index while keeping the documents, as a server-side
    /// `dropIndexes` would.
    pub fn drop_indexes(&self) {
        self.inner.indexes.write().clear();
    }

    /// Toggles whether store operations succeed.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Number of store operations that reached this collection.
    pub fn operation_count(&self) -> u64 {
        self.inner.operations.load(Ordering::SeqCst)
    }

    fn begin(&self, operation: &str) -> ParksResult<()> {
        self.inner.operations.fetch_add(1, Ordering::SeqCst);
        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            log::error!("{} failed on {}: database unavailable", operation, self.namespace());
            Err(ParksError::new(
                &format!("{} failed: in-memory database unavailable", operation),
                ErrorKind::QueryError,
            ))
        }
    }
}

/// In-memory implementation of [`ParkStoreProvider`].
///
/// One `InMemoryStore` is one connection to an [`InMemoryDatabase`]. Closing
/// it only invalidates this connection; the data stays in the database.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<InMemoryStoreInner>,
}

struct InMemoryStoreInner {
    database: InMemoryDatabase,
    closed: AtomicBool,
}

impl InMemoryStore {
    pub fn new(database: InMemoryDatabase) -> InMemoryStore {
        InMemoryStore {
            inner: Arc::new(InMemoryStoreInner {
                database,
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn database(&self) -> &InMemoryDatabase {
        &self.inner.database
    }

    fn check_opened(&self, operation: &str) -> ParksResult<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            log::error!("{} attempted on a closed store", operation);
            return Err(ParksError::new(
                &format!("{} failed: store is closed", operation),
                ErrorKind::QueryError,
            ));
        }
        self.inner.database.begin(operation)
    }
}

impl ParkStoreProvider for InMemoryStore {
    fn ensure_index(&self, index: &SpatialIndex) -> ParksResult<()> {
        self.check_opened("createIndex")?;
        let mut indexes = self.inner.database.inner.indexes.write();
        if indexes.insert(index.clone()) {
            log::debug!("Created index {} on {}", index.name(), self.namespace());
        }
        Ok(())
    }

    fn count(&self) -> ParksResult<u64> {
        self.check_opened("countDocuments")?;
        Ok(self.inner.database.inner.records.read().len() as u64)
    }

    fn insert_many(&self, records: Vec<Record>) -> ParksResult<usize> {
        self.check_opened("insertMany")?;
        let inserted = records.len();
        let mut stored = self.inner.database.inner.records.write();
        for mut record in records {
            if !record.contains_key(ID_FIELD) {
                record.insert(ID_FIELD, uuid::Uuid::new_v4().simple().to_string());
            }
            stored.push(record);
        }
        Ok(inserted)
    }

    fn find_all(&self) -> ParksResult<Vec<Record>> {
        self.check_opened("find")?;
        Ok(self.inner.database.inner.records.read().clone())
    }

    fn find_within(&self, filter: &WithinBox, limit: usize) -> ParksResult<Vec<Record>> {
        self.check_opened("find")?;
        let records = self.inner.database.inner.records.read();
        Ok(records
            .iter()
            .filter(|record| filter.matches(record))
            .take(limit)
            .cloned()
            .collect())
    }

    fn drop_collection(&self) -> ParksResult<()> {
        self.check_opened("drop")?;
        let database = &self.inner.database.inner;
        database.records.write().clear();
        database.indexes.write().clear();
        Ok(())
    }

    fn close(&self) -> ParksResult<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn namespace(&self) -> String {
        self.inner.database.namespace()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(name: &str, lon: f64, lat: f64) -> Record {
        Record::from_value(json!({"name": name, "pos": [lon, lat]})).unwrap()
    }

    fn create_store() -> InMemoryStore {
        InMemoryStore::new(InMemoryDatabase::new("parks", "parkpoints"))
    }

    #[test]
    fn test_namespace() {
        assert_eq!(create_store().namespace(), "parks.parkpoints");
    }

    #[test]
    fn test_insert_assigns_ids() {
        let store = create_store();
        let mut with_id = record("a", 1.0, 1.0);
        with_id.insert(ID_FIELD, "fixed");
        assert_eq!(store.insert_many(vec![with_id, record("b", 2.0, 2.0)]).unwrap(), 2);

        let all = store.find_all().unwrap();
        assert_eq!(all[0].id(), Some("fixed".to_string()));
        assert!(all[1].id().is_some());
        assert_ne!(all[1].id(), Some("fixed".to_string()));
    }

    #[test]
    fn test_count_and_find_all() {
        let store = create_store();
        assert_eq!(store.count().unwrap(), 0);
        store
            .insert_many(vec![record("a", 1.0, 1.0), record("b", 2.0, 2.0)])
            .unwrap();
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.find_all().unwrap().len(), 2);
    }

    #[test]
    fn test_find_within_filters_and_limits() {
        let store = create_store();
        store
            .insert_many(vec![
                record("in1", 5.0, 5.0),
                record("out", 50.0, 50.0),
                record("in2", 6.0, 6.0),
            ])
            .unwrap();

        let filter = WithinBox::on_pos([0.0, 0.0], [10.0, 10.0]);
        let found = store.find_within(&filter, 40).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|r| r.get("name") != Some(&json!("out"))));

        let limited = store.find_within(&filter, 1).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_ensure_index_is_idempotent() {
        let store = create_store();
        let index = SpatialIndex::default();
        store.ensure_index(&index).unwrap();
        store.ensure_index(&index).unwrap();
        assert!(store.database().has_index(&index));
        assert_eq!(store.database().index_count(), 1);
    }

    #[test]
    fn test_drop_indexes_keeps_records() {
        let store = create_store();
        let index = SpatialIndex::default();
        store.ensure_index(&index).unwrap();
        store.insert_many(vec![record("a", 1.0, 1.0)]).unwrap();
        store.database().drop_indexes();
        assert!(!store.database().has_index(&index));
        assert_eq!(store.database().len(), 1);
        store.ensure_index(&index).unwrap();
        assert!(store.database().has_index(&index));
    }

    #[test]
    fn test_drop_collection_clears_records_and_indexes() {
        let store = create_store();
        store.ensure_index(&SpatialIndex::default()).unwrap();
        store.insert_many(vec![record("a", 1.0, 1.0)]).unwrap();
        store.drop_collection().unwrap();
        assert!(store.database().is_empty());
        assert_eq!(store.database().index_count(), 0);
        // dropping a missing collection is fine
        store.drop_collection().unwrap();
    }

    #[test]
    fn test_closed_store_rejects_operations() {
        let store = create_store();
        store.close().unwrap();
        assert!(store.is_closed());
        let err = store.count().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::QueryError);
        assert!(err.message().contains("closed"));
    }

    #[test]
    fn test_data_survives_reconnect() {
        let database = InMemoryDatabase::new("parks", "parkpoints");
        let first = InMemoryStore::new(database.clone());
        first.insert_many(vec![record("a", 1.0, 1.0)]).unwrap();
        first.close().unwrap();

        let second = InMemoryStore::new(database);
        assert_eq!(second.count().unwrap(), 1);
    }

    #[test]
    fn test_unavailable_database_fails_with_query_error() {
        let store = create_store();
        store.database().set_available(false);
        let err = store.find_all().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::QueryError);
        store.database().set_available(true);
        assert!(store.find_all().is_ok());
    }

    #[test]
    fn test_operation_count() {
        let store = create_store();
        store.count().unwrap();
        store.find_all().unwrap();
        assert_eq!(store.database().operation_count(), 2);
    }
}
