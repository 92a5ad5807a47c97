use crate::errors::ParksResult;
use crate::record::Record;
use crate::spatial::{SpatialIndex, WithinBox};
use std::ops::Deref;
use std::sync::Arc;

/// Low-level interface over one open connection to the reference collection.
///
/// # Purpose
/// Defines the contract every backend must follow. A provider is bound to a
/// single database and collection; it is created by a
/// [`StoreConnector`](crate::store::StoreConnector) once a dial succeeds and
/// is shared by every request until it is closed.
///
/// # Implementations
/// - `InMemoryStore`: in-process storage for tests and demos
/// - `MongoStore`: MongoDB backend from the `parks_mongo_adapter` crate
///
/// # Errors
/// Every store-side failure is reported as `ErrorKind::QueryError`.
///
/// # Thread Safety
/// Implementers must be `Send + Sync`; the store client is expected to pool
/// and multiplex concurrent calls itself.
pub trait ParkStoreProvider: Send + Sync {
    /// Creates the spatial index if it does not exist yet.
    ///
    /// Must be idempotent and must not block concurrent reads.
    fn ensure_index(&self, index: &SpatialIndex) -> ParksResult<()>;

    /// Counts the documents in the collection.
    fn count(&self) -> ParksResult<u64>;

    /// Inserts all records, returning how many were written.
    fn insert_many(&self, records: Vec<Record>) -> ParksResult<usize>;

    /// Returns every document, unfiltered and unlimited.
    fn find_all(&self) -> ParksResult<Vec<Record>>;

    /// Returns at most `limit` documents matched by `filter`.
    fn find_within(&self, filter: &WithinBox, limit: usize) -> ParksResult<Vec<Record>>;

    /// Drops the whole collection, including its indexes.
    ///
    /// Dropping a collection that does not exist is not an error.
    fn drop_collection(&self) -> ParksResult<()>;

    /// Releases the underlying client. Subsequent calls fail.
    fn close(&self) -> ParksResult<()>;

    /// Checks if the connection has been closed.
    fn is_closed(&self) -> bool;

    /// Returns `<database>.<collection>`, used in log lines.
    fn namespace(&self) -> String;
}

/// High-level handle to an open store connection.
///
/// `ParkStore` wraps a concrete [`ParkStoreProvider`] behind an `Arc`, so
/// cloning it is cheap and every clone talks to the same connection.
#[derive(Clone)]
pub struct ParkStore {
    inner: Arc<dyn ParkStoreProvider>,
}

impl ParkStore {
    pub fn new<T: ParkStoreProvider + 'static>(inner: T) -> Self {
        ParkStore {
            inner: Arc::new(inner),
        }
    }
}

impl Deref for ParkStore {
    type Target = Arc<dyn ParkStoreProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::fmt::Debug for ParkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParkStore")
            .field("namespace", &self.inner.namespace())
            .field("closed", &self.inner.is_closed())
            .finish()
    }
}
