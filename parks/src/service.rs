use crate::config::ParksConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::dataset;
use crate::errors::{ErrorKind, ParksError, ParksResult};
use crate::query::{BoxQuery, BoxQueryParams};
use crate::record::Record;
use crate::spatial::SpatialIndex;
use crate::store::{ParkStore, StoreConnector, StoreModule};
use parking_lot::Mutex;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Result of [`ParkService::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The collection was empty and the dataset was inserted.
    Seeded { inserted: usize },
    /// The collection already held documents; nothing was written.
    AlreadySeeded { existing: u64 },
}

impl Display for SeedOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedOutcome::Seeded { inserted } => write!(f, "inserted {} records", inserted),
            SeedOutcome::AlreadySeeded { existing } => {
                write!(f, "already seeded with {} records", existing)
            }
        }
    }
}

/// Park location service.
///
/// # Purpose
/// `ParkService` is the entry point of the crate. It owns the lazily opened
/// store connection and exposes the spatial queries together with the
/// initialization and maintenance operations.
///
/// The connection stays open across calls until
/// [`shutdown`](ParkService::shutdown). Command-line tools that run a single
/// operation use [`one_shot`](ParkService::one_shot) instead, which closes the
/// connection when the operation ends.
///
/// # Examples
///
/// ```rust
/// use parks::query::BoxQueryParams;
/// use parks::service::ParkService;
/// use parks::store::memory::InMemoryStoreModule;
///
/// let service = ParkService::builder()
///     .load_module(InMemoryStoreModule::new())
///     .build()
///     .unwrap();
/// service.initialize().unwrap();
///
/// // Yellowstone sits inside this box
/// let params = BoxQueryParams::new(45.0, -111.0, 44.0, -110.0);
/// let parks = service.query_box(&params).unwrap();
/// assert_eq!(parks.len(), 1);
/// ```
#[derive(Clone)]
pub struct ParkService {
    inner: Arc<ParkServiceInner>,
}

struct ParkServiceInner {
    config: ParksConfig,
    connection: ConnectionManager,
    index: SpatialIndex,
    seed_lock: Mutex<()>,
}

impl ParkService {
    pub fn builder() -> ParkServiceBuilder {
        ParkServiceBuilder::new()
    }

    pub fn config(&self) -> &ParksConfig {
        &self.inner.config
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.inner.connection
    }

    /// Returns every record of the collection.
    pub fn query_all(&self) -> ParksResult<Vec<Record>> {
        let store = self.inner.connection.ensure_connection()?;
        let records = store
            .find_all()
            .map_err(|e| query_failure("query all parks", &store, e))?;
        log::debug!("Returning {} parks from {}", records.len(), store.namespace());
        Ok(records)
    }

    /// Validates `params` and returns the records inside the box.
    ///
    /// Invalid parameters fail with `ValidationError` before the store is
    /// contacted.
    pub fn query_box(&self, params: &BoxQueryParams) -> ParksResult<Vec<Record>> {
        let query = BoxQuery::try_from(params)?;
        self.query_within(&query)
    }

    /// Runs an already validated box query.
    pub fn query_within(&self, query: &BoxQuery) -> ParksResult<Vec<Record>> {
        let store = self.inner.connection.ensure_connection()?;
        let filter = query.filter();
        let limit = query.effective_limit(self.inner.config.default_limit());
        let records = store
            .find_within(&filter, limit)
            .map_err(|e| query_failure("query parks within box", &store, e))?;
        log::debug!("{} matched {} parks", filter, records.len());
        Ok(records)
    }

    /// Creates the spatial index and seeds the collection when it is empty.
    ///
    /// Safe to call any number of times; only the first call on an empty
    /// collection writes data. Concurrent calls on one service are serialized.
    pub fn initialize(&self) -> ParksResult<SeedOutcome> {
        let store = self.inner.connection.ensure_connection()?;
        let _guard = self.inner.seed_lock.lock();
        let index = &self.inner.index;

        store
            .ensure_index(index)
            .map_err(|e| query_failure(&format!("create index {}", index), &store, e))?;
        log::info!("Ensured index {} on {}", index, store.namespace());

        let existing = store
            .count()
            .map_err(|e| query_failure("count parks", &store, e))?;
        if existing > 0 {
            log::info!(
                "{} already holds {} parks, skipping import",
                store.namespace(),
                existing
            );
            return Ok(SeedOutcome::AlreadySeeded { existing });
        }

        let records = dataset::load_seed(self.inner.config.seed_source()).inspect_err(|e| {
            log::error!("Cannot load seed dataset: {}", e);
        })?;
        let inserted = store
            .insert_many(records)
            .map_err(|e| query_failure("import parks", &store, e))?;
        log::info!("Imported {} parks into {}", inserted, store.namespace());
        Ok(SeedOutcome::Seeded { inserted })
    }

    /// Drops the whole reference collection.
    pub fn flush(&self) -> ParksResult<()> {
        let store = self.inner.connection.ensure_connection()?;
        store
            .drop_collection()
            .map_err(|e| query_failure("flush parks", &store, e))?;
        log::info!("Flushed {}", store.namespace());
        Ok(())
    }

    /// Closes the store connection. The next operation reconnects.
    pub fn shutdown(&self) -> ParksResult<()> {
        self.inner.connection.shutdown()
    }

    /// Turns this service into a runner that closes the connection after
    /// one operation.
    pub fn one_shot(self) -> OneShot {
        OneShot { service: self }
    }
}

impl std::fmt::Debug for ParkService {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParkService")
            .field("collection", &self.inner.config.collection_name())
            .field("connection", &self.inner.connection)
            .finish()
    }
}

/// Runs a single maintenance operation and always closes the connection.
pub struct OneShot {
    service: ParkService,
}

impl OneShot {
    pub fn initialize(self) -> ParksResult<SeedOutcome> {
        let result = self.service.initialize();
        self.finish(result)
    }

    pub fn flush(self) -> ParksResult<()> {
        let result = self.service.flush();
        self.finish(result)
    }

    fn finish<T>(self, result: ParksResult<T>) -> ParksResult<T> {
        let closed = self.service.shutdown();
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                log::error!("Failed to close connection after error: {}", close_err);
                Err(err)
            }
        }
    }
}

pub struct ParkServiceBuilder {
    config: ParksConfig,
    connector: Option<ParksResult<Arc<dyn StoreConnector>>>,
}

impl ParkServiceBuilder {
    pub fn new() -> ParkServiceBuilder {
        ParkServiceBuilder {
            config: ParksConfig::default(),
            connector: None,
        }
    }

    pub fn config(mut self, config: ParksConfig) -> Self {
        self.config = config;
        self
    }

    /// Selects the storage backend.
    pub fn load_module<M: StoreModule>(mut self, module: M) -> Self {
        self.connector = Some(module.connector());
        self
    }

    pub fn build(self) -> ParksResult<ParkService> {
        let connector = match self.connector {
            Some(connector) => connector?,
            None => {
                log::error!("No store module loaded");
                return Err(ParksError::new(
                    "no store module loaded, call load_module before build",
                    ErrorKind::ConfigError,
                ));
            }
        };

        let connection = ConnectionManager::new(connector, self.config.retry_policy());
        Ok(ParkService {
            inner: Arc::new(ParkServiceInner {
                config: self.config,
                connection,
                index: SpatialIndex::default(),
                seed_lock: Mutex::new(()),
            }),
        })
    }
}

impl Default for ParkServiceBuilder {
    fn default() -> Self {
        ParkServiceBuilder::new()
    }
}

fn query_failure(operation: &str, store: &ParkStore, cause: ParksError) -> ParksError {
    log::error!("Failed to {} on {}: {}", operation, store.namespace(), cause);
    if cause.kind() == &ErrorKind::QueryError {
        cause
    } else {
        ParksError::new_with_cause(
            &format!("failed to {}", operation),
            ErrorKind::QueryError,
            cause,
        )
    }
}
