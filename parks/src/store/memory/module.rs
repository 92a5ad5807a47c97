use crate::errors::ParksResult;
use crate::store::memory::{InMemoryConnector, InMemoryDatabase, InMemoryStoreConfig};
use crate::store::{StoreConnector, StoreModule};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_DATABASE: &str = "parks";
const DEFAULT_COLLECTION: &str = "parkpoints";

/// Store module backed by an [`InMemoryDatabase`].
///
/// ```rust
/// use parks::store::memory::InMemoryStoreModule;
/// use parks::store::StoreModule;
///
/// let module = InMemoryStoreModule::with_config()
///     .collection("parks", "parkpoints")
///     .failing_dials(1)
///     .build();
/// let connector = module.connector().unwrap();
/// assert!(connector.connect().is_err());
/// assert!(connector.connect().is_ok());
/// ```
#[derive(Clone)]
pub struct InMemoryStoreModule {
    connector: InMemoryConnector,
}

impl InMemoryStoreModule {
    pub fn new() -> InMemoryStoreModule {
        InMemoryStoreModuleBuilder::new().build()
    }

    pub fn with_config() -> InMemoryStoreModuleBuilder {
        InMemoryStoreModuleBuilder::new()
    }

    /// The connector handed out by this module, for dial counting in tests.
    pub fn in_memory_connector(&self) -> &InMemoryConnector {
        &self.connector
    }

    pub fn database(&self) -> &InMemoryDatabase {
        self.connector.database()
    }
}

impl Default for InMemoryStoreModule {
    fn default() -> Self {
        InMemoryStoreModule::new()
    }
}

impl StoreModule for InMemoryStoreModule {
    fn connector(&self) -> ParksResult<Arc<dyn StoreConnector>> {
        Ok(Arc::new(self.connector.clone()))
    }
}

pub struct InMemoryStoreModuleBuilder {
    database: Option<InMemoryDatabase>,
    database_name: String,
    collection_name: String,
    store_config: InMemoryStoreConfig,
}

impl InMemoryStoreModuleBuilder {
    pub fn new() -> InMemoryStoreModuleBuilder {
        InMemoryStoreModuleBuilder {
            database: None,
            database_name: DEFAULT_DATABASE.to_string(),
            collection_name: DEFAULT_COLLECTION.to_string(),
            store_config: InMemoryStoreConfig::new(),
        }
    }

    /// Names the database and collection of a fresh in-memory database.
    pub fn collection(mut self, database_name: &str, collection_name: &str) -> Self {
        self.database_name = database_name.to_string();
        self.collection_name = collection_name.to_string();
        self
    }

    /// Attaches an existing database, e.g. to share data between services.
    pub fn database(mut self, database: InMemoryDatabase) -> Self {
        self.database = Some(database);
        self
    }

    pub fn failing_dials(self, count: u32) -> Self {
        self.store_config.set_failing_dials(count);
        self
    }

    pub fn dial_latency(self, latency: Duration) -> Self {
        self.store_config.set_dial_latency(latency);
        self
    }

    pub fn build(self) -> InMemoryStoreModule {
        let database = self
            .database
            .unwrap_or_else(|| InMemoryDatabase::new(&self.database_name, &self.collection_name));
        InMemoryStoreModule {
            connector: InMemoryConnector::new(database, self.store_config),
        }
    }
}

impl Default for InMemoryStoreModuleBuilder {
    fn default() -> Self {
        InMemoryStoreModuleBuilder::new()
    }
}
