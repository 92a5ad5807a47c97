use crate::config::MongoConfig;
use crate::wrapper::{
    document_to_record, index_model, is_namespace_not_found, record_to_document, to_parks_error,
    within_box_document, MongoAdapterError,
};
use mongodb::bson::{doc, Document};
use mongodb::options::ClientOptions;
use mongodb::sync::{Client, Collection, Cursor};
use parks::errors::{ErrorKind, ParksError, ParksResult};
use parks::record::Record;
use parks::spatial::{SpatialIndex, WithinBox};
use parks::store::{ParkStore, ParkStoreProvider, StoreConnector};
use parking_lot::RwLock;
use std::sync::Arc;

/// Dials a MongoDB deployment.
///
/// One [`connect`](StoreConnector::connect) builds a client from the
/// connection string, applies the configured timeouts and pings the target
/// database, so an unreachable server is reported at dial time rather than on
/// the first query.
#[derive(Clone)]
pub struct MongoConnector {
    config: MongoConfig,
}

impl MongoConnector {
    pub fn new(config: MongoConfig) -> MongoConnector {
        MongoConnector { config }
    }

    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    fn client_options(&self) -> ParksResult<ClientOptions> {
        let mut options = ClientOptions::parse(self.config.connection_string())
            .run()
            .map_err(|e| {
                ParksError::new(
                    &format!("invalid connection string: {}", e),
                    ErrorKind::ConnectionError,
                )
            })?;
        options.server_selection_timeout = Some(self.config.server_selection_timeout());
        options.connect_timeout = Some(self.config.connect_timeout());
        if let Some(app_name) = self.config.app_name() {
            options.app_name = Some(app_name.to_string());
        }
        Ok(options)
    }
}

impl StoreConnector for MongoConnector {
    fn connect(&self) -> ParksResult<ParkStore> {
        let options = self.client_options()?;
        let client = Client::with_options(options)
            .map_err(|e| to_parks_error(&e, ErrorKind::ConnectionError))?;

        let database = client.database(self.config.database_name());
        database
            .run_command(doc! { "ping": 1 })
            .run()
            .map_err(|e| to_parks_error(&e, ErrorKind::ConnectionError))?;

        log::debug!("Ping to {} succeeded", self.describe());
        let collection = database.collection::<Document>(self.config.collection_name());
        Ok(ParkStore::new(MongoStore::new(
            client,
            collection,
            self.config.namespace(),
        )))
    }

    fn describe(&self) -> String {
        self.config.redacted_connection_string()
    }
}

/// MongoDB implementation of [`ParkStoreProvider`].
///
/// The driver client pools connections internally, so one `MongoStore` is
/// shared by every request. [`close`](ParkStoreProvider::close) drops the
/// client; later calls fail with `QueryError`.
#[derive(Clone)]
pub struct MongoStore {
    inner: Arc<MongoStoreInner>,
}

struct MongoStoreInner {
    namespace: String,
    handle: RwLock<Option<(Client, Collection<Document>)>>,
}

impl MongoStore {
    fn new(client: Client, collection: Collection<Document>, namespace: String) -> MongoStore {
        MongoStore {
            inner: Arc::new(MongoStoreInner {
                namespace,
                handle: RwLock::new(Some((client, collection))),
            }),
        }
    }

    fn collection(&self) -> ParksResult<Collection<Document>> {
        match self.inner.handle.read().as_ref() {
            Some((_, collection)) => Ok(collection.clone()),
            None => Err(ParksError::new(
                &format!("store {} is closed", self.inner.namespace),
                ErrorKind::QueryError,
            )),
        }
    }

    fn collect(&self, cursor: Cursor<Document>) -> ParksResult<Vec<Record>> {
        let mut records = Vec::new();
        for document in cursor {
            let document = document.map_err(MongoAdapterError::from)?;
            records.push(document_to_record(document)?);
        }
        Ok(records)
    }
}

impl ParkStoreProvider for MongoStore {
    fn ensure_index(&self, index: &SpatialIndex) -> ParksResult<()> {
        let collection = self.collection()?;
        let created = collection
            .create_index(index_model(index))
            .run()
            .map_err(MongoAdapterError::from)?;
        log::debug!("Index {} ready on {}", created.index_name, self.inner.namespace);
        Ok(())
    }

    fn count(&self) -> ParksResult<u64> {
        let collection = self.collection()?;
        let count = collection
            .count_documents(doc! {})
            .run()
            .map_err(MongoAdapterError::from)?;
        Ok(count)
    }

    fn insert_many(&self, records: Vec<Record>) -> ParksResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let collection = self.collection()?;
        let documents = records
            .iter()
            .map(record_to_document)
            .collect::<Result<Vec<_>, _>>()?;
        let result = collection
            .insert_many(documents)
            .run()
            .map_err(MongoAdapterError::from)?;
        Ok(result.inserted_ids.len())
    }

    fn find_all(&self) -> ParksResult<Vec<Record>> {
        let collection = self.collection()?;
        let cursor = collection
            .find(doc! {})
            .run()
            .map_err(MongoAdapterError::from)?;
        self.collect(cursor)
    }

    fn find_within(&self, filter: &WithinBox, limit: usize) -> ParksResult<Vec<Record>> {
        let collection = self.collection()?;
        let query = within_box_document(filter);
        log::debug!("find {} limit {} on {}", query, limit, self.inner.namespace);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let cursor = collection
            .find(query)
            .limit(limit)
            .run()
            .map_err(MongoAdapterError::from)?;
        self.collect(cursor)
    }

    fn drop_collection(&self) -> ParksResult<()> {
        let collection = self.collection()?;
        match collection.drop().run() {
            Ok(()) => Ok(()),
            Err(e) if is_namespace_not_found(&e) => {
                log::debug!("{} does not exist, nothing to drop", self.inner.namespace);
                Ok(())
            }
            Err(e) => Err(MongoAdapterError::from(e).into()),
        }
    }

    fn close(&self) -> ParksResult<()> {
        if self.inner.handle.write().take().is_some() {
            log::debug!("Released MongoDB client for {}", self.inner.namespace);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.handle.read().is_none()
    }

    fn namespace(&self) -> String {
        self.inner.namespace.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[ctor::ctor]
    fn init() {
        colog::init();
    }

    fn unreachable_config() -> MongoConfig {
        let mut config = MongoConfig::new();
        // nothing listens on port 1
        config.set_connection_string("mongodb://127.0.0.1:1/parks");
        config.set_server_selection_timeout(Duration::from_millis(200));
        config.set_connect_timeout(Duration::from_millis(200));
        config
    }

    #[test]
    fn test_invalid_connection_string_is_connection_error() {
        let mut config = MongoConfig::new();
        config.set_connection_string("postgres://localhost/parks");
        let err = MongoConnector::new(config).connect().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConnectionError);
        assert!(err.message().contains("invalid connection string"));
    }

    #[test]
    fn test_unreachable_server_is_connection_error() {
        let err = MongoConnector::new(unreachable_config())
            .connect()
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConnectionError);
    }

    #[test]
    fn test_describe_hides_password() {
        let mut config = MongoConfig::new();
        config.set_connection_string("mongodb://admin:pw@db:27017/parks");
        let connector = MongoConnector::new(config);
        assert_eq!(connector.describe(), "mongodb://admin:****@db:27017/parks");
    }
}
