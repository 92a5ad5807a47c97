use parks::config::{ParksConfig, DEFAULT_COLLECTION, DEFAULT_CONNECTION_STRING};
use std::time::Duration;

pub const DEFAULT_SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_APP_NAME: &str = "parks";

/// Configuration for the MongoDB store.
///
/// # Purpose
/// Holds what a connector needs to dial a deployment: the connection string,
/// the target database and collection, and the client timeouts that bound
/// a single dial attempt. Retrying is left to the connection manager.
///
/// # Characteristics
/// - **Cloneable**: a connector keeps its own copy
/// - **Credential safe**: `Debug` masks the password of the connection string
#[derive(Clone)]
pub struct MongoConfig {
    connection_string: String,
    database_name: String,
    collection_name: String,
    server_selection_timeout: Duration,
    connect_timeout: Duration,
    app_name: Option<String>,
}

impl MongoConfig {
    pub fn new() -> MongoConfig {
        MongoConfig::from_parks_config(&ParksConfig::default())
    }

    /// Takes the connection string, database and collection from `config`.
    pub fn from_parks_config(config: &ParksConfig) -> MongoConfig {
        MongoConfig {
            connection_string: config.connection_string().to_string(),
            database_name: config.database_name(),
            collection_name: config.collection_name().to_string(),
            server_selection_timeout: DEFAULT_SERVER_SELECTION_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            app_name: Some(DEFAULT_APP_NAME.to_string()),
        }
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn server_selection_timeout(&self) -> Duration {
        self.server_selection_timeout
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    /// `<database>.<collection>`
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database_name, self.collection_name)
    }

    /// Connection string with the password masked.
    pub fn redacted_connection_string(&self) -> String {
        ParksConfig::builder()
            .connection_string(&self.connection_string)
            .build()
            .redacted_connection_string()
    }

    pub(crate) fn set_connection_string(&mut self, uri: &str) {
        self.connection_string = uri.to_string();
    }

    pub(crate) fn set_database_name(&mut self, name: &str) {
        self.database_name = name.to_string();
    }

    pub(crate) fn set_collection_name(&mut self, name: &str) {
        self.collection_name = name.to_string();
    }

    pub(crate) fn set_server_selection_timeout(&mut self, timeout: Duration) {
        self.server_selection_timeout = timeout;
    }

    pub(crate) fn set_connect_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = timeout;
    }

    pub(crate) fn set_app_name(&mut self, app_name: Option<String>) {
        self.app_name = app_name;
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        MongoConfig::new()
    }
}

impl std::fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoConfig")
            .field("connection_string", &self.redacted_connection_string())
            .field("namespace", &self.namespace())
            .field("server_selection_timeout", &self.server_selection_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("app_name", &self.app_name)
            .finish()
    }
}
