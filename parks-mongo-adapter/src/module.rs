use crate::config::MongoConfig;
use crate::store::MongoConnector;
use parks::config::ParksConfig;
use parks::errors::{ErrorKind, ParksError, ParksResult};
use parks::store::{StoreConnector, StoreModule};
use std::sync::Arc;
use std::time::Duration;

/// Park store module backed by MongoDB.
///
/// # Examples
///
/// ```rust,ignore
/// use parks::config::ParksConfig;
/// use parks::service::ParkService;
/// use parks_mongo_adapter::MongoModule;
///
/// # fn main() -> parks::errors::ParksResult<()> {
/// let config = ParksConfig::from_env()?;
/// let service = ParkService::builder()
///     .load_module(MongoModule::from_parks_config(&config).build()?)
///     .config(config)
///     .build()?;
/// service.initialize()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MongoModule {
    store_config: MongoConfig,
}

impl MongoModule {
    pub fn with_config() -> MongoModuleBuilder {
        MongoModuleBuilder::new()
    }

    /// Builder preloaded with the connection settings of `config`.
    pub fn from_parks_config(config: &ParksConfig) -> MongoModuleBuilder {
        MongoModuleBuilder {
            store_config: MongoConfig::from_parks_config(config),
        }
    }

    pub fn config(&self) -> &MongoConfig {
        &self.store_config
    }
}

impl StoreModule for MongoModule {
    fn connector(&self) -> ParksResult<Arc<dyn StoreConnector>> {
        Ok(Arc::new(MongoConnector::new(self.store_config.clone())))
    }
}

pub struct MongoModuleBuilder {
    store_config: MongoConfig,
}

impl MongoModuleBuilder {
    pub fn new() -> MongoModuleBuilder {
        MongoModuleBuilder {
            store_config: MongoConfig::new(),
        }
    }

    /// Sets the connection string. The database named in its path becomes
    /// the target database unless [`database`](Self::database) overrides it.
    pub fn connection_string(mut self, uri: &str) -> Self {
        self.store_config.set_connection_string(uri);
        if let Some(name) = parks::config::database_from_uri(uri) {
            self.store_config.set_database_name(&name);
        }
        self
    }

    pub fn database(mut self, name: &str) -> Self {
        self.store_config.set_database_name(name);
        self
    }

    pub fn collection(mut self, name: &str) -> Self {
        self.store_config.set_collection_name(name);
        self
    }

    pub fn server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.store_config.set_server_selection_timeout(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.store_config.set_connect_timeout(timeout);
        self
    }

    pub fn app_name(mut self, app_name: &str) -> Self {
        self.store_config.set_app_name(Some(app_name.to_string()));
        self
    }

    pub fn build(self) -> ParksResult<MongoModule> {
        let config = &self.store_config;
        if config.connection_string().trim().is_empty() {
            return Err(ParksError::new(
                "MongoDB connection string is empty",
                ErrorKind::ConfigError,
            ));
        }
        if config.database_name().is_empty() || config.collection_name().is_empty() {
            return Err(ParksError::new(
                "MongoDB database and collection names must not be empty",
                ErrorKind::ConfigError,
            ));
        }
        Ok(MongoModule {
            store_config: self.store_config,
        })
    }
}

impl Default for MongoModuleBuilder {
    fn default() -> Self {
        MongoModuleBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let module = MongoModule::with_config().build().unwrap();
        assert_eq!(module.config().namespace(), "parks.parkpoints");
        assert!(module.connector().is_ok());
    }

    #[test]
    fn test_connection_string_sets_database() {
        let module = MongoModule::with_config()
            .connection_string("mongodb://db:27017/geo?ssl=false")
            .collection("points")
            .app_name("parks-test")
            .build()
            .unwrap();
        assert_eq!(module.config().namespace(), "geo.points");
        assert_eq!(module.config().app_name(), Some("parks-test"));
    }

    #[test]
    fn test_database_overrides_uri() {
        let module = MongoModule::with_config()
            .connection_string("mongodb://db:27017/geo")
            .database("other")
            .build()
            .unwrap();
        assert_eq!(module.config().database_name(), "other");
    }

    #[test]
    fn test_timeouts() {
        let module = MongoModule::with_config()
            .server_selection_timeout(Duration::from_millis(250))
            .connect_timeout(Duration::from_millis(500))
            .build()
            .unwrap();
        assert_eq!(
            module.config().server_selection_timeout(),
            Duration::from_millis(250)
        );
        assert_eq!(module.config().connect_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_debug_hides_password() {
        let module = MongoModule::with_config()
            .connection_string("mongodb://admin:hunter2@db:27017/parks")
            .build()
            .unwrap();
        let text = format!("{:?}", module);
        assert!(text.contains("MongoModule"));
        assert!(text.contains("admin:****@db:27017"));
        assert!(!text.contains("hunter2"));
    }

    #[test]
    fn test_empty_values_rejected() {
        let err = MongoModule::with_config()
            .connection_string(" ")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConfigError);

        assert!(MongoModule::with_config().collection("").build().is_err());
    }

    #[test]
    fn test_from_parks_config() {
        let config = ParksConfig::builder()
            .connection_string("mongodb://db:27017/geo")
            .collection_name("points")
            .build();
        let module = MongoModule::from_parks_config(&config).build().unwrap();
        assert_eq!(module.config().namespace(), "geo.points");
    }
}
