use crate::errors::{ErrorKind, ParksError, ParksResult};
use crate::record::Record;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONNECTION_STRING: &str = "mongodb://localhost:27017/parks";
pub const DEFAULT_COLLECTION: &str = "parkpoints";
pub const DEFAULT_DATABASE: &str = "parks";
pub const DEFAULT_LIMIT: usize = 40;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

pub const ENV_DB_URI: &str = "PARKS_DB_URI";
pub const ENV_COLLECTION: &str = "PARKS_COLLECTION";
pub const ENV_DB_NAME: &str = "PARKS_DB_NAME";
pub const ENV_RETRY_ATTEMPTS: &str = "PARKS_DB_RETRY_ATTEMPTS";
pub const ENV_RETRY_DELAY_MS: &str = "PARKS_DB_RETRY_DELAY_MS";
pub const ENV_SEED_FILE: &str = "PARKS_SEED_FILE";

/// Fixed-backoff retry budget for dialing the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy. At least one attempt is always made.
    pub fn new(max_attempts: u32, delay: Duration) -> RetryPolicy {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

/// Where the reference dataset comes from on first initialization.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SeedSource {
    /// The park dataset compiled into this crate.
    #[default]
    Embedded,
    /// A JSON file holding an array of records.
    File(PathBuf),
    /// Records supplied directly, mostly by tests.
    Records(Vec<Record>),
}

/// Settings of a [`ParkService`](crate::service::ParkService).
///
/// Built either from the environment with [`ParksConfig::from_env`] or
/// programmatically:
///
/// ```rust
/// use parks::config::{ParksConfig, RetryPolicy};
/// use std::time::Duration;
///
/// let config = ParksConfig::builder()
///     .connection_string("mongodb://db.internal:27017/parkdb?retryWrites=true")
///     .collection_name("points")
///     .retry_policy(RetryPolicy::new(3, Duration::from_millis(10)))
///     .build();
/// assert_eq!(config.database_name(), "parkdb");
/// assert_eq!(config.retry_policy().max_attempts(), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParksConfig {
    connection_string: String,
    collection_name: String,
    default_database: String,
    retry_policy: RetryPolicy,
    seed_source: SeedSource,
    default_limit: usize,
}

impl ParksConfig {
    pub fn builder() -> ParksConfigBuilder {
        ParksConfigBuilder::new()
    }

    /// Reads settings from the process environment, falling back to defaults.
    pub fn from_env() -> ParksResult<ParksConfig> {
        ParksConfig::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> ParksResult<ParksConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut builder = ParksConfig::builder();
        if let Some(uri) = value(ENV_DB_URI) {
            builder = builder.connection_string(&uri);
        }
        if let Some(collection) = value(ENV_COLLECTION) {
            builder = builder.collection_name(&collection);
        }
        if let Some(database) = value(ENV_DB_NAME) {
            builder = builder.default_database(&database);
        }

        let attempts = match value(ENV_RETRY_ATTEMPTS) {
            Some(raw) => parse_number::<u32>(ENV_RETRY_ATTEMPTS, &raw)?,
            None => DEFAULT_RETRY_ATTEMPTS,
        };
        if attempts == 0 {
            return Err(ParksError::new(
                &format!("{} must be at least 1", ENV_RETRY_ATTEMPTS),
                ErrorKind::ConfigError,
            ));
        }
        let delay = match value(ENV_RETRY_DELAY_MS) {
            Some(raw) => Duration::from_millis(parse_number::<u64>(ENV_RETRY_DELAY_MS, &raw)?),
            None => DEFAULT_RETRY_DELAY,
        };
        builder = builder.retry_policy(RetryPolicy::new(attempts, delay));

        if let Some(path) = value(ENV_SEED_FILE) {
            builder = builder.seed_source(SeedSource::File(PathBuf::from(path)));
        }
        Ok(builder.build())
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn default_database(&self) -> &str {
        &self.default_database
    }

    /// Database named by the connection string.
    ///
    /// The last path segment of the URI with its query string removed, e.g.
    /// `mongodb://host:27017/parks?ssl=true` yields `parks`. Falls back to the
    /// configured default when the URI names no database.
    pub fn database_name(&self) -> String {
        database_from_uri(&self.connection_string)
            .unwrap_or_else(|| self.default_database.clone())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    pub fn seed_source(&self) -> &SeedSource {
        &self.seed_source
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    /// Connection string with any password masked, for log lines.
    pub fn redacted_connection_string(&self) -> String {
        redact_uri(&self.connection_string)
    }
}

impl Default for ParksConfig {
    fn default() -> Self {
        ParksConfigBuilder::new().build()
    }
}

pub struct ParksConfigBuilder {
    config: ParksConfig,
}

impl ParksConfigBuilder {
    pub fn new() -> ParksConfigBuilder {
        ParksConfigBuilder {
            config: ParksConfig {
                connection_string: DEFAULT_CONNECTION_STRING.to_string(),
                collection_name: DEFAULT_COLLECTION.to_string(),
                default_database: DEFAULT_DATABASE.to_string(),
                retry_policy: RetryPolicy::default(),
                seed_source: SeedSource::Embedded,
                default_limit: DEFAULT_LIMIT,
            },
        }
    }

    pub fn connection_string(mut self, uri: &str) -> Self {
        self.config.connection_string = uri.to_string();
        self
    }

    pub fn collection_name(mut self, name: &str) -> Self {
        self.config.collection_name = name.to_string();
        self
    }

    pub fn default_database(mut self, name: &str) -> Self {
        self.config.default_database = name.to_string();
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry_policy = policy;
        self
    }

    pub fn seed_source(mut self, source: SeedSource) -> Self {
        self.config.seed_source = source;
        self
    }

    pub fn seed_records(self, records: Vec<Record>) -> Self {
        self.seed_source(SeedSource::Records(records))
    }

    /// Row limit used when a box query names none. Zero is ignored.
    pub fn default_limit(mut self, limit: usize) -> Self {
        if limit > 0 {
            self.config.default_limit = limit;
        }
        self
    }

    pub fn build(self) -> ParksConfig {
        self.config
    }
}

impl Default for ParksConfigBuilder {
    fn default() -> Self {
        ParksConfigBuilder::new()
    }
}

fn parse_number<T>(key: &str, raw: &str) -> ParksResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| {
        log::error!("Invalid value '{}' for {}: {}", raw, key, e);
        ParksError::new(
            &format!("invalid value '{}' for {}: {}", raw, key, e),
            ErrorKind::ConfigError,
        )
    })
}

/// Returns the database segment of a store URI, if any.
pub fn database_from_uri(uri: &str) -> Option<String> {
    // options may carry paths of their own, so drop them before looking
    let without_options = uri.split('?').next().unwrap_or_default();
    let rest = without_options
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_options);
    let hosts = rest.rsplit_once('@').map(|(_, hosts)| hosts).unwrap_or(rest);
    let (_, name) = hosts.split_once('/')?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    let host_end = rest.find(['/', '?']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(host_end);
    match authority.rsplit_once('@') {
        Some((credentials, hosts)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{}://{}:****@{}{}", scheme, user, hosts, tail)
        }
        None => uri.to_string(),
    }
}
