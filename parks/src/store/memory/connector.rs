use crate::errors::{ErrorKind, ParksError, ParksResult};
use crate::store::memory::{InMemoryDatabase, InMemoryStore, InMemoryStoreConfig};
use crate::store::{ParkStore, StoreConnector};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Connector that "dials" an [`InMemoryDatabase`].
///
/// Every call to [`connect`](StoreConnector::connect) counts as one dial. The
/// configured number of leading dials fail with `ConnectionError`, and each
/// dial can be slowed down, which lets tests drive the retry loop and the
/// single-flight guard of the connection manager.
#[derive(Clone)]
pub struct InMemoryConnector {
    inner: Arc<InMemoryConnectorInner>,
}

struct InMemoryConnectorInner {
    database: InMemoryDatabase,
    config: InMemoryStoreConfig,
    dials: AtomicU64,
    failures_remaining: AtomicU32,
}

impl InMemoryConnector {
    pub fn new(database: InMemoryDatabase, config: InMemoryStoreConfig) -> InMemoryConnector {
        let failures = config.failing_dials();
        InMemoryConnector {
            inner: Arc::new(InMemoryConnectorInner {
                database,
                config,
                dials: AtomicU64::new(0),
                failures_remaining: AtomicU32::new(failures),
            }),
        }
    }

    pub fn database(&self) -> &InMemoryDatabase {
        &self.inner.database
    }

    /// Total number of dial attempts, successful or not.
    pub fn dial_count(&self) -> u64 {
        self.inner.dials.load(Ordering::SeqCst)
    }

    /// Makes the next `count` dials fail.
    pub fn fail_next_dials(&self, count: u32) {
        self.inner.failures_remaining.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.inner
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

impl StoreConnector for InMemoryConnector {
    fn connect(&self) -> ParksResult<ParkStore> {
        let dial = self.inner.dials.fetch_add(1, Ordering::SeqCst) + 1;
        let latency = self.inner.config.dial_latency();
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }

        if self.take_failure() {
            return Err(ParksError::new(
                &format!("connect ECONNREFUSED {} (dial #{})", self.describe(), dial),
                ErrorKind::ConnectionError,
            ));
        }

        Ok(ParkStore::new(InMemoryStore::new(self.inner.database.clone())))
    }

    fn describe(&self) -> String {
        format!("memory://{}", self.inner.database.namespace())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn database() -> InMemoryDatabase {
        InMemoryDatabase::new("parks", "parkpoints")
    }

    #[test]
    fn test_connect_counts_dials() {
        let connector = InMemoryConnector::new(database(), InMemoryStoreConfig::new());
        let store = connector.connect().unwrap();
        assert!(!store.is_closed());
        connector.connect().unwrap();
        assert_eq!(connector.dial_count(), 2);
    }

    #[test]
    fn test_failing_dials_then_success() {
        let config = InMemoryStoreConfig::new();
        config.set_failing_dials(2);
        let connector = InMemoryConnector::new(database(), config);

        let err = connector.connect().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConnectionError);
        assert!(err.message().contains("ECONNREFUSED"));
        assert!(connector.connect().is_err());
        assert!(connector.connect().is_ok());
        assert_eq!(connector.dial_count(), 3);
    }

    #[test]
    fn test_fail_next_dials() {
        let connector = InMemoryConnector::new(database(), InMemoryStoreConfig::new());
        connector.fail_next_dials(1);
        assert!(connector.connect().is_err());
        assert!(connector.connect().is_ok());
    }

    #[test]
    fn test_dial_latency() {
        let config = InMemoryStoreConfig::new();
        config.set_dial_latency(Duration::from_millis(20));
        let connector = InMemoryConnector::new(database(), config);
        let start = Instant::now();
        connector.connect().unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_stores_share_database() {
        let connector = InMemoryConnector::new(database(), InMemoryStoreConfig::new());
        let first = connector.connect().unwrap();
        first
            .insert_many(vec![crate::record::Record::new()])
            .unwrap();
        let second = connector.connect().unwrap();
        assert_eq!(second.count().unwrap(), 1);
    }

    #[test]
    fn test_describe() {
        let connector = InMemoryConnector::new(database(), InMemoryStoreConfig::new());
        assert_eq!(connector.describe(), "memory://parks.parkpoints");
    }
}
