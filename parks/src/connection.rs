use crate::config::RetryPolicy;
use crate::errors::{ErrorKind, ParksError, ParksResult};
use crate::store::{ParkStore, StoreConnector};
use parking_lot::{Mutex, RwLock};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lifecycle of the shared store connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Retrying,
    Connected,
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Retrying => "retrying",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        }
    }
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Owns the single store connection of a service.
///
/// # Purpose
/// The connection is established lazily on the first
/// [`ensure_connection`](ConnectionManager::ensure_connection) call and cached
/// for the lifetime of the manager. Dialing follows the configured
/// [`RetryPolicy`]: a fixed number of attempts separated by a fixed delay.
///
/// # Single flight
/// The dial loop runs under a mutex. Callers arriving while a dial cycle is in
/// progress wait for it and share its outcome, so N concurrent first callers
/// cause one dial when it succeeds, and all of them see the same
/// `ConnectionError` when it does not.
///
/// # Thread Safety
/// `ConnectionManager` is cheap to clone; clones share the same connection.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ConnectionManagerInner>,
}

struct ConnectionManagerInner {
    connector: Arc<dyn StoreConnector>,
    retry_policy: RetryPolicy,
    handle: RwLock<Option<ParkStore>>,
    state: RwLock<ConnectionState>,
    dial_lock: Mutex<()>,
    completed_cycles: AtomicU64,
    last_failure: Mutex<Option<ParksError>>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn StoreConnector>, retry_policy: RetryPolicy) -> ConnectionManager {
        ConnectionManager {
            inner: Arc::new(ConnectionManagerInner {
                connector,
                retry_policy,
                handle: RwLock::new(None),
                state: RwLock::new(ConnectionState::Disconnected),
                dial_lock: Mutex::new(()),
                completed_cycles: AtomicU64::new(0),
                last_failure: Mutex::new(None),
            }),
        }
    }

    /// Returns the open connection, dialing it first if needed.
    pub fn ensure_connection(&self) -> ParksResult<ParkStore> {
        if let Some(store) = self.cached() {
            return Ok(store);
        }

        let observed_cycles = self.inner.completed_cycles.load(Ordering::SeqCst);
        let _guard = self.inner.dial_lock.lock();

        // another caller may have finished a dial cycle while we waited
        if let Some(store) = self.cached() {
            return Ok(store);
        }
        if self.inner.completed_cycles.load(Ordering::SeqCst) != observed_cycles {
            if let Some(failure) = self.inner.last_failure.lock().clone() {
                return Err(failure);
            }
        }

        let result = self.dial();
        self.inner.completed_cycles.fetch_add(1, Ordering::SeqCst);
        result
    }

    /// Closes the cached connection, if any, and returns to `Disconnected`.
    ///
    /// A later `ensure_connection` dials again.
    pub fn shutdown(&self) -> ParksResult<()> {
        let _guard = self.inner.dial_lock.lock();
        let handle = self.inner.handle.write().take();
        self.set_state(ConnectionState::Disconnected);
        match handle {
            Some(store) => {
                log::info!("Closing connection to {}", store.namespace());
                store.close()
            }
            None => Ok(()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.cached().is_some()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.inner.retry_policy
    }

    fn cached(&self) -> Option<ParkStore> {
        let handle = self.inner.handle.read();
        match handle.as_ref() {
            Some(store) if !store.is_closed() => Some(store.clone()),
            _ => None,
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.inner.state.write() = state;
    }

    fn dial(&self) -> ParksResult<ParkStore> {
        let policy = self.inner.retry_policy;
        let target = self.inner.connector.describe();
        if self.inner.handle.read().is_some() {
            log::warn!("Cached connection to {} was closed, reconnecting", target);
        }

        self.set_state(ConnectionState::Connecting);
        log::info!("Connecting to {}", target);

        let mut last_error = None;
        for attempt in 1..=policy.max_attempts() {
            match self.inner.connector.connect() {
                Ok(store) => {
                    *self.inner.handle.write() = Some(store.clone());
                    *self.inner.last_failure.lock() = None;
                    self.set_state(ConnectionState::Connected);
                    log::info!("Connected to {} ({})", target, store.namespace());
                    return Ok(store);
                }
                Err(err) => {
                    log::warn!(
                        "Connection attempt {}/{} to {} failed: {}",
                        attempt,
                        policy.max_attempts(),
                        target,
                        err
                    );
                    last_error = Some(err);
                    if attempt < policy.max_attempts() {
                        self.set_state(ConnectionState::Retrying);
                        log::info!("Retrying connection in {:?}", policy.delay());
                        std::thread::sleep(policy.delay());
                    }
                }
            }
        }

        self.set_state(ConnectionState::Failed);
        let message = format!(
            "failed to connect to database after {} attempts",
            policy.max_attempts()
        );
        log::error!("{} ({})", message, target);
        let err = match last_error {
            Some(cause) => ParksError::new_with_cause(&message, ErrorKind::ConnectionError, cause),
            None => ParksError::new(&message, ErrorKind::ConnectionError),
        };
        *self.inner.last_failure.lock() = Some(err.clone());
        Err(err)
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("target", &self.inner.connector.describe())
            .field("state", &self.state())
            .field("retry_policy", &self.inner.retry_policy)
            .finish()
    }
}
