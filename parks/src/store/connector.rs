use crate::errors::ParksResult;
use crate::store::ParkStore;

/// Dials a store and hands back an open connection.
///
/// A connector performs exactly one dial per [`connect`](StoreConnector::connect)
/// call; retrying and caching are the job of the
/// [`ConnectionManager`](crate::connection::ConnectionManager).
/// Dial and authentication failures are reported as `ErrorKind::ConnectionError`.
pub trait StoreConnector: Send + Sync {
    fn connect(&self) -> ParksResult<ParkStore>;

    /// Human readable target of the dial, with credentials removed.
    fn describe(&self) -> String;
}
