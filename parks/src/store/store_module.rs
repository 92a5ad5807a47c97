use crate::errors::ParksResult;
use crate::store::StoreConnector;
use std::sync::Arc;

/// A pluggable storage backend.
///
/// Backend crates expose a module type with a builder; loading it into a
/// [`ParkServiceBuilder`](crate::service::ParkServiceBuilder) selects the
/// connector the service dials through.
pub trait StoreModule {
    fn connector(&self) -> ParksResult<Arc<dyn StoreConnector>>;
}
