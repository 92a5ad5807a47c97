//! MongoDB backend for the parks service.
//!
//! Records live in one collection with a `2dsphere` index on `pos`; box
//! queries run as `$geoWithin` / `$box` filters.

mod config;
mod module;
mod store;
mod wrapper;

pub use config::*;
pub use module::*;
pub use store::{MongoConnector, MongoStore};
pub use wrapper::MongoAdapterError;
