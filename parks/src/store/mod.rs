//! Storage backend abstractions and the in-memory backend.

mod connector;
pub mod memory;
mod park_store;
mod store_module;

pub use connector::*;
pub use park_store::*;
pub use store_module::*;
