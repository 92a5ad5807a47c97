mod config;
mod connector;
mod module;
mod store;

pub use config::*;
pub use connector::*;
pub use module::*;
pub use store::*;
