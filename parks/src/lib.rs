//! # Parks - Geospatial Park Location Backend
//!
//! Parks keeps a reference collection of park locations in a document store
//! and answers spatial queries over it.
//!
//! ## Key Features
//!
//! - **Lazy connection**: the store is dialed on first use, with a fixed
//!   retry budget, and shared by every caller afterwards
//! - **Idempotent initialization**: a `2dsphere` index on `pos` plus a
//!   one-time import of the reference dataset
//! - **Bounding-box queries**: `(lat, lon)` corners translated to the
//!   store's `[lon, lat]` box filter, with a default limit of 40
//! - **Pluggable stores**: an in-memory store ships with this crate, MongoDB
//!   lives in `parks_mongo_adapter`
//!
//! ## Quick Start
//!
//! ```rust
//! use parks::query::BoxQueryParams;
//! use parks::service::ParkService;
//! use parks::store::memory::InMemoryStoreModule;
//!
//! # fn main() -> parks::errors::ParksResult<()> {
//! let service = ParkService::builder()
//!     .load_module(InMemoryStoreModule::new())
//!     .build()?;
//!
//! service.initialize()?;
//! let everything = service.query_all()?;
//! let utah = service.query_box(&BoxQueryParams::new(42.0, -114.0, 37.0, -109.0))?;
//! assert!(utah.len() < everything.len());
//!
//! service.flush()?;
//! service.shutdown()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Service configuration and retry policy
//! - [`connection`] - Connection manager and its state machine
//! - [`dataset`] - Embedded reference dataset and seed loading
//! - [`errors`] - Error types and result definitions
//! - [`query`] - Bounding-box query parsing and validation
//! - [`record`] - Schemaless point-of-interest records
//! - [`service`] - The `ParkService` facade and one-shot runner
//! - [`spatial`] - Geometry, bounding boxes, filters and index descriptors
//! - [`store`] - Storage backend abstractions and the in-memory store

pub mod config;
pub mod connection;
pub mod dataset;
pub mod errors;
pub mod query;
pub mod record;
pub mod service;
pub mod spatial;
pub mod store;
