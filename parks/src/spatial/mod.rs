//! Geometry, bounding boxes and spatial filters.

mod bounding_box;
mod filter;
mod geometry;
mod index;

pub use bounding_box::BoundingBox;
pub use filter::WithinBox;
pub use geometry::{GeoPoint, GeometryError};
pub use index::{SpatialIndex, SPHERE_2D};
