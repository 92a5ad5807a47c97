//! Spatial filters over record geometry.
//!
//! A filter here is a backend-neutral description of a query. Each store
//! translates it into its own native form: the MongoDB adapter renders a
//! `$geoWithin`/`$box` document, the in-memory store evaluates
//! [`WithinBox::matches`] directly.

use std::fmt::{Display, Formatter};

use crate::record::{Record, POS_FIELD};
use crate::spatial::BoundingBox;

/// Matches records whose point geometry lies inside a rectangle.
///
/// Corners are stored exactly as given, as `[longitude, latitude]` pairs, so
/// a store-native rendering reproduces the request verbatim. Containment is
/// evaluated on the normalised rectangle, edges inclusive.
///
/// ```rust
/// use parks::spatial::WithinBox;
///
/// let filter = WithinBox::new("pos", [10.0, 10.0], [0.0, 0.0]);
/// assert_eq!(filter.corners(), [[10.0, 10.0], [0.0, 0.0]]);
/// assert!(filter.bounding_box().contains_point(5.0, 5.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WithinBox {
    field: String,
    corners: [[f64; 2]; 2],
}

impl WithinBox {
    /// Creates a filter on `field` from two opposite `[lon, lat]` corners.
    pub fn new(field: &str, first: [f64; 2], second: [f64; 2]) -> WithinBox {
        WithinBox {
            field: field.to_string(),
            corners: [first, second],
        }
    }

    /// Creates a filter on the default geometry field.
    pub fn on_pos(first: [f64; 2], second: [f64; 2]) -> WithinBox {
        WithinBox::new(POS_FIELD, first, second)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the two corners in request order, each as `[lon, lat]`.
    pub fn corners(&self) -> [[f64; 2]; 2] {
        self.corners
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_corners(self.corners[0], self.corners[1])
    }

    /// Evaluates the filter against a record. Records without a readable
    /// geometry never match.
    pub fn matches(&self, record: &Record) -> bool {
        match record.geometry(&self.field) {
            Ok(point) => self
                .bounding_box()
                .contains_point(point.longitude(), point.latitude()),
            Err(err) => {
                log::debug!("Skipping record {:?} during box scan: {}", record.id(), err);
                false
            }
        }
    }
}

impl Display for WithinBox {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({} within box [[{}, {}], [{}, {}]])",
            self.field,
            self.corners[0][0],
            self.corners[0][1],
            self.corners[1][0],
            self.corners[1][1]
        )
    }
}
