//! Point geometry for park records.
//!
//! A record's `pos` field is accepted in the two shapes a 2dsphere index can
//! consume:
//! - a legacy coordinate pair `[longitude, latitude]`
//! - a GeoJSON point `{"type": "Point", "coordinates": [longitude, latitude]}`
//!
//! Anything else is rejected when the record is imported.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display};
use thiserror::Error;

use crate::errors::{ErrorKind, ParksError};

/// Errors raised while reading a geometry out of a record
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("missing geometry field '{0}'")]
    Missing(String),

    #[error("unsupported geometry shape: {0}")]
    Unsupported(String),

    #[error("coordinate is not a finite number: {0}")]
    NotNumeric(String),

    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

impl From<GeometryError> for ParksError {
    fn from(err: GeometryError) -> Self {
        ParksError::new(&err.to_string(), ErrorKind::ValidationError)
    }
}

/// A geographic point with validated latitude and longitude.
///
/// The constructor takes `(latitude, longitude)`, the order people say
/// coordinates in. Storage and filters use `(longitude, latitude)`, which is
/// what [`GeoPoint::as_lon_lat`] returns.
///
/// ```rust
/// use parks::spatial::GeoPoint;
///
/// let yosemite = GeoPoint::new(37.8651, -119.5383).unwrap();
/// assert_eq!(yosemite.as_lon_lat(), [-119.5383, 37.8651]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<GeoPoint, GeometryError> {
        if !latitude.is_finite() {
            return Err(GeometryError::NotNumeric(latitude.to_string()));
        }
        if !longitude.is_finite() {
            return Err(GeometryError::NotNumeric(longitude.to_string()));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeometryError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeometryError::LongitudeOutOfRange(longitude));
        }
        Ok(GeoPoint {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Returns the point as a `[longitude, latitude]` pair.
    pub fn as_lon_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    /// Reads a point out of a `pos`-style JSON value.
    pub fn from_value(value: &Value) -> Result<GeoPoint, GeometryError> {
        match value {
            Value::Array(pair) => Self::from_pair(pair),
            Value::Object(object) => {
                let kind = object.get("type").and_then(Value::as_str);
                match (kind, object.get("coordinates")) {
                    (Some("Point"), Some(Value::Array(pair))) => Self::from_pair(pair),
                    (Some(other), _) if other != "Point" => {
                        Err(GeometryError::Unsupported(format!("GeoJSON type '{}'", other)))
                    }
                    _ => Err(GeometryError::Unsupported(value.to_string())),
                }
            }
            other => Err(GeometryError::Unsupported(other.to_string())),
        }
    }

    /// Renders the point as a GeoJSON point value.
    pub fn to_geojson(&self) -> Value {
        serde_json::json!({
            "type": "Point",
            "coordinates": [self.longitude, self.latitude],
        })
    }

    fn from_pair(pair: &[Value]) -> Result<GeoPoint, GeometryError> {
        if pair.len() != 2 {
            return Err(GeometryError::Unsupported(format!(
                "coordinate pair with {} elements",
                pair.len()
            )));
        }
        let longitude = pair[0]
            .as_f64()
            .ok_or_else(|| GeometryError::NotNumeric(pair[0].to_string()))?;
        let latitude = pair[1]
            .as_f64()
            .ok_or_else(|| GeometryError::NotNumeric(pair[1].to_string()))?;
        GeoPoint::new(latitude, longitude)
    }
}

impl Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "POINT({} {})", self.longitude, self.latitude)
    }
}
