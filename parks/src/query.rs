use crate::config::DEFAULT_LIMIT;
use crate::errors::{ErrorKind, ParksError, ParksResult};
use crate::spatial::WithinBox;
use serde::Deserialize;
use std::fmt::{Display, Formatter};

/// Message returned to clients whose box query cannot be parsed.
pub const BOX_QUERY_USAGE: &str = "this endpoint requires two pair of lat, long coordinates: lat1 lon1 lat2 lon2\na query 'limit' parameter can be optionally specified as well.";

/// Raw, unvalidated parameters of a bounding-box query.
///
/// Every field is kept as text so that missing and non-numeric values can be
/// reported uniformly as a validation failure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BoxQueryParams {
    pub lat1: Option<String>,
    pub lon1: Option<String>,
    pub lat2: Option<String>,
    pub lon2: Option<String>,
    pub limit: Option<String>,
}

impl BoxQueryParams {
    /// Parameters from numeric coordinates, without a limit.
    pub fn new(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> BoxQueryParams {
        BoxQueryParams {
            lat1: Some(lat1.to_string()),
            lon1: Some(lon1.to_string()),
            lat2: Some(lat2.to_string()),
            lon2: Some(lon2.to_string()),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: &str) -> BoxQueryParams {
        self.limit = Some(limit.to_string());
        self
    }
}

/// A validated bounding-box query.
///
/// Corners are given as (latitude, longitude) pairs, the way clients send
/// them; [`filter`](BoxQuery::filter) turns them into the (longitude, latitude)
/// order the store expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxQuery {
    lat1: f64,
    lon1: f64,
    lat2: f64,
    lon2: f64,
    limit: Option<usize>,
}

impl BoxQuery {
    pub fn new(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> ParksResult<BoxQuery> {
        for (name, value) in [("lat1", lat1), ("lon1", lon1), ("lat2", lat2), ("lon2", lon2)] {
            if !value.is_finite() {
                return Err(invalid(&format!("{} is not a finite number", name)));
            }
        }
        Ok(BoxQuery {
            lat1,
            lon1,
            lat2,
            lon2,
            limit: None,
        })
    }

    /// Sets an explicit row limit; it must be positive.
    pub fn with_limit(mut self, limit: usize) -> ParksResult<BoxQuery> {
        if limit == 0 {
            return Err(invalid("limit must be a positive integer"));
        }
        self.limit = Some(limit);
        Ok(self)
    }

    pub fn first_corner(&self) -> (f64, f64) {
        (self.lat1, self.lon1)
    }

    pub fn second_corner(&self) -> (f64, f64) {
        (self.lat2, self.lon2)
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// The limit to apply, `default_limit` when none was requested.
    pub fn effective_limit(&self, default_limit: usize) -> usize {
        self.limit.unwrap_or(default_limit)
    }

    /// Store filter over `pos` with corners `[[lon1, lat1], [lon2, lat2]]`.
    pub fn filter(&self) -> WithinBox {
        WithinBox::on_pos([self.lon1, self.lat1], [self.lon2, self.lat2])
    }
}

impl TryFrom<&BoxQueryParams> for BoxQuery {
    type Error = ParksError;

    fn try_from(params: &BoxQueryParams) -> Result<Self, Self::Error> {
        let query = BoxQuery::new(
            coordinate("lat1", &params.lat1)?,
            coordinate("lon1", &params.lon1)?,
            coordinate("lat2", &params.lat2)?,
            coordinate("lon2", &params.lon2)?,
        )?;

        match params.limit.as_deref().map(str::trim) {
            None | Some("") => Ok(query),
            Some(raw) => match raw.parse::<usize>() {
                Ok(limit) => query.with_limit(limit),
                Err(_) => Err(invalid(&format!("limit '{}' is not a positive integer", raw))),
            },
        }
    }
}

impl TryFrom<BoxQueryParams> for BoxQuery {
    type Error = ParksError;

    fn try_from(params: BoxQueryParams) -> Result<Self, Self::Error> {
        BoxQuery::try_from(&params)
    }
}

impl Display for BoxQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "box ({}, {}) - ({}, {}) limit {}",
            self.lat1,
            self.lon1,
            self.lat2,
            self.lon2,
            self.limit.unwrap_or(DEFAULT_LIMIT)
        )
    }
}

fn coordinate(name: &str, raw: &Option<String>) -> ParksResult<f64> {
    let raw = match raw.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(invalid(&format!("missing query parameter '{}'", name))),
    };
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(invalid(&format!("query parameter '{}' is not a number: '{}'", name, raw))),
    }
}

fn invalid(detail: &str) -> ParksError {
    log::debug!("Rejected box query: {}", detail);
    ParksError::new_with_cause(
        BOX_QUERY_USAGE,
        ErrorKind::ValidationError,
        ParksError::new(detail, ErrorKind::ValidationError),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(lat1: &str, lon1: &str, lat2: &str, lon2: &str) -> BoxQueryParams {
        BoxQueryParams {
            lat1: Some(lat1.to_string()),
            lon1: Some(lon1.to_string()),
            lat2: Some(lat2.to_string()),
            lon2: Some(lon2.to_string()),
            limit: None,
        }
    }

    #[test]
    fn test_valid_params() {
        let query = BoxQuery::try_from(&params("40.5", "-120", "30", "-110.25")).unwrap();
        assert_eq!(query.first_corner(), (40.5, -120.0));
        assert_eq!(query.second_corner(), (30.0, -110.25));
        assert_eq!(query.limit(), None);
        assert_eq!(query.effective_limit(DEFAULT_LIMIT), 40);
    }

    #[test]
    fn test_zero_is_a_valid_coordinate() {
        let query = BoxQuery::try_from(&params("0", "0", "10", "10")).unwrap();
        assert_eq!(query.first_corner(), (0.0, 0.0));
    }

    #[test]
    fn test_filter_swaps_to_lon_lat() {
        let query = BoxQuery::new(1.0, 2.0, 3.0, 4.0).unwrap();
        assert_eq!(query.filter().corners(), [[2.0, 1.0], [4.0, 3.0]]);
        assert_eq!(query.filter().field(), "pos");
    }

    #[test]
    fn test_missing_coordinate() {
        let mut p = params("1", "2", "3", "4");
        p.lon2 = None;
        let err = BoxQuery::try_from(&p).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ValidationError);
        assert_eq!(err.message(), BOX_QUERY_USAGE);
        assert!(err.cause().unwrap().message().contains("lon2"));

        let err = BoxQuery::try_from(&params("1", " ", "3", "4")).unwrap_err();
        assert!(err.cause().unwrap().message().contains("lon1"));
    }

    #[test]
    fn test_non_numeric_coordinate() {
        let err = BoxQuery::try_from(&params("abc", "2", "3", "4")).unwrap_err();
        assert!(err.is_client_error());
        assert!(err.cause().unwrap().message().contains("lat1"));

        assert!(BoxQuery::try_from(&params("NaN", "2", "3", "4")).is_err());
        assert!(BoxQuery::try_from(&params("inf", "2", "3", "4")).is_err());
    }

    #[test]
    fn test_limit_parsing() {
        let query = BoxQuery::try_from(&params("1", "2", "3", "4").with_limit(" 5 ")).unwrap();
        assert_eq!(query.limit(), Some(5));
        assert_eq!(query.effective_limit(40), 5);

        let query = BoxQuery::try_from(&params("1", "2", "3", "4").with_limit("")).unwrap();
        assert_eq!(query.limit(), None);

        for bad in ["0", "-3", "2.5", "ten"] {
            let err = BoxQuery::try_from(&params("1", "2", "3", "4").with_limit(bad)).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);
        }
    }

    #[test]
    fn test_params_new_round_trips() {
        let query = BoxQuery::try_from(BoxQueryParams::new(5.5, -3.0, 0.0, 1.0)).unwrap();
        assert_eq!(query.first_corner(), (5.5, -3.0));
        assert_eq!(query.second_corner(), (0.0, 1.0));
    }

    #[test]
    fn test_display() {
        let query = BoxQuery::new(1.0, 2.0, 3.0, 4.0).unwrap().with_limit(7).unwrap();
        assert_eq!(query.to_string(), "box (1, 2) - (3, 4) limit 7");
    }
}
