//! Reference dataset used to seed an empty collection.

use crate::config::SeedSource;
use crate::errors::{ErrorKind, ParksError, ParksResult};
use crate::record::Record;
use serde_json::Value;
use std::path::Path;

/// Park locations compiled into the crate, as `{"name", "state", "pos": [lon, lat]}`.
pub const EMBEDDED_DATASET: &str = include_str!("../data/parkcoord.json");

/// Loads and validates the records of `source`.
pub fn load_seed(source: &SeedSource) -> ParksResult<Vec<Record>> {
    let records = match source {
        SeedSource::Embedded => parse_records(EMBEDDED_DATASET)?,
        SeedSource::File(path) => load_file(path)?,
        SeedSource::Records(records) => records.clone(),
    };
    validate_records(&records)?;
    Ok(records)
}

/// Reads a JSON file holding an array of records.
pub fn load_file(path: &Path) -> ParksResult<Vec<Record>> {
    log::debug!("Reading seed dataset from {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|e| {
        ParksError::new_with_cause(
            &format!("cannot read seed dataset {}", path.display()),
            ErrorKind::DatasetError,
            e.into(),
        )
    })?;
    parse_records(&text)
}

/// Parses a JSON array of objects into records.
pub fn parse_records(text: &str) -> ParksResult<Vec<Record>> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(items) = value else {
        return Err(ParksError::new(
            "seed dataset must be a JSON array of records",
            ErrorKind::DatasetError,
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(Record::from(map)),
            _ => Err(ParksError::new(
                &format!("seed record #{} is not a JSON object", index),
                ErrorKind::DatasetError,
            )),
        })
        .collect()
}

/// Checks that every record carries a well-formed `pos` geometry.
pub fn validate_records(records: &[Record]) -> ParksResult<()> {
    for (index, record) in records.iter().enumerate() {
        if let Err(e) = record.pos() {
            log::error!("Rejecting seed record #{}: {}", index, e);
            return Err(ParksError::new_with_cause(
                &format!("seed record #{} has invalid geometry", index),
                ErrorKind::ValidationError,
                e.into(),
            ));
        }
    }
    Ok(())
}
