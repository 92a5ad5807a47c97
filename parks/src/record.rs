use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

use crate::errors::{ErrorKind, ParksError, ParksResult};
use crate::spatial::{GeoPoint, GeometryError};

/// Field holding a record's geometry.
pub const POS_FIELD: &str = "pos";

/// Field holding a record's identifier.
pub const ID_FIELD: &str = "_id";

/// A point-of-interest document.
///
/// Records are opaque JSON objects. The only field the backend relies on is
/// [`POS_FIELD`]; every other attribute is carried through untouched.
///
/// ```rust
/// use parks::record::Record;
/// use serde_json::json;
///
/// let record = Record::from_value(json!({"name": "Zion", "pos": [-113.0263, 37.2982]})).unwrap();
/// assert_eq!(record.pos().unwrap().latitude(), 37.2982);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Record {
        Record(Map::new())
    }

    /// Builds a record from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> ParksResult<Record> {
        match value {
            Value::Object(map) => Ok(Record(map)),
            other => Err(ParksError::new(
                &format!("record must be a JSON object, found {}", json_type(&other)),
                ErrorKind::ValidationError,
            )),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert<V: Into<Value>>(&mut self, key: &str, value: V) -> Option<Value> {
        self.0.insert(key.to_string(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the record id rendered as a string, if the record has one.
    pub fn id(&self) -> Option<String> {
        match self.0.get(ID_FIELD)? {
            Value::String(id) => Some(id.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Reads the geometry stored under [`POS_FIELD`].
    pub fn pos(&self) -> Result<GeoPoint, GeometryError> {
        self.geometry(POS_FIELD)
    }

    /// Reads the geometry stored under `field`.
    pub fn geometry(&self, field: &str) -> Result<GeoPoint, GeometryError> {
        let value = self
            .0
            .get(field)
            .ok_or_else(|| GeometryError::Missing(field.to_string()))?;
        GeoPoint::from_value(value)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Record(map)
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
