use mongodb::bson::{self, doc, Bson, Document};
use mongodb::error::ErrorKind as MongoErrorKind;
use mongodb::options::IndexOptions;
use mongodb::IndexModel;
use parks::errors::{ErrorKind, ParksError};
use parks::record::{Record, ID_FIELD};
use parks::spatial::{SpatialIndex, WithinBox};
use serde_json::{Map, Value};
use thiserror::Error;

/// Server error code for operations on a namespace that does not exist.
pub(crate) const NAMESPACE_NOT_FOUND: i32 = 26;

/// Error type for translating between records and BSON documents.
#[derive(Error, Debug, Clone)]
pub enum MongoAdapterError {
    #[error("MongoDB error: {0}")]
    Driver(#[from] mongodb::error::Error),

    #[error("cannot encode record as BSON: {0}")]
    Serialization(String),

    #[error("cannot decode BSON document: {0}")]
    Deserialization(String),
}

impl From<MongoAdapterError> for ParksError {
    fn from(err: MongoAdapterError) -> Self {
        match err {
            MongoAdapterError::Driver(e) => to_parks_error(&e, ErrorKind::QueryError),
            other => ParksError::new(&other.to_string(), ErrorKind::QueryError),
        }
    }
}

pub(crate) type MongoAdapterResult<T> = Result<T, MongoAdapterError>;

/// Converts a driver error to a `ParksError`.
///
/// Failures to reach or authenticate against the deployment always map to
/// `ConnectionError`; everything else gets `fallback`.
pub(crate) fn to_parks_error(error: &mongodb::error::Error, fallback: ErrorKind) -> ParksError {
    let kind = if is_connection_failure(error) {
        ErrorKind::ConnectionError
    } else {
        fallback
    };
    ParksError::new(&format!("MongoDB error: {}", error), kind)
}

pub(crate) fn is_connection_failure(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        MongoErrorKind::ServerSelection { .. }
            | MongoErrorKind::Authentication { .. }
            | MongoErrorKind::DnsResolve { .. }
            | MongoErrorKind::ConnectionPoolCleared { .. }
            | MongoErrorKind::Io(_)
    )
}

pub(crate) fn is_namespace_not_found(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        MongoErrorKind::Command(command) if command.code == NAMESPACE_NOT_FOUND
    )
}

pub(crate) fn record_to_document(record: &Record) -> MongoAdapterResult<Document> {
    bson::to_document(record).map_err(|e| MongoAdapterError::Serialization(e.to_string()))
}

/// Converts a stored document to a record.
///
/// Values are rendered as relaxed extended JSON, except an `ObjectId` in
/// `_id`, which becomes its hex string.
pub(crate) fn document_to_record(document: Document) -> MongoAdapterResult<Record> {
    let mut map = Map::with_capacity(document.len());
    for (key, value) in document {
        let value = match value {
            Bson::ObjectId(oid) if key == ID_FIELD => Value::String(oid.to_hex()),
            other => other.into_relaxed_extjson(),
        };
        map.insert(key, value);
    }
    if map.is_empty() {
        return Err(MongoAdapterError::Deserialization(
            "document has no fields".to_string(),
        ));
    }
    Ok(Record::from(map))
}

/// `{ <field>: { "$geoWithin": { "$box": [[lon1, lat1], [lon2, lat2]] } } }`
pub(crate) fn within_box_document(filter: &WithinBox) -> Document {
    let [[lon1, lat1], [lon2, lat2]] = filter.corners();
    let mut document = Document::new();
    document.insert(
        filter.field(),
        doc! { "$geoWithin": { "$box": [[lon1, lat1], [lon2, lat2]] } },
    );
    document
}

pub(crate) fn index_model(index: &SpatialIndex) -> IndexModel {
    let mut keys = Document::new();
    keys.insert(index.field(), index.index_type());
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().name(index.name()).build())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;
    use serde_json::json;

    #[test]
    fn test_within_box_document() {
        let filter = WithinBox::on_pos([-120.0, 40.0], [-110.5, 30.0]);
        let document = within_box_document(&filter);
        assert_eq!(
            document,
            doc! { "pos": { "$geoWithin": { "$box": [[-120.0, 40.0], [-110.5, 30.0]] } } }
        );
    }

    #[test]
    fn test_within_box_keeps_corner_order() {
        let filter = WithinBox::on_pos([10.0, 10.0], [0.0, 0.0]);
        let document = within_box_document(&filter);
        let corners = document
            .get_document("pos")
            .and_then(|d| d.get_document("$geoWithin"))
            .and_then(|d| d.get_array("$box"))
            .unwrap();
        assert_eq!(corners[0], bson::bson!([10.0, 10.0]));
    }

    #[test]
    fn test_index_model() {
        let model = index_model(&SpatialIndex::default());
        assert_eq!(model.keys, doc! { "pos": "2dsphere" });
        let name = model.options.and_then(|o| o.name);
        assert_eq!(name, Some("pos_2dsphere".to_string()));
    }

    #[test]
    fn test_record_to_document() {
        let record = Record::from_value(json!({"name": "Zion", "pos": [-113.0263, 37.2982]})).unwrap();
        let document = record_to_document(&record).unwrap();
        assert_eq!(document.get_str("name").unwrap(), "Zion");
        assert_eq!(document.get_array("pos").unwrap().len(), 2);
    }

    #[test]
    fn test_document_to_record_flattens_object_id() {
        let oid = ObjectId::new();
        let document = doc! { "_id": oid, "name": "Zion", "pos": [-113.0263, 37.2982], "visits": 12 };
        let record = document_to_record(document).unwrap();
        assert_eq!(record.id(), Some(oid.to_hex()));
        assert_eq!(record.get("name"), Some(&json!("Zion")));
        assert_eq!(record.get("visits"), Some(&json!(12)));
        assert!(record.pos().is_ok());
    }

    #[test]
    fn test_document_to_record_rejects_empty_document() {
        assert!(document_to_record(Document::new()).is_err());
    }

    #[test]
    fn test_adapter_error_maps_to_query_error() {
        let err: ParksError = MongoAdapterError::Serialization("bad".to_string()).into();
        assert_eq!(err.kind(), &ErrorKind::QueryError);
        assert!(err.message().contains("bad"));
    }
}
