use std::fmt::{Display, Formatter};

use crate::record::POS_FIELD;

/// Index type with spherical geometry semantics.
pub const SPHERE_2D: &str = "2dsphere";

/// Declares a spatial index on one geometry field of the reference collection.
///
/// Creating the same descriptor twice is a no-op for every store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpatialIndex {
    field: String,
    index_type: String,
}

impl SpatialIndex {
    pub fn new(field: &str) -> SpatialIndex {
        SpatialIndex {
            field: field.to_string(),
            index_type: SPHERE_2D.to_string(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn index_type(&self) -> &str {
        &self.index_type
    }

    /// Index name following the `<field>_<type>` convention of the store.
    pub fn name(&self) -> String {
        format!("{}_{}", self.field, self.index_type)
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        SpatialIndex::new(POS_FIELD)
    }
}

impl Display for SpatialIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{'{}': \"{}\"}}", self.field, self.index_type)
    }
}
