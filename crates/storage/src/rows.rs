//! Rows handed to the store.

use std::fmt;

use geojson::Geometry;
use serde_json::{Map, Value};

use crate::ddl::GEOMETRY_COLUMN;

/// A lowercase `schema.table` storage name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    pub schema: String,
    pub table: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into().to_lowercase(),
            table: table.into().to_lowercase(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// One feature ready for insertion: column values keyed by lowercase column
/// name, plus its (already multi-part) geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    pub properties: Map<String, Value>,
    pub geometry: Option<Geometry>,
}

impl FeatureRow {
    pub fn new(properties: Map<String, Value>, geometry: Option<Geometry>) -> Self {
        Self {
            properties,
            geometry,
        }
    }

    pub fn has_geometry(&self) -> bool {
        self.geometry.is_some()
    }

    /// JSON object of the row with the geometry under the `geom` key.
    pub fn to_json(&self) -> Value {
        let mut object = self.properties.clone();
        if let Some(geometry) = &self.geometry {
            object.insert(
                GEOMETRY_COLUMN.to_string(),
                Value::Object(geojson::JsonObject::from(geometry)),
            );
        }
        Value::Object(object)
    }
}
