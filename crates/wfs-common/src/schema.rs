//! Column and feature type metadata from the catalogue and the WFS.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// One source column as described by the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub column_name: String,
    pub data_type: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub data_precision: Option<u32>,
    #[serde(default)]
    pub column_comments: Option<String>,
}

impl ColumnDefinition {
    pub fn new(column_name: &str, data_type: &str) -> Self {
        Self {
            column_name: column_name.to_string(),
            data_type: data_type.to_string(),
            data_precision: None,
            column_comments: None,
        }
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.data_precision = Some(precision);
        self
    }

    /// Oracle spatial columns are replaced by the loader's own geometry column.
    pub fn is_geometry(&self) -> bool {
        self.data_type.eq_ignore_ascii_case("SDO_GEOMETRY")
    }
}

/// Catalogue description of a dataset.
///
/// An empty `schema` means the catalogue knows the dataset but has no column
/// details for it, which is distinct from a failed lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub schema: Vec<ColumnDefinition>,
    pub comments: Option<String>,
}

impl TableDefinition {
    pub fn has_column(&self, name: &str) -> bool {
        self.schema
            .iter()
            .any(|c| c.column_name.eq_ignore_ascii_case(name))
    }
}

/// Feature type schema reported by the WFS (DescribeFeatureType).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTypeSchema {
    /// Geometry property name, if the feature type has one.
    pub geometry_column: Option<String>,
    /// Local type of the geometry column, e.g. `Point` or `MultiPolygon`.
    #[serde(default)]
    pub geometry_type: Option<String>,
    /// Non-geometry property names in declared order.
    pub properties: Vec<String>,
    /// Local type of each non-geometry property, e.g. `decimal` or `string`.
    #[serde(default)]
    pub property_types: BTreeMap<String, String>,
}

impl FeatureTypeSchema {
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p.eq_ignore_ascii_case(name))
    }
}

// The catalogue reports precision as a number or a numeric string.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
