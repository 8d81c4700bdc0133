//! Validated `SCHEMA.TABLE` dataset names.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LoadError, LoadResult};

/// A WFS dataset name such as `WHSE_BASEMAPPING.GNS_GEOGRAPHICAL_NAMES_SP`.
///
/// Held in uppercase, which is what WFS requests use. Storage identifiers
/// come from [`storage_schema`](Self::storage_schema) and
/// [`storage_table`](Self::storage_table), which are lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetIdentifier {
    schema: String,
    table: String,
}

impl DatasetIdentifier {
    /// Parse a case-insensitive `schema.table` name.
    pub fn parse(name: &str) -> LoadResult<Self> {
        let trimmed = name.trim();
        let mut parts = trimmed.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(schema), Some(table), None) if is_identifier(schema) && is_identifier(table) => {
                Ok(Self {
                    schema: schema.to_uppercase(),
                    table: table.to_uppercase(),
                })
            }
            _ => Err(LoadError::InvalidDatasetName(name.to_string())),
        }
    }

    /// Name used as the WFS `typeName`.
    pub fn type_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    pub fn storage_schema(&self) -> String {
        self.schema.to_lowercase()
    }

    pub fn storage_table(&self) -> String {
        self.table.to_lowercase()
    }
}

fn is_identifier(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for DatasetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_conventions() {
        let id = DatasetIdentifier::parse("whse_imagery_and_base_maps.gsr_airports_svw").unwrap();
        assert_eq!(id.type_name(), "WHSE_IMAGERY_AND_BASE_MAPS.GSR_AIRPORTS_SVW");
        assert_eq!(id.storage_schema(), "whse_imagery_and_base_maps");
        assert_eq!(id.storage_table(), "gsr_airports_svw");
    }

    #[test]
    fn test_rejects_malformed_names() {
        for name in ["bc-airports", "a.b.c", ".table", "schema.", "sch ema.t"] {
            assert!(
                matches!(
                    DatasetIdentifier::parse(name),
                    Err(LoadError::InvalidDatasetName(_))
                ),
                "{name} should be rejected"
            );
        }
    }
}
