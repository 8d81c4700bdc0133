//! Dataset metadata from the BC Data Catalogue (CKAN API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use wfs_common::{ColumnDefinition, DatasetIdentifier, LoadError, LoadResult, TableDefinition};

/// Public CKAN API of the BC Data Catalogue.
pub const DEFAULT_CATALOGUE_URL: &str = "https://catalogue.data.gov.bc.ca/api/3";

/// Source of dataset names and column definitions.
#[async_trait]
pub trait Catalogue: Send + Sync {
    /// Map a catalogue package name or id to the WFS object name it publishes.
    async fn resolve_name(&self, name: &str) -> LoadResult<Option<String>>;

    /// Column definitions and description of a dataset.
    ///
    /// A dataset the catalogue knows but has no column details for yields an
    /// empty schema rather than an error.
    async fn table_definition(&self, dataset: &DatasetIdentifier) -> LoadResult<TableDefinition>;
}

#[derive(Debug, Deserialize)]
struct CkanResponse<T> {
    success: bool,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    results: Vec<Package>,
}

#[derive(Debug, Deserialize)]
struct Package {
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    #[serde(default)]
    object_name: Option<String>,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

/// CKAN client for catalogue.data.gov.bc.ca.
pub struct BcdcCatalogue {
    client: Client,
    base_url: String,
}

impl BcdcCatalogue {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> LoadResult<Self> {
        let base_url = base_url.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LoadError::upstream(base_url.clone(), None, e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET an action endpoint. `Ok(None)` on 404.
    async fn get_action(
        &self,
        action: &str,
        params: &[(&str, &str)],
    ) -> LoadResult<Option<String>> {
        let url = format!("{}/action/{}", self.base_url, action);
        let label = format!("catalogue {}", action);

        debug!(url = %url, ?params, "Querying catalogue");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| LoadError::upstream(&label, e.status().map(|s| s.as_u16()), e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LoadError::upstream(
                label,
                Some(status.as_u16()),
                format!("HTTP error: {}", status),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LoadError::upstream(&label, Some(status.as_u16()), e))?;
        Ok(Some(body))
    }
}

#[async_trait]
impl Catalogue for BcdcCatalogue {
    #[instrument(skip(self))]
    async fn resolve_name(&self, name: &str) -> LoadResult<Option<String>> {
        match self.get_action("package_show", &[("id", name)]).await? {
            Some(body) => parse_package_object_name(&body),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(dataset = %dataset))]
    async fn table_definition(&self, dataset: &DatasetIdentifier) -> LoadResult<TableDefinition> {
        let type_name = dataset.type_name();
        let query = format!("res_extras_object_name:{}", type_name);
        let body = self
            .get_action("package_search", &[("q", query.as_str())])
            .await?
            .ok_or_else(|| LoadError::UnknownDataset(type_name.clone()))?;

        let definition = parse_table_definition(&body, &type_name)?;
        info!(
            columns = definition.schema.len(),
            "Fetched table definition from catalogue"
        );
        Ok(definition)
    }
}

/// Object name published by a `package_show` result.
pub fn parse_package_object_name(body: &str) -> LoadResult<Option<String>> {
    let response: CkanResponse<Package> =
        serde_json::from_str(body).map_err(|e| LoadError::parse("catalogue package_show", e))?;
    if !response.success {
        return Ok(None);
    }

    Ok(response.result.and_then(|package| {
        package
            .resources
            .into_iter()
            .filter_map(|r| r.object_name)
            .map(|n| n.trim().to_uppercase())
            .find(|n| !n.is_empty())
    }))
}

/// Table definition for `type_name` from a `package_search` result.
pub fn parse_table_definition(body: &str, type_name: &str) -> LoadResult<TableDefinition> {
    let context = "catalogue package_search";
    let response: CkanResponse<SearchResult> =
        serde_json::from_str(body).map_err(|e| LoadError::parse(context, e))?;

    let packages = match response.result {
        Some(result) if response.success => result.results,
        _ => Vec::new(),
    };

    let mut found = false;
    for package in packages {
        for resource in &package.resources {
            let matches = resource
                .object_name
                .as_deref()
                .is_some_and(|n| n.trim().eq_ignore_ascii_case(type_name));
            if !matches {
                continue;
            }
            found = true;

            let schema = match &resource.details {
                Some(details) => parse_details(details, context)?,
                None => Vec::new(),
            };
            if !schema.is_empty() {
                return Ok(TableDefinition {
                    schema,
                    comments: package.notes.clone(),
                });
            }
        }
        if found {
            warn!(dataset = type_name, "Catalogue has no column details");
            return Ok(TableDefinition {
                schema: Vec::new(),
                comments: package.notes,
            });
        }
    }

    Err(LoadError::UnknownDataset(type_name.to_string()))
}

// `details` is a column list, sometimes serialized into a string.
fn parse_details(details: &serde_json::Value, context: &str) -> LoadResult<Vec<ColumnDefinition>> {
    match details {
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        serde_json::Value::String(s) => {
            serde_json::from_str(s).map_err(|e| LoadError::parse(context, e))
        }
        serde_json::Value::Array(_) => {
            serde_json::from_value(details.clone()).map_err(|e| LoadError::parse(context, e))
        }
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_from_package_show() {
        let body = r#"{
            "success": true,
            "result": {
                "notes": "Airports",
                "resources": [
                    {"name": "csv"},
                    {"name": "wms", "object_name": "whse_imagery_and_base_maps.gsr_airports_svw"}
                ]
            }
        }"#;
        assert_eq!(
            parse_package_object_name(body).unwrap(),
            Some("WHSE_IMAGERY_AND_BASE_MAPS.GSR_AIRPORTS_SVW".to_string())
        );
    }

    #[test]
    fn test_object_name_missing() {
        let body = r#"{"success": true, "result": {"resources": [{"name": "pdf"}]}}"#;
        assert_eq!(parse_package_object_name(body).unwrap(), None);

        let body = r#"{"success": false, "result": null}"#;
        assert_eq!(parse_package_object_name(body).unwrap(), None);
    }

    #[test]
    fn test_table_definition_string_details() {
        let body = r#"{
            "success": true,
            "result": {"count": 1, "results": [{
                "notes": "Points of interest",
                "resources": [{
                    "object_name": "WHSE_X.POI",
                    "details": "[{\"column_name\": \"POI_ID\", \"data_type\": \"NUMBER\", \"data_precision\": \"10\"}, {\"column_name\": \"SHAPE\", \"data_type\": \"SDO_GEOMETRY\"}]"
                }]
            }]}
        }"#;
        let definition = parse_table_definition(body, "WHSE_X.POI").unwrap();
        assert_eq!(definition.schema.len(), 2);
        assert_eq!(definition.schema[0].column_name, "POI_ID");
        assert_eq!(definition.schema[0].data_precision, Some(10));
        assert!(definition.schema[1].is_geometry());
        assert_eq!(definition.comments.as_deref(), Some("Points of interest"));
    }

    #[test]
    fn test_table_definition_array_details() {
        let body = r#"{
            "success": true,
            "result": {"results": [{
                "resources": [{
                    "object_name": "whse_x.poi",
                    "details": [{"column_name": "NAME", "data_type": "VARCHAR2", "data_precision": 50}]
                }]
            }]}
        }"#;
        let definition = parse_table_definition(body, "WHSE_X.POI").unwrap();
        assert_eq!(definition.schema[0].data_precision, Some(50));
        assert!(definition.comments.is_none());
    }

    #[test]
    fn test_table_definition_without_details_is_empty() {
        let body = r#"{
            "success": true,
            "result": {"results": [{"notes": "n", "resources": [{"object_name": "WHSE_X.POI"}]}]}
        }"#;
        let definition = parse_table_definition(body, "WHSE_X.POI").unwrap();
        assert!(definition.schema.is_empty());
    }

    #[test]
    fn test_table_definition_unknown() {
        let body = r#"{"success": true, "result": {"results": []}}"#;
        assert!(matches!(
            parse_table_definition(body, "WHSE_X.POI"),
            Err(LoadError::UnknownDataset(_))
        ));
    }
}
