//! Immutable descriptions of single WFS GetFeature requests.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bbox::BoundingBox;
use crate::crs::Crs;
use crate::dataset::DatasetIdentifier;

/// Which slice of the result set a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pagination {
    /// The whole (possibly truncated) result fits one page.
    Limit { count: u64 },
    /// One page of a sorted, paged result set.
    Window { start_index: u64, count: u64 },
}

impl Pagination {
    pub fn count(&self) -> u64 {
        match self {
            Pagination::Limit { count } | Pagination::Window { count, .. } => *count,
        }
    }

    pub fn start_index(&self) -> u64 {
        match self {
            Pagination::Limit { .. } => 0,
            Pagination::Window { start_index, .. } => *start_index,
        }
    }
}

/// A bounding box predicate against a dataset's geometry column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialFilter {
    pub bbox: BoundingBox,
    pub crs: Crs,
    pub geometry_column: String,
}

impl SpatialFilter {
    /// CQL form, e.g. `BBOX(SHAPE, 1, 2, 3, 4, 'EPSG:3005')`.
    pub fn to_cql(&self) -> String {
        format!("BBOX({}, {}, '{}')", self.geometry_column, self.bbox, self.crs)
    }
}

/// Combine a free-form CQL filter and a bounding box with `AND`.
///
/// Bounds are always expressed as CQL rather than the WFS `bbox` parameter,
/// which GeoServer does not allow alongside `CQL_FILTER`.
pub fn merge_filters(filter: Option<&str>, bounds: Option<&SpatialFilter>) -> Option<String> {
    match (filter, bounds) {
        (Some(filter), Some(bounds)) => Some(format!("{} AND {}", filter, bounds.to_cql())),
        (None, Some(bounds)) => Some(bounds.to_cql()),
        (Some(filter), None) => Some(filter.to_string()),
        (None, None) => None,
    }
}

/// One GetFeature request against the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub dataset: DatasetIdentifier,
    pub filter: Option<String>,
    pub bounds: Option<SpatialFilter>,
    pub sort_by: Option<String>,
    pub srs_name: Crs,
    pub pagination: Pagination,
}

impl RequestDescriptor {
    /// The `CQL_FILTER` value sent with this request.
    pub fn cql_filter(&self) -> Option<String> {
        merge_filters(self.filter.as_deref(), self.bounds.as_ref())
    }

    /// Same request with a different window.
    pub fn with_pagination(&self, pagination: Pagination) -> Self {
        Self {
            pagination,
            ..self.clone()
        }
    }

    /// WFS 2.0.0 key-value pairs, in a stable order.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("service", "WFS".to_string()),
            ("version", "2.0.0".to_string()),
            ("request", "GetFeature".to_string()),
            ("typeName", self.dataset.type_name()),
            ("outputFormat", "json".to_string()),
            ("SRSNAME", self.srs_name.to_string()),
        ];
        if let Some(sort_by) = &self.sort_by {
            params.push(("sortby", sort_by.to_uppercase()));
        }
        if let Some(cql) = self.cql_filter() {
            params.push(("CQL_FILTER", cql));
        }
        params.push(("count", self.pagination.count().to_string()));
        if let Pagination::Window { start_index, .. } = self.pagination {
            params.push(("startIndex", start_index.to_string()));
        }
        params
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pagination {
            Pagination::Limit { count } => write!(f, "{} count={}", self.dataset, count)?,
            Pagination::Window { start_index, count } => write!(
                f,
                "{} startIndex={} count={}",
                self.dataset, start_index, count
            )?,
        }
        if let Some(cql) = self.cql_filter() {
            write!(f, " CQL_FILTER={cql}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::DEFAULT_OUTPUT_CRS;

    fn descriptor(pagination: Pagination) -> RequestDescriptor {
        RequestDescriptor {
            dataset: DatasetIdentifier::parse("whse_x.airports").unwrap(),
            filter: None,
            bounds: None,
            sort_by: None,
            srs_name: DEFAULT_OUTPUT_CRS,
            pagination,
        }
    }

    #[test]
    fn test_limit_params_have_no_start_index() {
        let params = descriptor(Pagination::Limit { count: 42 }).query_params();
        assert!(params.contains(&("typeName", "WHSE_X.AIRPORTS".to_string())));
        assert!(params.contains(&("count", "42".to_string())));
        assert!(params.iter().all(|(k, _)| *k != "startIndex"));
    }

    #[test]
    fn test_window_params() {
        let mut d = descriptor(Pagination::Window {
            start_index: 10000,
            count: 500,
        });
        d.sort_by = Some("objectid".to_string());
        let params = d.query_params();
        assert!(params.contains(&("sortby", "OBJECTID".to_string())));
        assert!(params.contains(&("startIndex", "10000".to_string())));
        assert!(params.contains(&("count", "500".to_string())));
        assert!(params.contains(&("SRSNAME", "EPSG:3005".to_string())));
    }

    #[test]
    fn test_filter_merging() {
        let bounds = SpatialFilter {
            bbox: BoundingBox::new(1.0, 2.0, 3.0, 4.0),
            crs: Crs::epsg(3005),
            geometry_column: "SHAPE".to_string(),
        };
        assert_eq!(merge_filters(Some("A = 1"), None).as_deref(), Some("A = 1"));
        assert_eq!(
            merge_filters(None, Some(&bounds)).as_deref(),
            Some("BBOX(SHAPE, 1, 2, 3, 4, 'EPSG:3005')")
        );
        assert_eq!(
            merge_filters(Some("A = 1"), Some(&bounds)).as_deref(),
            Some("A = 1 AND BBOX(SHAPE, 1, 2, 3, 4, 'EPSG:3005')")
        );
        assert_eq!(merge_filters(None, None), None);
    }

    #[test]
    fn test_display_names_window() {
        let d = descriptor(Pagination::Window {
            start_index: 20000,
            count: 5000,
        });
        assert_eq!(d.to_string(), "WHSE_X.AIRPORTS startIndex=20000 count=5000");
    }
}
