//! Turns a dataset and query options into an ordered set of GetFeature
//! requests that jointly cover the matching features exactly once.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use wfs_common::{
    merge_filters, BoundingBox, Crs, DatasetIdentifier, FeatureTypeSchema, LoadError, LoadResult,
    Pagination, RequestDescriptor, SpatialFilter,
};

use crate::names::DatasetResolver;
use crate::service::FeatureService;

/// Default number of features per request.
pub const DEFAULT_PAGE_SIZE: u64 = 10_000;

/// Query options for a plan.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// CQL filter passed through verbatim
    pub filter: Option<String>,
    /// Bounding box and the CRS its coordinates are in
    pub bounds: Option<(BoundingBox, Crs)>,
    /// Sort key; auto-selected when paging and absent
    pub sort_by: Option<String>,
    /// Features per request, must be positive
    pub page_size: u64,
    /// Upper limit on features returned; `Some(0)` means no limit
    pub max_count: Option<u64>,
    /// CRS features are returned in
    pub srs_name: Crs,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            filter: None,
            bounds: None,
            sort_by: None,
            page_size: DEFAULT_PAGE_SIZE,
            max_count: None,
            srs_name: Crs::epsg(4326),
        }
    }
}

/// Result of planning a dataset download.
#[derive(Debug, Clone)]
pub struct RequestPlan {
    pub dataset: DatasetIdentifier,
    /// Features matching the filter on the server
    pub total_count: u64,
    /// Features the requests will return, after `max_count`
    pub effective_count: u64,
    /// Sort key sent with every request, uppercased
    pub sort_by: Option<String>,
    pub schema: FeatureTypeSchema,
    /// Requests in window order
    pub requests: Vec<RequestDescriptor>,
}

impl RequestPlan {
    pub fn chunk_count(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Pagination windows covering `[0, total)` in pages of `page_size`.
///
/// Returns no windows for an empty result, a single `Limit` when everything
/// fits one page, and contiguous `Window`s otherwise.
pub fn chunk_windows(total: u64, page_size: u64) -> Vec<Pagination> {
    if total == 0 || page_size == 0 {
        return Vec::new();
    }

    let chunks = total.div_ceil(page_size);
    if chunks == 1 {
        return vec![Pagination::Limit { count: total }];
    }

    (0..chunks)
        .map(|i| {
            let start_index = i * page_size;
            Pagination::Window {
                start_index,
                count: page_size.min(total - start_index),
            }
        })
        .collect()
}

/// Pick a column to sort paged requests by.
///
/// OBJECTID when present, then SEQUENCE_ID, otherwise the first property.
pub fn select_sort_key(properties: &[String]) -> Option<String> {
    ["OBJECTID", "SEQUENCE_ID"]
        .iter()
        .find_map(|key| {
            properties
                .iter()
                .find(|p| p.eq_ignore_ascii_case(key))
                .map(|p| p.to_uppercase())
        })
        .or_else(|| properties.first().map(|p| p.to_uppercase()))
}

/// Builds request plans against a feature service.
pub struct RequestPlanner {
    service: Arc<dyn FeatureService>,
}

impl RequestPlanner {
    pub fn new(service: Arc<dyn FeatureService>) -> Self {
        Self { service }
    }

    /// Resolve `name` and plan it.
    pub async fn plan_dataset(
        &self,
        resolver: &DatasetResolver,
        name: &str,
        options: &PlanOptions,
    ) -> LoadResult<RequestPlan> {
        let dataset = resolver.resolve(name).await?;
        self.plan(&dataset, options).await
    }

    /// Plan requests for an already resolved dataset.
    #[instrument(skip(self, options), fields(dataset = %dataset, page_size = options.page_size))]
    pub async fn plan(
        &self,
        dataset: &DatasetIdentifier,
        options: &PlanOptions,
    ) -> LoadResult<RequestPlan> {
        if options.page_size == 0 {
            return Err(LoadError::invalid_parameter(
                "page_size",
                "page size must be greater than zero",
            ));
        }

        let schema = self.service.describe(dataset).await?;

        let bounds = match &options.bounds {
            Some((bbox, crs)) => {
                let geometry_column = schema.geometry_column.clone().ok_or_else(|| {
                    LoadError::invalid_parameter(
                        "bounds",
                        format!("{} has no geometry column to filter on", dataset),
                    )
                })?;
                Some(SpatialFilter {
                    bbox: *bbox,
                    crs: *crs,
                    geometry_column,
                })
            }
            None => None,
        };

        let merged = merge_filters(options.filter.as_deref(), bounds.as_ref());
        let total_count = self.service.hits(dataset, merged.as_deref()).await?;
        let effective_count = match options.max_count {
            Some(max) if max > 0 => max.min(total_count),
            _ => total_count,
        };

        let windows = chunk_windows(effective_count, options.page_size);
        let sort_by = match &options.sort_by {
            Some(key) => Some(key.to_uppercase()),
            None if windows.len() > 1 => {
                let key = select_sort_key(&schema.properties);
                debug!(sort_by = ?key, "Selected sort key for paged requests");
                key
            }
            None => None,
        };

        let requests: Vec<RequestDescriptor> = windows
            .into_iter()
            .map(|pagination| RequestDescriptor {
                dataset: dataset.clone(),
                filter: options.filter.clone(),
                bounds: bounds.clone(),
                sort_by: sort_by.clone(),
                srs_name: options.srs_name,
                pagination,
            })
            .collect();

        info!(
            total_count,
            effective_count,
            chunks = requests.len(),
            "Planned requests"
        );

        Ok(RequestPlan {
            dataset: dataset.clone(),
            total_count,
            effective_count,
            sort_by,
            schema,
            requests,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_chunk_windows_three_pages() {
        let windows = chunk_windows(25_000, 10_000);
        assert_eq!(
            windows,
            vec![
                Pagination::Window { start_index: 0, count: 10_000 },
                Pagination::Window { start_index: 10_000, count: 10_000 },
                Pagination::Window { start_index: 20_000, count: 5_000 },
            ]
        );
    }

    #[test]
    fn test_chunk_windows_single_page_is_limit() {
        assert_eq!(chunk_windows(1, 10_000), vec![Pagination::Limit { count: 1 }]);
        assert_eq!(
            chunk_windows(10_000, 10_000),
            vec![Pagination::Limit { count: 10_000 }]
        );
    }

    #[test]
    fn test_chunk_windows_empty() {
        assert!(chunk_windows(0, 10_000).is_empty());
        assert!(chunk_windows(100, 0).is_empty());
    }

    #[test]
    fn test_chunk_windows_partition() {
        for total in [2u64, 7, 99, 100, 101, 1_000, 12_345] {
            for page_size in [1u64, 3, 10, 100, 999] {
                let windows = chunk_windows(total, page_size);
                assert_eq!(windows.len() as u64, total.div_ceil(page_size));

                if windows.len() == 1 {
                    assert_eq!(windows[0], Pagination::Limit { count: total });
                    continue;
                }

                let mut next = 0;
                for window in &windows {
                    assert!(matches!(window, Pagination::Window { .. }));
                    assert_eq!(window.start_index(), next);
                    assert!(window.count() > 0 && window.count() <= page_size);
                    next += window.count();
                }
                assert_eq!(next, total, "total={} page_size={}", total, page_size);
            }
        }
    }

    #[test]
    fn test_select_sort_key() {
        assert_eq!(
            select_sort_key(&props(&["NAME", "OBJECTID"])),
            Some("OBJECTID".to_string())
        );
        assert_eq!(
            select_sort_key(&props(&["SEQUENCE_ID", "NAME"])),
            Some("SEQUENCE_ID".to_string())
        );
        assert_eq!(
            select_sort_key(&props(&["FEATURE_ID", "NAME"])),
            Some("FEATURE_ID".to_string())
        );
        assert_eq!(select_sort_key(&[]), None);
    }

    #[test]
    fn test_default_options() {
        let options = PlanOptions::default();
        assert_eq!(options.page_size, DEFAULT_PAGE_SIZE);
        assert!(options.srs_name.is_wgs84());
    }
}
