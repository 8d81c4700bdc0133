//! Geometry type detection for new tables.
//!
//! The WFS does not report a reliable geometry type, so a small sample of
//! features is fetched and inspected instead.

use std::collections::BTreeSet;
use std::sync::Arc;

use geojson::Feature;
use tracing::{debug, info, warn};

use wfs_client::{FeatureService, RequestPlan};
use wfs_common::{
    value_has_z, GeometryKind, GeometryShape, LoadError, LoadResult, Pagination, RequestDescriptor,
};

/// Features inspected per probe.
pub const DEFAULT_SAMPLE_SIZE: u64 = 10;

/// Samples a planned dataset to find its geometry shape.
pub struct GeometryTypeResolver {
    service: Arc<dyn FeatureService>,
    sample_size: u64,
}

impl GeometryTypeResolver {
    pub fn new(service: Arc<dyn FeatureService>) -> Self {
        Self {
            service,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }

    pub fn with_sample_size(mut self, sample_size: u64) -> Self {
        self.sample_size = sample_size.max(1);
        self
    }

    /// Shape of the first non-null geometry in the sample.
    ///
    /// The head of the dataset is probed first. If it holds no geometries
    /// and the dataset is larger than one sample, the tail is probed as
    /// well. This is a heuristic: a dataset whose geometries all sit in the
    /// middle is reported as `UnknownGeometryShape`.
    pub async fn resolve(&self, plan: &RequestPlan) -> LoadResult<GeometryShape> {
        let dataset = plan.dataset.to_string();
        let first = plan
            .requests
            .first()
            .ok_or_else(|| LoadError::UnknownGeometryShape(dataset.clone()))?;

        let head = self.probe(first, self.head_window(first)).await?;
        if let Some(shape) = shape_of_features(&dataset, &head)? {
            info!(dataset = %dataset, shape = %shape, "Resolved geometry type");
            return Ok(shape);
        }

        if plan.effective_count > self.sample_size {
            debug!(dataset = %dataset, "No geometries at head of dataset, probing tail");
            let tail = self
                .probe(first, self.tail_window(plan.effective_count))
                .await?;
            if let Some(shape) = shape_of_features(&dataset, &tail)? {
                info!(dataset = %dataset, shape = %shape, "Resolved geometry type from tail");
                return Ok(shape);
            }
        }

        Err(LoadError::UnknownGeometryShape(dataset))
    }

    fn head_window(&self, first: &RequestDescriptor) -> Pagination {
        match first.pagination {
            Pagination::Limit { count } => Pagination::Limit {
                count: count.min(self.sample_size),
            },
            Pagination::Window { start_index, count } => Pagination::Window {
                start_index,
                count: count.min(self.sample_size),
            },
        }
    }

    fn tail_window(&self, effective_count: u64) -> Pagination {
        let count = self.sample_size.min(effective_count);
        Pagination::Window {
            start_index: effective_count - count,
            count,
        }
    }

    async fn probe(
        &self,
        template: &RequestDescriptor,
        pagination: Pagination,
    ) -> LoadResult<Vec<Feature>> {
        let request = template.with_pagination(pagination);
        Ok(self.service.get_features(&request).await?.features)
    }
}

/// Shape of a feature sample, or `None` when no feature has a geometry.
///
/// The base type is taken from the first geometry. The Z flag is set if any
/// geometry in the sample has a third coordinate.
pub fn shape_of_features(dataset: &str, features: &[Feature]) -> LoadResult<Option<GeometryShape>> {
    let mut kinds = BTreeSet::new();
    let mut first = None;
    let mut has_z = false;

    for geometry in features.iter().filter_map(|f| f.geometry.as_ref()) {
        // Only collections have no kind.
        let kind = GeometryKind::of_value(&geometry.value).ok_or_else(|| {
            LoadError::UnsupportedGeometryType {
                dataset: dataset.to_string(),
                geometry_type: "GeometryCollection".to_string(),
            }
        })?;
        first.get_or_insert(kind);
        kinds.insert(kind.as_str());
        has_z |= value_has_z(&geometry.value);
    }

    if kinds.len() > 1 {
        let types: Vec<&str> = kinds.into_iter().collect();
        warn!(dataset, types = %types.join(","), "Dataset has multiple geometry types");
    }

    Ok(first.map(|kind| GeometryShape::new(kind, has_z)))
}
