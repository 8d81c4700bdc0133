//! The seam between request planning/fetching and the actual WFS.

use async_trait::async_trait;

use wfs_common::{DatasetIdentifier, FeatureBatch, FeatureTypeSchema, LoadResult, RequestDescriptor};

/// Operations of a WFS used for bulk export.
#[async_trait]
pub trait FeatureService: Send + Sync {
    /// Names of all published feature types, namespace prefix removed.
    async fn list_feature_types(&self) -> LoadResult<Vec<String>>;

    /// Number of features matching an optional CQL filter.
    async fn hits(&self, dataset: &DatasetIdentifier, filter: Option<&str>) -> LoadResult<u64>;

    /// Geometry column and property order of a feature type.
    async fn describe(&self, dataset: &DatasetIdentifier) -> LoadResult<FeatureTypeSchema>;

    /// Execute one GetFeature request.
    async fn get_features(&self, request: &RequestDescriptor) -> LoadResult<FeatureBatch>;
}
