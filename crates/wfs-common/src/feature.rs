//! Batches of features returned by one GetFeature request.

use geojson::Feature;

use crate::request::RequestDescriptor;

/// Features from a single request, in response order.
#[derive(Debug, Clone)]
pub struct FeatureBatch {
    pub request: RequestDescriptor,
    pub features: Vec<Feature>,
}

impl FeatureBatch {
    pub fn new(request: RequestDescriptor, features: Vec<Feature>) -> Self {
        Self { request, features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Number of features that carry a geometry.
    pub fn with_geometry(&self) -> usize {
        self.features.iter().filter(|f| f.geometry.is_some()).count()
    }
}
