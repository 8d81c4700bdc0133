//! In-memory collaborators for exercising the planner, fetcher and loader
//! without a network or database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geojson::Feature;

use storage::{FeatureRow, FeatureStore, TableName, TableSpec};
use wfs_client::{Catalogue, FeatureService};
use wfs_common::{
    DatasetIdentifier, FeatureBatch, FeatureTypeSchema, LoadError, LoadResult, RequestDescriptor,
    TableDefinition,
};

// ============================================================================
// Feature service
// ============================================================================

#[derive(Debug, Clone)]
struct MockDataset {
    schema: FeatureTypeSchema,
    features: Vec<Feature>,
}

/// A WFS serving fixed feature lists.
///
/// Filters are recorded but not applied. `get_features` slices the dataset
/// by the request window, so paged plans see each feature once.
#[derive(Default)]
pub struct MockFeatureService {
    datasets: HashMap<String, MockDataset>,
    extra_types: Vec<String>,
    fail_from: Option<u64>,
    fail_hits: Option<u16>,
    list_calls: AtomicUsize,
    hits_calls: AtomicUsize,
    describe_calls: AtomicUsize,
    hits_filters: Mutex<Vec<Option<String>>>,
    feature_requests: Mutex<Vec<RequestDescriptor>>,
}

impl MockFeatureService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `features` under `type_name`.
    pub fn with_dataset(
        mut self,
        type_name: &str,
        schema: FeatureTypeSchema,
        features: Vec<Feature>,
    ) -> Self {
        self.datasets.insert(
            type_name.to_uppercase(),
            MockDataset { schema, features },
        );
        self
    }

    /// Advertise a feature type with no data.
    pub fn with_feature_type(mut self, type_name: &str) -> Self {
        self.extra_types.push(type_name.to_uppercase());
        self
    }

    /// Fail every GetFeature request starting at or after `start_index`
    /// with an HTTP 500.
    pub fn failing_from(mut self, start_index: u64) -> Self {
        self.fail_from = Some(start_index);
        self
    }

    /// Fail every hits request with HTTP `status`.
    pub fn failing_hits(mut self, status: u16) -> Self {
        self.fail_hits = Some(status);
        self
    }

    /// Total number of calls of any kind.
    pub fn request_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
            + self.hits_calls.load(Ordering::SeqCst)
            + self.describe_calls.load(Ordering::SeqCst)
            + self.feature_requests().len()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn hits_calls(&self) -> usize {
        self.hits_calls.load(Ordering::SeqCst)
    }

    /// Filters sent with hits requests, in call order.
    pub fn hits_filters(&self) -> Vec<Option<String>> {
        self.hits_filters.lock().unwrap().clone()
    }

    /// GetFeature requests received, in call order.
    pub fn feature_requests(&self) -> Vec<RequestDescriptor> {
        self.feature_requests.lock().unwrap().clone()
    }

    fn dataset(&self, dataset: &DatasetIdentifier) -> LoadResult<&MockDataset> {
        self.datasets
            .get(&dataset.type_name())
            .ok_or_else(|| LoadError::upstream(dataset.to_string(), Some(400), "unknown typeName"))
    }
}

#[async_trait]
impl FeatureService for MockFeatureService {
    async fn list_feature_types(&self) -> LoadResult<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .datasets
            .keys()
            .chain(self.extra_types.iter())
            .map(|n| format!("pub:{}", n))
            .collect())
    }

    async fn hits(&self, dataset: &DatasetIdentifier, filter: Option<&str>) -> LoadResult<u64> {
        self.hits_calls.fetch_add(1, Ordering::SeqCst);
        self.hits_filters
            .lock()
            .unwrap()
            .push(filter.map(str::to_string));
        if let Some(status) = self.fail_hits {
            return Err(LoadError::upstream(
                format!("{} resultType=hits", dataset),
                Some(status),
                format!("HTTP error: {}", status),
            ));
        }
        Ok(self.dataset(dataset)?.features.len() as u64)
    }

    async fn describe(&self, dataset: &DatasetIdentifier) -> LoadResult<FeatureTypeSchema> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.dataset(dataset)?.schema.clone())
    }

    async fn get_features(&self, request: &RequestDescriptor) -> LoadResult<FeatureBatch> {
        self.feature_requests.lock().unwrap().push(request.clone());

        let start = request.pagination.start_index();
        if self.fail_from.is_some_and(|from| start >= from) {
            return Err(LoadError::upstream(
                request.to_string(),
                Some(500),
                "HTTP error: 500 Internal Server Error",
            ));
        }

        let features = &self.dataset(&request.dataset)?.features;
        let start = (start as usize).min(features.len());
        let end = (start + request.pagination.count() as usize).min(features.len());

        // Let concurrent requests interleave.
        tokio::task::yield_now().await;

        Ok(FeatureBatch::new(
            request.clone(),
            features[start..end].to_vec(),
        ))
    }
}

// ============================================================================
// Catalogue
// ============================================================================

/// A catalogue backed by fixed maps.
#[derive(Debug, Default)]
pub struct StaticCatalogue {
    names: HashMap<String, String>,
    definitions: HashMap<String, TableDefinition>,
}

impl StaticCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a package name to the object name it publishes.
    pub fn with_package(mut self, package: &str, object_name: &str) -> Self {
        self.names
            .insert(package.to_lowercase(), object_name.to_uppercase());
        self
    }

    pub fn with_definition(mut self, type_name: &str, definition: TableDefinition) -> Self {
        self.definitions
            .insert(type_name.to_uppercase(), definition);
        self
    }
}

#[async_trait]
impl Catalogue for StaticCatalogue {
    async fn resolve_name(&self, name: &str) -> LoadResult<Option<String>> {
        Ok(self.names.get(&name.to_lowercase()).cloned())
    }

    async fn table_definition(&self, dataset: &DatasetIdentifier) -> LoadResult<TableDefinition> {
        self.definitions
            .get(&dataset.type_name())
            .cloned()
            .ok_or_else(|| LoadError::UnknownDataset(dataset.type_name()))
    }
}

// ============================================================================
// Feature store
// ============================================================================

/// Contents of one in-memory table.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    pub columns: Vec<String>,
    pub spec: Option<TableSpec>,
    pub rows: Vec<FeatureRow>,
}

/// A store holding tables in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<TableName, MemoryTable>>,
    log: Mutex<HashMap<String, DateTime<Utc>>>,
    creates: AtomicUsize,
    appends: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create a table with the given columns.
    pub fn with_table(self, table: TableName, columns: &[&str]) -> Self {
        self.tables.lock().unwrap().insert(
            table,
            MemoryTable {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                ..MemoryTable::default()
            },
        );
        self
    }

    pub fn table(&self, table: &TableName) -> Option<MemoryTable> {
        self.tables.lock().unwrap().get(table).cloned()
    }

    pub fn rows(&self, table: &TableName) -> Vec<FeatureRow> {
        self.table(table).map(|t| t.rows).unwrap_or_default()
    }

    pub fn load_log(&self) -> HashMap<String, DateTime<Utc>> {
        self.log.lock().unwrap().clone()
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn append_count(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeatureStore for MemoryStore {
    async fn table_exists(&self, table: &TableName) -> LoadResult<bool> {
        Ok(self.tables.lock().unwrap().contains_key(table))
    }

    async fn list_columns(&self, table: &TableName) -> LoadResult<Vec<String>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn create_table(&self, spec: &TableSpec) -> LoadResult<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.tables.lock().unwrap().insert(
            spec.name.clone(),
            MemoryTable {
                columns: spec.column_names(),
                spec: Some(spec.clone()),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn append_rows(
        &self,
        table: &TableName,
        rows: &[FeatureRow],
        has_geometry: bool,
    ) -> LoadResult<u64> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.lock().unwrap();
        let target = tables.get_mut(table).ok_or_else(|| {
            LoadError::database(table.to_string(), "relation does not exist")
        })?;

        if has_geometry && rows.iter().any(|r| !r.has_geometry()) {
            return Err(LoadError::database(
                table.to_string(),
                "spatial insert given a row without geometry",
            ));
        }

        for row in rows {
            let mut stored = row.clone();
            stored.properties.retain(|k, _| target.columns.contains(k));
            if !has_geometry {
                stored.geometry = None;
            }
            target.rows.push(stored);
        }
        Ok(rows.len() as u64)
    }

    async fn upsert_load_log(&self, table_id: &str, loaded_at: DateTime<Utc>) -> LoadResult<()> {
        self.log
            .lock()
            .unwrap()
            .insert(table_id.to_string(), loaded_at);
        Ok(())
    }

    async fn execute(&self, _sql: &str) -> LoadResult<()> {
        Ok(())
    }
}
