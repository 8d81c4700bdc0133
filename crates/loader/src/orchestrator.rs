//! Drives a full dataset load: validate, provision, load chunks, log.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tracing::{error, info, instrument};

use storage::{FeatureStore, TableName, TableSpec};
use wfs_client::{
    Catalogue, DatasetResolver, FeatureService, Fetcher, PlanOptions, RequestPlan, RequestPlanner,
    TableListCache, DEFAULT_CONCURRENCY, DEFAULT_PAGE_SIZE,
};
use wfs_common::{
    BoundingBox, Crs, GeometryShape, LoadError, LoadResult, DEFAULT_OUTPUT_CRS,
};

use crate::normalize::{normalize, partition_rows};
use crate::resolver::{GeometryTypeResolver, DEFAULT_SAMPLE_SIZE};

/// Where a load is, for logging failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Validating,
    Provisioning,
    Loading { chunk: usize, of: usize },
    Finalizing,
    Done,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStage::Validating => write!(f, "validating"),
            LoadStage::Provisioning => write!(f, "provisioning"),
            LoadStage::Loading { chunk, of } => write!(f, "loading chunk {} of {}", chunk, of),
            LoadStage::Finalizing => write!(f, "finalizing"),
            LoadStage::Done => write!(f, "done"),
        }
    }
}

/// Options for loading one dataset.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Dataset name, package name or id
    pub dataset: String,
    /// Target schema, defaults to the dataset schema lowercased
    pub schema: Option<String>,
    /// Target table, defaults to the dataset table lowercased
    pub table: Option<String>,
    /// Geometry shape of a new table; probed when absent
    pub geometry_type: Option<GeometryShape>,
    pub filter: Option<String>,
    pub bounds: Option<(BoundingBox, Crs)>,
    /// Maximum number of features to load
    pub count: Option<u64>,
    pub sort_by: Option<String>,
    pub primary_key: Option<String>,
    /// Record the load in `bcdata.log`
    pub timestamp: bool,
    /// Create the table but load nothing
    pub schema_only: bool,
    /// Append to an existing table instead of creating one
    pub append: bool,
    pub page_size: u64,
    /// Requests in flight at once
    pub concurrency: usize,
    /// CRS features are requested and stored in
    pub srs: Crs,
}

impl LoadOptions {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            schema: None,
            table: None,
            geometry_type: None,
            filter: None,
            bounds: None,
            count: None,
            sort_by: None,
            primary_key: None,
            timestamp: true,
            schema_only: false,
            append: false,
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            srs: DEFAULT_OUTPUT_CRS,
        }
    }

    fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            filter: self.filter.clone(),
            bounds: self.bounds,
            sort_by: self.sort_by.clone(),
            page_size: self.page_size,
            max_count: self.count,
            srs_name: self.srs,
        }
    }
}

/// Outcome of a completed load.
#[derive(Debug, Clone)]
pub struct LoadSummary {
    /// `schema.table` loaded into
    pub table_id: String,
    pub chunks: usize,
    pub rows_with_geometry: u64,
    pub rows_without_geometry: u64,
    pub finished_at: DateTime<Utc>,
}

impl LoadSummary {
    pub fn rows(&self) -> u64 {
        self.rows_with_geometry + self.rows_without_geometry
    }
}

// Validated load, ready to provision and run.
struct LoadTarget {
    table: TableName,
    columns: Vec<String>,
    spec: Option<TableSpec>,
    plan: RequestPlan,
}

/// Loads datasets from a feature service into a feature store.
///
/// Loads of the same table must not run concurrently.
pub struct LoadOrchestrator {
    service: Arc<dyn FeatureService>,
    catalogue: Arc<dyn Catalogue>,
    store: Arc<dyn FeatureStore>,
    names: DatasetResolver,
    sample_size: u64,
}

impl LoadOrchestrator {
    pub fn new(
        service: Arc<dyn FeatureService>,
        catalogue: Arc<dyn Catalogue>,
        store: Arc<dyn FeatureStore>,
        cache: TableListCache,
    ) -> Self {
        let names = DatasetResolver::new(service.clone(), catalogue.clone(), cache);
        Self {
            service,
            catalogue,
            store,
            names,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }

    /// Features fetched per geometry type probe.
    pub fn with_sample_size(mut self, sample_size: u64) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Run a load to completion.
    ///
    /// Chunks already appended when a later chunk fails stay in the table.
    #[instrument(skip(self, options), fields(dataset = %options.dataset, append = options.append))]
    pub async fn load(&self, options: &LoadOptions) -> LoadResult<LoadSummary> {
        let mut stage = LoadStage::Validating;
        match self.run(options, &mut stage).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!(stage = %stage, error = %e, "Load failed");
                Err(e)
            }
        }
    }

    async fn run(&self, options: &LoadOptions, stage: &mut LoadStage) -> LoadResult<LoadSummary> {
        let target = self.validate(options).await?;

        if let Some(spec) = &target.spec {
            *stage = LoadStage::Provisioning;
            self.store.create_table(spec).await?;
        }

        let mut summary = LoadSummary {
            table_id: target.table.to_string(),
            chunks: 0,
            rows_with_geometry: 0,
            rows_without_geometry: 0,
            finished_at: Utc::now(),
        };

        if !options.schema_only {
            let chunks = target.plan.chunk_count();
            let fetcher = Fetcher::new(self.service.clone(), options.concurrency);
            let mut batches = fetcher.fetch_ordered(target.plan.requests.clone());

            let mut chunk = 0;
            while let Some(batch) = batches.next().await {
                chunk += 1;
                *stage = LoadStage::Loading { chunk, of: chunks };

                let batch = normalize(batch?);
                let (with_geometry, without_geometry) =
                    partition_rows(batch.features, &target.columns);

                summary.rows_with_geometry += self
                    .store
                    .append_rows(&target.table, &with_geometry, true)
                    .await?;
                summary.rows_without_geometry += self
                    .store
                    .append_rows(&target.table, &without_geometry, false)
                    .await?;
                summary.chunks = chunk;

                info!(
                    table = %target.table,
                    chunk,
                    chunks,
                    with_geometry = with_geometry.len(),
                    without_geometry = without_geometry.len(),
                    "Loaded chunk"
                );
            }
        }

        *stage = LoadStage::Finalizing;
        summary.finished_at = Utc::now();
        if options.timestamp && !options.schema_only {
            self.store
                .upsert_load_log(&summary.table_id, summary.finished_at)
                .await?;
        }

        *stage = LoadStage::Done;
        info!(
            table = %summary.table_id,
            chunks = summary.chunks,
            rows = summary.rows(),
            "Load complete"
        );
        Ok(summary)
    }

    /// Every check that can fail before the target table is touched.
    async fn validate(&self, options: &LoadOptions) -> LoadResult<LoadTarget> {
        let dataset = self.names.resolve(&options.dataset).await?;
        let table = TableName::new(
            options
                .schema
                .clone()
                .unwrap_or_else(|| dataset.storage_schema()),
            options
                .table
                .clone()
                .unwrap_or_else(|| dataset.storage_table()),
        );
        let planner = RequestPlanner::new(self.service.clone());
        let plan_options = options.plan_options();

        let (columns, spec, plan) = if options.append {
            if !self.store.table_exists(&table).await? {
                return Err(LoadError::TargetMissing(table.to_string()));
            }
            let columns = self.store.list_columns(&table).await?;
            let plan = planner.plan(&dataset, &plan_options).await?;
            (columns, None, plan)
        } else {
            let definition = self.catalogue.table_definition(&dataset).await?;
            if definition.schema.is_empty() {
                return Err(LoadError::SchemaUnavailable(dataset.type_name()));
            }
            if let Some(key) = &options.primary_key {
                if !definition.has_column(key) {
                    return Err(LoadError::InvalidPrimaryKey {
                        dataset: dataset.type_name(),
                        column: key.clone(),
                    });
                }
            }

            let plan = planner.plan(&dataset, &plan_options).await?;
            let shape = match options.geometry_type {
                Some(shape) => shape,
                None => {
                    GeometryTypeResolver::new(self.service.clone())
                        .with_sample_size(self.sample_size)
                        .resolve(&plan)
                        .await?
                }
            };

            let spec = TableSpec::from_definition(
                table.clone(),
                &definition,
                shape,
                options.srs.srid(),
                options.primary_key.as_deref(),
            )?;
            (spec.column_names(), Some(spec), plan)
        };

        if let Some(sort_by) = &options.sort_by {
            if !columns.contains(&sort_by.to_lowercase()) {
                return Err(LoadError::InvalidSortColumn {
                    table: table.to_string(),
                    column: sort_by.clone(),
                });
            }
        }

        Ok(LoadTarget {
            table,
            columns,
            spec,
            plan,
        })
    }
}
