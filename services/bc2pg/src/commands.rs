//! Subcommand implementations.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::TryStreamExt;
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use tracing::info;

use loader::{LoadOptions, LoadOrchestrator};
use storage::PostgisStore;
use wfs_client::{
    get_count, get_data, get_features, BcdcCatalogue, DatasetResolver, Fetcher, FeatureService,
    PlanOptions, RequestPlanner, TableListCache, WfsClient, WfsConfig,
};
use wfs_common::{
    BoundingBox, Crs, FeatureTypeSchema, GeometryShape, DEFAULT_BOUNDS_CRS, DEFAULT_OUTPUT_CRS,
};

use crate::config::AppConfig;
use crate::retry::{with_retry, RetryPolicy};

/// Filters and paging for `dump` and `cat`.
#[derive(Debug, Clone)]
pub struct Query {
    pub filter: Option<String>,
    pub bounds: Vec<String>,
    pub bounds_crs: Crs,
    pub dst_crs: Crs,
    pub page_size: Option<u64>,
    pub sort_by: Option<String>,
}

/// Arguments of `bc2pg`.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub dataset: String,
    pub db_url: Option<String>,
    pub table: Option<String>,
    pub schema: Option<String>,
    pub geometry_type: Option<GeometryShape>,
    pub query: Option<String>,
    pub bounds: Vec<String>,
    pub count: Option<u64>,
    pub sortby: Option<String>,
    pub primary_key: Option<String>,
    pub pagesize: Option<u64>,
    pub max_workers: Option<usize>,
    pub timestamp: bool,
    pub schema_only: bool,
    pub append: bool,
}

/// How JSON is written to stdout. Keys are always sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonStyle {
    /// No whitespace at all
    Compact,
    /// One line, with a space after `,` and `:`
    Spaced,
    /// Pretty printed with this many spaces per level
    Indented(usize),
}

impl JsonStyle {
    pub fn new(indent: Option<usize>, compact: bool) -> Self {
        match (indent, compact) {
            (_, true) => JsonStyle::Compact,
            (Some(width), false) => JsonStyle::Indented(width),
            (None, false) => JsonStyle::Spaced,
        }
    }
}

#[derive(Serialize)]
struct DatasetInfo {
    name: String,
    count: u64,
    schema: SchemaInfo,
}

#[derive(Serialize)]
struct SchemaInfo {
    properties: BTreeMap<String, String>,
    geometry: Option<String>,
    geometry_column: Option<String>,
}

impl DatasetInfo {
    fn new(name: String, count: u64, schema: FeatureTypeSchema) -> Self {
        Self {
            name,
            count,
            schema: SchemaInfo {
                properties: schema.property_types,
                geometry: schema.geometry_type,
                geometry_column: schema.geometry_column,
            },
        }
    }
}

pub struct App {
    config: AppConfig,
    service: Arc<WfsClient>,
    catalogue: Arc<BcdcCatalogue>,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let service = WfsClient::new(WfsConfig {
            base_url: config.wfs_url.clone(),
            request_timeout: config.request_timeout,
            ..WfsConfig::default()
        })
        .context("Failed to build WFS client")?;
        let catalogue = BcdcCatalogue::new(config.catalogue_url.clone(), config.request_timeout)
            .context("Failed to build catalogue client")?;

        Ok(Self {
            config,
            service: Arc::new(service),
            catalogue: Arc::new(catalogue),
        })
    }

    fn cache(&self) -> TableListCache {
        TableListCache::new(self.config.cache_path.clone(), self.config.cache_max_age)
    }

    fn resolver(&self) -> DatasetResolver {
        DatasetResolver::new(self.service.clone(), self.catalogue.clone(), self.cache())
    }

    fn plan_options(&self, query: &Query) -> Result<PlanOptions> {
        Ok(PlanOptions {
            filter: query.filter.clone(),
            bounds: parse_bounds(&query.bounds)?.map(|b| (b, query.bounds_crs)),
            sort_by: query.sort_by.clone(),
            page_size: query.page_size.unwrap_or(self.config.page_size),
            max_count: None,
            srs_name: query.dst_crs,
        })
    }

    pub async fn list(&self, refresh: bool) -> Result<()> {
        let tables = self
            .resolver()
            .list_tables(refresh)
            .await
            .context("Failed to list feature types")?;

        let mut out = std::io::stdout().lock();
        for table in tables {
            writeln!(out, "{}", table)?;
        }
        Ok(())
    }

    pub async fn info(
        &self,
        dataset: &str,
        count_only: bool,
        name_only: bool,
        style: JsonStyle,
    ) -> Result<()> {
        let dataset = self.resolver().resolve(dataset).await?;
        if name_only {
            println!("{}", dataset);
            return Ok(());
        }

        let count = get_count(self.service.as_ref(), &dataset, None).await?;
        if count_only {
            println!("{}", count);
            return Ok(());
        }

        let schema = self.service.describe(&dataset).await?;
        let info = DatasetInfo::new(dataset.type_name(), count, schema);
        println!("{}", to_json(&info, style)?);
        Ok(())
    }

    pub async fn dump(&self, dataset: &str, query: &Query, out_file: Option<PathBuf>) -> Result<()> {
        let dataset = self.resolver().resolve(dataset).await?;
        let options = self.plan_options(query)?;
        let planner = RequestPlanner::new(self.service.clone());
        let fetcher = Fetcher::new(self.service.clone(), self.config.max_workers);

        let collection = get_data(&planner, &fetcher, &dataset, &options)
            .await
            .with_context(|| format!("Failed to download {}", dataset))?;
        let body = serde_json::to_string(&collection)?;

        match out_file {
            Some(path) => {
                tokio::fs::write(&path, body)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!(dataset = %dataset, path = %path.display(), "Wrote dataset");
            }
            None => println!("{}", body),
        }
        Ok(())
    }

    pub async fn cat(&self, dataset: &str, query: &Query, style: JsonStyle) -> Result<()> {
        let dataset = self.resolver().resolve(dataset).await?;
        let options = self.plan_options(query)?;
        let planner = RequestPlanner::new(self.service.clone());
        let fetcher = Fetcher::new(self.service.clone(), self.config.max_workers);

        let mut features = get_features(&planner, &fetcher, &dataset, &options).await?;
        while let Some(feature) = features.try_next().await? {
            let line = to_json(&feature, style)?;
            writeln!(std::io::stdout().lock(), "{}", line)?;
        }
        Ok(())
    }

    pub async fn bc2pg(&self, request: LoadRequest) -> Result<()> {
        let Some(db_url) = request.db_url.clone().or_else(|| self.config.database_url.clone())
        else {
            bail!("No database configured, set DATABASE_URL or pass --db-url");
        };

        let options = self.load_options(request)?;
        let store = PostgisStore::connect(&db_url, pool_size(options.concurrency))
            .await
            .context("Failed to connect to database")?;

        let orchestrator = LoadOrchestrator::new(
            self.service.clone(),
            self.catalogue.clone(),
            Arc::new(store),
            self.cache(),
        );

        let policy = RetryPolicy::new(self.config.max_retries);
        let summary = with_retry(&policy, || orchestrator.load(&options))
            .await
            .with_context(|| format!("Failed to load {}", options.dataset))?;

        println!(
            "{}: {} rows in {} chunks",
            summary.table_id,
            summary.rows(),
            summary.chunks
        );
        Ok(())
    }

    fn load_options(&self, request: LoadRequest) -> Result<LoadOptions> {
        Ok(LoadOptions {
            schema: request.schema,
            table: request.table,
            geometry_type: request.geometry_type,
            filter: request.query,
            bounds: parse_bounds(&request.bounds)?.map(|b| (b, DEFAULT_BOUNDS_CRS)),
            count: request.count,
            sort_by: request.sortby,
            primary_key: request.primary_key,
            timestamp: request.timestamp,
            schema_only: request.schema_only,
            append: request.append,
            page_size: request.pagesize.unwrap_or(self.config.page_size),
            concurrency: request.max_workers.unwrap_or(self.config.max_workers),
            srs: DEFAULT_OUTPUT_CRS,
            ..LoadOptions::new(request.dataset)
        })
    }
}

/// Bounds come in as up to four shell words; join and parse them together.
fn parse_bounds(words: &[String]) -> Result<Option<BoundingBox>> {
    if words.is_empty() {
        return Ok(None);
    }
    let joined = words.join(" ");
    let bounds = BoundingBox::from_bounds_string(&joined)
        .with_context(|| format!("Invalid --bounds {:?}", joined))?;
    Ok(Some(bounds))
}

/// One connection per worker plus one for bookkeeping.
fn pool_size(concurrency: usize) -> u32 {
    u32::try_from(concurrency)
        .unwrap_or(u32::MAX)
        .saturating_add(1)
}

// `, ` and `: ` separators on a single line.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn to_json<T: Serialize>(value: &T, style: JsonStyle) -> Result<String> {
    // Round trip through `Value` so object keys come out sorted.
    let value = serde_json::to_value(value)?;
    let mut buf = Vec::new();
    match style {
        JsonStyle::Compact => serde_json::to_writer(&mut buf, &value)?,
        JsonStyle::Spaced => {
            let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
            value.serialize(&mut serializer)?;
        }
        JsonStyle::Indented(width) => {
            let spaces = vec![b' '; width];
            let formatter = PrettyFormatter::with_indent(&spaces);
            let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
            value.serialize(&mut serializer)?;
        }
    }
    Ok(String::from_utf8(buf)?)
}
