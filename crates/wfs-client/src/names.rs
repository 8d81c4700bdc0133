//! Dataset name validation against the published feature type list.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use wfs_common::{DatasetIdentifier, LoadError, LoadResult};

use crate::catalogue::Catalogue;
use crate::service::FeatureService;

/// Cache entries older than this are regenerated.
pub const DEFAULT_CACHE_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Read-through file cache of the WFS feature type names.
///
/// The file holds a sorted JSON array of names without the `pub:` prefix.
#[derive(Debug, Clone)]
pub struct TableListCache {
    path: PathBuf,
    max_age: Duration,
}

impl TableListCache {
    pub fn new(path: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            path: path.into(),
            max_age,
        }
    }

    /// `BCDATA_CACHE` if set, otherwise `~/.bcdata`.
    pub fn default_path() -> PathBuf {
        let raw = std::env::var("BCDATA_CACHE").unwrap_or_else(|_| "~/.bcdata".to_string());
        Self::expand_path(&raw)
    }

    /// Expand a leading `~` to the home directory.
    pub fn expand_path(raw: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(raw).into_owned())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Feature type names, refetched when the cache is missing, stale,
    /// unreadable, or `refresh` is set.
    pub async fn list(&self, service: &dyn FeatureService, refresh: bool) -> LoadResult<Vec<String>> {
        if !refresh && self.is_fresh().await {
            match self.read().await {
                Ok(names) => {
                    debug!(path = %self.path.display(), count = names.len(), "Using cached table list");
                    return Ok(names);
                }
                Err(e) => warn!(path = %self.path.display(), error = %e, "Ignoring unreadable table list cache"),
            }
        }

        let mut names: Vec<String> = service
            .list_feature_types()
            .await?
            .into_iter()
            .map(|n| n.trim_start_matches("pub:").to_string())
            .collect();
        names.sort();
        names.dedup();

        self.write(&names).await?;
        info!(path = %self.path.display(), count = names.len(), "Refreshed table list cache");
        Ok(names)
    }

    async fn is_fresh(&self) -> bool {
        let modified = match tokio::fs::metadata(&self.path).await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => return false,
        };
        // A modification time in the future counts as fresh.
        modified
            .elapsed()
            .map(|age| age < self.max_age)
            .unwrap_or(true)
    }

    async fn read(&self) -> LoadResult<Vec<String>> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        serde_json::from_str(&contents).map_err(|e| LoadError::Cache(e.to_string()))
    }

    async fn write(&self, names: &[String]) -> LoadResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string(names).map_err(|e| LoadError::Cache(e.to_string()))?;
        tokio::fs::write(&self.path, contents).await?;
        Ok(())
    }
}

/// Maps user supplied dataset names to WFS feature types.
pub struct DatasetResolver {
    service: Arc<dyn FeatureService>,
    catalogue: Arc<dyn Catalogue>,
    cache: TableListCache,
}

impl DatasetResolver {
    pub fn new(
        service: Arc<dyn FeatureService>,
        catalogue: Arc<dyn Catalogue>,
        cache: TableListCache,
    ) -> Self {
        Self {
            service,
            catalogue,
            cache,
        }
    }

    /// All published feature type names.
    pub async fn list_tables(&self, refresh: bool) -> LoadResult<Vec<String>> {
        self.cache.list(self.service.as_ref(), refresh).await
    }

    /// Resolve a feature type name, or a catalogue package name or id.
    pub async fn resolve(&self, name: &str) -> LoadResult<DatasetIdentifier> {
        let upper = name.trim().to_uppercase();
        let tables = self.list_tables(false).await?;
        if tables.iter().any(|t| *t == upper) {
            return DatasetIdentifier::parse(&upper);
        }

        match self.catalogue.resolve_name(&name.trim().to_lowercase()).await? {
            Some(object_name) => {
                debug!(name, object_name = %object_name, "Resolved name via catalogue");
                DatasetIdentifier::parse(&object_name)
            }
            None => Err(LoadError::UnknownDataset(name.to_string())),
        }
    }
}
