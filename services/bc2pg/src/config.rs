//! Runtime configuration from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use wfs_client::{
    TableListCache, DEFAULT_CATALOGUE_URL, DEFAULT_CONCURRENCY, DEFAULT_PAGE_SIZE, DEFAULT_WFS_URL,
};

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// WFS endpoint
    pub wfs_url: String,
    /// BC Data Catalogue API base URL
    pub catalogue_url: String,
    /// Target database, if configured
    pub database_url: Option<String>,
    /// Feature type list cache file
    pub cache_path: PathBuf,
    pub cache_max_age: Duration,
    /// Timeout for a single WFS request
    pub request_timeout: Duration,
    pub page_size: u64,
    pub max_workers: usize,
    /// Whole-load retries on upstream failures
    pub max_retries: u32,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let cache_path = match lookup("BCDATA_CACHE") {
            Some(path) => TableListCache::expand_path(&path),
            None => TableListCache::default_path(),
        };

        Self {
            wfs_url: lookup("WFS_URL").unwrap_or_else(|| DEFAULT_WFS_URL.to_string()),
            catalogue_url: lookup("CATALOGUE_URL")
                .unwrap_or_else(|| DEFAULT_CATALOGUE_URL.to_string()),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            cache_path,
            cache_max_age: Duration::from_secs(
                parsed("BCDATA_CACHE_MAX_AGE_HOURS")
                    .unwrap_or(24)
                    .saturating_mul(3600),
            ),
            request_timeout: Duration::from_secs(parsed("WFS_TIMEOUT_SECS").unwrap_or(300)),
            page_size: parsed("WFS_PAGE_SIZE").unwrap_or(DEFAULT_PAGE_SIZE),
            max_workers: parsed("WFS_MAX_WORKERS")
                .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
                .unwrap_or(DEFAULT_CONCURRENCY),
            max_retries: parsed("LOAD_MAX_RETRIES")
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
                .unwrap_or(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("BCDATA_CACHE", "/tmp/bcdata_cache")]);
        assert_eq!(config.wfs_url, DEFAULT_WFS_URL);
        assert_eq!(config.catalogue_url, DEFAULT_CATALOGUE_URL);
        assert!(config.database_url.is_none());
        assert_eq!(config.cache_path, PathBuf::from("/tmp/bcdata_cache"));
        assert_eq!(config.cache_max_age, Duration::from_secs(86_400));
        assert_eq!(config.request_timeout, Duration::from_secs(300));
        assert_eq!(config.page_size, 10_000);
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("WFS_URL", "http://localhost:8080/geoserver/wfs"),
            ("DATABASE_URL", "postgresql://postgres@localhost/postgis"),
            ("BCDATA_CACHE_MAX_AGE_HOURS", "2"),
            ("WFS_PAGE_SIZE", "500"),
            ("WFS_MAX_WORKERS", "8"),
            ("LOAD_MAX_RETRIES", "0"),
        ]);
        assert_eq!(config.wfs_url, "http://localhost:8080/geoserver/wfs");
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgresql://postgres@localhost/postgis")
        );
        assert_eq!(config.cache_max_age, Duration::from_secs(7200));
        assert_eq!(config.page_size, 500);
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let config = config(&[("WFS_PAGE_SIZE", "lots"), ("WFS_TIMEOUT_SECS", "")]);
        assert_eq!(config.page_size, 10_000);
        assert_eq!(config.request_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_huge_values_saturate() {
        let config = config(&[
            ("BCDATA_CACHE_MAX_AGE_HOURS", "18446744073709551615"),
            ("LOAD_MAX_RETRIES", "99999999999"),
        ]);
        assert_eq!(config.cache_max_age, Duration::from_secs(u64::MAX));
        assert_eq!(config.max_retries, u32::MAX);
    }
}
