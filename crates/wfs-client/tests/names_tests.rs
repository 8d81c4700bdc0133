//! Dataset name resolution and the table list cache.

use std::sync::Arc;
use std::time::Duration;

use wfs_client::{DatasetResolver, TableListCache};
use wfs_common::LoadError;

use test_utils::{
    cache_file_in, datasets, feature_type_schema, temp_test_dir, MockFeatureService,
    StaticCatalogue,
};

fn mock() -> Arc<MockFeatureService> {
    Arc::new(
        MockFeatureService::new()
            .with_dataset(datasets::AIRPORTS, feature_type_schema(&["OBJECTID"]), Vec::new())
            .with_feature_type(datasets::ROADS),
    )
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test]
async fn test_cache_written_sorted_without_prefix() {
    let dir = temp_test_dir();
    let cache = TableListCache::new(cache_file_in(&dir), Duration::from_secs(3600));
    let service = mock();

    let names = cache.list(service.as_ref(), false).await.unwrap();

    assert_eq!(names, vec![datasets::ROADS.to_string(), datasets::AIRPORTS.to_string()]);
    let on_disk: Vec<String> =
        serde_json::from_str(&std::fs::read_to_string(cache.path()).unwrap()).unwrap();
    assert_eq!(on_disk, names);
}

#[tokio::test]
async fn test_fresh_cache_is_reused() {
    let dir = temp_test_dir();
    let cache = TableListCache::new(cache_file_in(&dir), Duration::from_secs(3600));
    let service = mock();

    cache.list(service.as_ref(), false).await.unwrap();
    cache.list(service.as_ref(), false).await.unwrap();
    assert_eq!(service.list_calls(), 1);

    cache.list(service.as_ref(), true).await.unwrap();
    assert_eq!(service.list_calls(), 2);
}

#[tokio::test]
async fn test_stale_cache_is_refreshed() {
    let dir = temp_test_dir();
    let cache = TableListCache::new(cache_file_in(&dir), Duration::ZERO);
    let service = mock();

    cache.list(service.as_ref(), false).await.unwrap();
    cache.list(service.as_ref(), false).await.unwrap();
    assert_eq!(service.list_calls(), 2);
}

#[tokio::test]
async fn test_corrupt_cache_is_regenerated() {
    let dir = temp_test_dir();
    let path = cache_file_in(&dir);
    std::fs::write(&path, "not json").unwrap();
    let cache = TableListCache::new(&path, Duration::from_secs(3600));
    let service = mock();

    let names = cache.list(service.as_ref(), false).await.unwrap();
    assert_eq!(names.len(), 2);
    assert_eq!(service.list_calls(), 1);
}

// ============================================================================
// Resolver
// ============================================================================

fn resolver(dir: &tempfile::TempDir) -> DatasetResolver {
    let catalogue = StaticCatalogue::new().with_package(datasets::AIRPORTS_PACKAGE, datasets::AIRPORTS);
    DatasetResolver::new(
        mock(),
        Arc::new(catalogue),
        TableListCache::new(cache_file_in(dir), Duration::from_secs(3600)),
    )
}

#[tokio::test]
async fn test_resolve_case_insensitive_name() {
    let dir = temp_test_dir();
    let dataset = resolver(&dir)
        .resolve(&datasets::AIRPORTS.to_lowercase())
        .await
        .unwrap();
    assert_eq!(dataset.type_name(), datasets::AIRPORTS);
    assert_eq!(dataset.storage_table(), "gsr_airports_svw");
}

#[tokio::test]
async fn test_resolve_package_name_via_catalogue() {
    let dir = temp_test_dir();
    let dataset = resolver(&dir).resolve("BC-Airports").await.unwrap();
    assert_eq!(dataset.type_name(), datasets::AIRPORTS);
}

#[tokio::test]
async fn test_resolve_unknown() {
    let dir = temp_test_dir();
    let err = resolver(&dir).resolve("whse_x.nothing_here").await.unwrap_err();
    assert!(matches!(err, LoadError::UnknownDataset(name) if name == "whse_x.nothing_here"));
}
