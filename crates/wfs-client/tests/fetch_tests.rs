//! Bounded concurrent fetching and the export helpers built on it.

use std::sync::Arc;

use futures::StreamExt;

use wfs_client::{get_count, get_data, get_features, Fetcher, PlanOptions, RequestPlanner};
use wfs_common::{Crs, DatasetIdentifier, LoadError};

use test_utils::{datasets, feature_type_schema, sequential_points, MockFeatureService};

fn airports() -> DatasetIdentifier {
    DatasetIdentifier::parse(datasets::AIRPORTS).unwrap()
}

fn setup(count: u64, mock: MockFeatureService) -> (Arc<MockFeatureService>, RequestPlanner, Fetcher) {
    let mock = Arc::new(mock.with_dataset(
        datasets::AIRPORTS,
        feature_type_schema(&["OBJECTID", "AIRPORT_NAME"]),
        sequential_points(count),
    ));
    let planner = RequestPlanner::new(mock.clone());
    let fetcher = Fetcher::new(mock.clone(), 3);
    (mock, planner, fetcher)
}

fn options(page_size: u64) -> PlanOptions {
    PlanOptions {
        page_size,
        ..PlanOptions::default()
    }
}

fn object_ids(features: &[geojson::Feature]) -> Vec<u64> {
    features
        .iter()
        .map(|f| f.properties.as_ref().unwrap()["OBJECTID"].as_u64().unwrap())
        .collect()
}

// ============================================================================
// Fetcher
// ============================================================================

#[tokio::test]
async fn test_fetch_all_preserves_plan_order() {
    let (_, planner, fetcher) = setup(95, MockFeatureService::new());
    let plan = planner.plan(&airports(), &options(10)).await.unwrap();

    let batches = fetcher.fetch_all(plan.requests.clone()).await.unwrap();

    assert_eq!(batches.len(), 10);
    for (batch, request) in batches.iter().zip(&plan.requests) {
        assert_eq!(&batch.request, request);
    }
    let features: Vec<_> = batches.into_iter().flat_map(|b| b.features).collect();
    assert_eq!(object_ids(&features), (1..=95).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_fetch_unordered_covers_every_request() {
    let (_, planner, fetcher) = setup(50, MockFeatureService::new());
    let plan = planner.plan(&airports(), &options(7)).await.unwrap();

    let batches: Vec<_> = fetcher.fetch(plan.requests).collect().await;

    let mut ids: Vec<u64> = batches
        .into_iter()
        .flat_map(|b| b.unwrap().features)
        .map(|f| f.properties.unwrap()["OBJECTID"].as_u64().unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=50).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_fetch_stops_at_first_error() {
    let (mock, planner, fetcher) = setup(100, MockFeatureService::new().failing_from(30));
    let plan = planner.plan(&airports(), &options(10)).await.unwrap();

    let results: Vec<_> = fetcher.fetch_ordered(plan.requests).collect().await;

    assert_eq!(results.len(), 4);
    assert!(results[..3].iter().all(|r| r.is_ok()));
    let err = results[3].as_ref().unwrap_err();
    assert!(matches!(err, LoadError::Upstream { status: Some(500), .. }));
    assert!(err.to_string().contains("startIndex=30"));
    assert!(err.is_retryable());

    // At most `concurrency` requests are issued past the failing one.
    assert!(mock.feature_requests().len() <= 4 + fetcher.concurrency());
}

#[tokio::test]
async fn test_fetch_all_returns_error() {
    let (_, planner, fetcher) = setup(100, MockFeatureService::new().failing_from(0));
    let plan = planner.plan(&airports(), &options(10)).await.unwrap();

    let err = fetcher.fetch_all(plan.requests).await.unwrap_err();
    assert_eq!(err.upstream_status(), Some(500));
}

#[test]
fn test_zero_concurrency_is_clamped() {
    let mock = Arc::new(MockFeatureService::new());
    assert_eq!(Fetcher::new(mock, 0).concurrency(), 1);
}

// ============================================================================
// Export helpers
// ============================================================================

#[tokio::test]
async fn test_get_count() {
    let (mock, _, _) = setup(1234, MockFeatureService::new());
    let count = get_count(mock.as_ref(), &airports(), Some("OBJECTID > 0")).await.unwrap();
    assert_eq!(count, 1234);
    assert_eq!(mock.hits_filters(), vec![Some("OBJECTID > 0".to_string())]);
}

#[tokio::test]
async fn test_get_data_wgs84_has_no_crs_member() {
    let (_, planner, fetcher) = setup(25, MockFeatureService::new());

    let collection = get_data(&planner, &fetcher, &airports(), &options(10)).await.unwrap();

    assert_eq!(collection.features.len(), 25);
    assert!(collection.foreign_members.is_none());
}

#[tokio::test]
async fn test_get_data_projected_has_crs_member() {
    let (_, planner, fetcher) = setup(5, MockFeatureService::new());
    let options = PlanOptions {
        srs_name: Crs::epsg(3005),
        ..PlanOptions::default()
    };

    let collection = get_data(&planner, &fetcher, &airports(), &options).await.unwrap();

    let members = collection.foreign_members.unwrap();
    assert_eq!(
        members["crs"]["properties"]["name"],
        "urn:ogc:def:crs:EPSG::3005"
    );
}

#[tokio::test]
async fn test_get_features_streams_in_order() {
    let (_, planner, fetcher) = setup(33, MockFeatureService::new());

    let stream = get_features(&planner, &fetcher, &airports(), &options(5)).await.unwrap();
    let features: Vec<_> = stream.map(|f| f.unwrap()).collect().await;

    assert_eq!(object_ids(&features), (1..=33).collect::<Vec<u64>>());
}
