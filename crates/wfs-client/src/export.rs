//! Whole-dataset downloads built on the planner and fetcher.

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use geojson::{Feature, FeatureCollection, JsonObject};
use serde_json::json;
use tracing::info;

use wfs_common::{Crs, DatasetIdentifier, LoadError, LoadResult};

use crate::fetch::Fetcher;
use crate::planner::{PlanOptions, RequestPlanner};
use crate::service::FeatureService;

/// Number of features matching `filter`.
pub async fn get_count(
    service: &dyn FeatureService,
    dataset: &DatasetIdentifier,
    filter: Option<&str>,
) -> LoadResult<u64> {
    service.hits(dataset, filter).await
}

/// Download every planned chunk into one collection.
///
/// Output in any CRS other than EPSG:4326 carries a named `crs` member.
pub async fn get_data(
    planner: &RequestPlanner,
    fetcher: &Fetcher,
    dataset: &DatasetIdentifier,
    options: &PlanOptions,
) -> LoadResult<FeatureCollection> {
    let plan = planner.plan(dataset, options).await?;
    let batches = fetcher.fetch_all(plan.requests).await?;
    let features: Vec<Feature> = batches.into_iter().flat_map(|b| b.features).collect();

    info!(dataset = %dataset, features = features.len(), "Downloaded dataset");

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: crs_member(options.srs_name),
    })
}

/// Stream individual features across all planned chunks, in plan order.
pub async fn get_features(
    planner: &RequestPlanner,
    fetcher: &Fetcher,
    dataset: &DatasetIdentifier,
    options: &PlanOptions,
) -> LoadResult<BoxStream<'static, LoadResult<Feature>>> {
    let plan = planner.plan(dataset, options).await?;
    let features = fetcher
        .fetch_ordered(plan.requests)
        .map_ok(|batch| stream::iter(batch.features.into_iter().map(Ok::<Feature, LoadError>)))
        .try_flatten()
        .boxed();
    Ok(features)
}

fn crs_member(crs: Crs) -> Option<JsonObject> {
    if crs.is_wgs84() {
        return None;
    }
    let mut members = JsonObject::new();
    members.insert(
        "crs".to_string(),
        json!({"type": "name", "properties": {"name": crs.urn()}}),
    );
    Some(members)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_member() {
        assert!(crs_member(Crs::epsg(4326)).is_none());

        let members = crs_member(Crs::epsg(3005)).unwrap();
        assert_eq!(
            members["crs"]["properties"]["name"],
            "urn:ogc:def:crs:EPSG::3005"
        );
        assert_eq!(members["crs"]["type"], "name");
    }
}
