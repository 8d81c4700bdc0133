//! Promotion of single-part geometries to multi-part.
//!
//! A table column holds one geometry type, but a page of features may mix
//! `Polygon` and `MultiPolygon`. Promoting every geometry to its multi-part
//! form lets both land in the same column.

use geojson::{Feature, Geometry, Value};
use serde_json::Map;

use storage::{FeatureRow, GEOMETRY_COLUMN};
use wfs_common::FeatureBatch;

/// Wrap a single-part geometry as a one-member multi-part geometry.
///
/// Multi-part geometries and collections are returned unchanged, so applying
/// this twice is the same as applying it once.
pub fn normalize_value(value: Value) -> Value {
    match value {
        Value::Point(point) => Value::MultiPoint(vec![point]),
        Value::LineString(line) => Value::MultiLineString(vec![line]),
        Value::Polygon(polygon) => Value::MultiPolygon(vec![polygon]),
        other => other,
    }
}

pub fn normalize_feature(mut feature: Feature) -> Feature {
    feature.geometry = feature.geometry.map(|geometry| Geometry {
        value: normalize_value(geometry.value),
        ..geometry
    });
    feature
}

/// Normalize every feature of a batch.
pub fn normalize(batch: FeatureBatch) -> FeatureBatch {
    FeatureBatch {
        features: batch.features.into_iter().map(normalize_feature).collect(),
        ..batch
    }
}

/// Convert features to rows for `columns`, split into rows with and
/// without geometry.
///
/// Property names are lowercased and anything not in `columns` is dropped.
pub fn partition_rows(
    features: Vec<Feature>,
    columns: &[String],
) -> (Vec<FeatureRow>, Vec<FeatureRow>) {
    let mut with_geometry = Vec::new();
    let mut without_geometry = Vec::new();

    for feature in features {
        let mut properties = Map::new();
        for (key, value) in feature.properties.unwrap_or_default() {
            let key = key.to_lowercase();
            if key != GEOMETRY_COLUMN && columns.contains(&key) {
                properties.insert(key, value);
            }
        }

        match feature.geometry {
            Some(geometry) => with_geometry.push(FeatureRow::new(properties, Some(geometry))),
            None => without_geometry.push(FeatureRow::new(properties, None)),
        }
    }

    (with_geometry, without_geometry)
}
