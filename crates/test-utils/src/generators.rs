//! Generators for synthetic feature sets.
//!
//! Generated features carry a sequential `OBJECTID` starting at 1, which
//! makes it easy to check that paged results cover a dataset exactly once.

use geojson::{Feature, Value};

use crate::fixtures::{airport_feature, point};

/// `count` airport features whose geometry comes from `geometry(i)`.
///
/// # Example
///
/// ```
/// use test_utils::{generate_features, point};
///
/// let features = generate_features(3, |i| Some(point(i as f64, 0.0)));
/// assert_eq!(features.len(), 3);
/// ```
pub fn generate_features<F>(count: u64, geometry: F) -> Vec<Feature>
where
    F: Fn(u64) -> Option<Value>,
{
    (0..count)
        .map(|i| airport_feature(i + 1, geometry(i)))
        .collect()
}

/// `count` point features along a diagonal.
pub fn sequential_points(count: u64) -> Vec<Feature> {
    generate_features(count, |i| Some(point(1_000_000.0 + i as f64, 500_000.0 + i as f64)))
}

/// Points where every `null_every`-th feature (1-based) has no geometry.
pub fn points_with_nulls(count: u64, null_every: u64) -> Vec<Feature> {
    generate_features(count, |i| {
        if null_every > 0 && (i + 1) % null_every == 0 {
            None
        } else {
            Some(point(1_000_000.0 + i as f64, 500_000.0))
        }
    })
}

/// Features with no geometry except the last `tail`, which are points.
pub fn geometry_only_at_end(count: u64, tail: u64) -> Vec<Feature> {
    generate_features(count, |i| {
        if i + tail >= count {
            Some(point(i as f64, i as f64))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_with_nulls() {
        let features = points_with_nulls(10, 5);
        let nulls = features.iter().filter(|f| f.geometry.is_none()).count();
        assert_eq!(nulls, 2);
    }

    #[test]
    fn test_geometry_only_at_end() {
        let features = geometry_only_at_end(100, 3);
        assert!(features[96].geometry.is_none());
        assert!(features[97].geometry.is_some());
        assert!(features[99].geometry.is_some());
    }

    #[test]
    fn test_sequential_ids() {
        let features = sequential_points(3);
        let ids: Vec<u64> = features
            .iter()
            .map(|f| f.properties.as_ref().unwrap()["OBJECTID"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
