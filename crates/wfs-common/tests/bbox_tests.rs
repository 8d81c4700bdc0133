//! Tests for parsing user supplied bounds.

use wfs_common::bbox::{BoundingBox, BoundsParseError};

// ============================================================================
// Accepted forms
// ============================================================================

#[test]
fn test_bounds_bracketed_list() {
    let bbox = BoundingBox::from_bounds_string("[1188000, 400000, 1190000, 402000]").unwrap();
    assert_eq!(bbox.as_array(), [1188000.0, 400000.0, 1190000.0, 402000.0]);
}

#[test]
fn test_bounds_comma_separated() {
    let bbox = BoundingBox::from_bounds_string("-125.5,24.75,-66.25,50.125").unwrap();
    assert!((bbox.min_x - (-125.5)).abs() < 0.001);
    assert!((bbox.min_y - 24.75).abs() < 0.001);
    assert!((bbox.max_x - (-66.25)).abs() < 0.001);
    assert!((bbox.max_y - 50.125).abs() < 0.001);
}

#[test]
fn test_bounds_mixed_separators_and_padding() {
    let bbox = BoundingBox::from_bounds_string("  0, 0  100 ,100 ").unwrap();
    assert_eq!(bbox, BoundingBox::new(0.0, 0.0, 100.0, 100.0));
}

#[test]
fn test_bounds_scientific_notation() {
    let bbox = BoundingBox::from_bounds_string("1e-6 2e-6 1e6 2e6").unwrap();
    assert!((bbox.min_x - 1e-6).abs() < 1e-10);
    assert!((bbox.max_x - 1e6).abs() < 0.001);
}

// ============================================================================
// Rejected forms
// ============================================================================

#[test]
fn test_bounds_too_few() {
    let result = BoundingBox::from_bounds_string("0 0 100");
    assert!(matches!(result, Err(BoundsParseError::InvalidFormat(_))));
}

#[test]
fn test_bounds_too_many() {
    let result = BoundingBox::from_bounds_string("0,0,100,100,200");
    assert!(matches!(result, Err(BoundsParseError::InvalidFormat(_))));
}

#[test]
fn test_bounds_invalid_number() {
    let result = BoundingBox::from_bounds_string("abc 0 100 100");
    assert!(matches!(result, Err(BoundsParseError::InvalidNumber(_))));
}

#[test]
fn test_bounds_empty_string() {
    let result = BoundingBox::from_bounds_string("");
    assert!(matches!(result, Err(BoundsParseError::InvalidFormat(_))));
}
