//! Common types shared across the WFS replication crates.

pub mod bbox;
pub mod crs;
pub mod dataset;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod request;
pub mod schema;

pub use bbox::{BoundingBox, BoundsParseError};
pub use crs::{Crs, CrsParseError, DEFAULT_BOUNDS_CRS, DEFAULT_OUTPUT_CRS};
pub use dataset::DatasetIdentifier;
pub use error::{LoadError, LoadResult};
pub use feature::FeatureBatch;
pub use geometry::{value_has_z, GeometryKind, GeometryShape, ShapeParseError};
pub use request::{merge_filters, Pagination, RequestDescriptor, SpatialFilter};
pub use schema::{ColumnDefinition, FeatureTypeSchema, TableDefinition};
