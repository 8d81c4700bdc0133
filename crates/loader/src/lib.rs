//! WFS to PostGIS replication.
//!
//! Loads a dataset from the WFS into a spatial table in chunks:
//!
//! - Plans paged requests covering the dataset exactly once
//! - Probes a sample of features for the geometry type of a new table
//! - Normalizes geometries to multi-part and splits null geometries out
//! - Appends each chunk as it arrives and logs the completed load

pub mod normalize;
pub mod orchestrator;
pub mod resolver;

pub use normalize::{normalize, normalize_feature, normalize_value, partition_rows};
pub use orchestrator::{LoadOptions, LoadOrchestrator, LoadStage, LoadSummary};
pub use resolver::{shape_of_features, GeometryTypeResolver, DEFAULT_SAMPLE_SIZE};
