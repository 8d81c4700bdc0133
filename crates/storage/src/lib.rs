//! Storage side of WFS replication.
//!
//! Provides:
//! - [`FeatureStore`], the seam the loader writes through
//! - [`PostgisStore`], its PostgreSQL/PostGIS implementation
//! - Table definitions and DDL generation from catalogue metadata

pub mod ddl;
pub mod postgis;
pub mod rows;
pub mod store;

pub use ddl::{pg_type, quote_ident, quote_literal, ColumnSpec, TableSpec, GEOMETRY_COLUMN};
pub use postgis::{PostgisStore, LOG_TABLE};
pub use rows::{FeatureRow, TableName};
pub use store::FeatureStore;
