//! The storage seam used by the loader.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use wfs_common::LoadResult;

use crate::ddl::TableSpec;
use crate::rows::{FeatureRow, TableName};

/// A spatial database that target tables are created in and appended to.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    async fn table_exists(&self, table: &TableName) -> LoadResult<bool>;

    /// Column names in table order.
    async fn list_columns(&self, table: &TableName) -> LoadResult<Vec<String>>;

    /// Drop any existing table and create `spec`, atomically.
    async fn create_table(&self, spec: &TableSpec) -> LoadResult<()>;

    /// Append rows in one commit, returning the number inserted.
    ///
    /// With `has_geometry` every row must carry a geometry, which is written
    /// to the geometry column. Otherwise geometries are ignored and the
    /// column is left null.
    async fn append_rows(
        &self,
        table: &TableName,
        rows: &[FeatureRow],
        has_geometry: bool,
    ) -> LoadResult<u64>;

    /// Record that `table_id` was fully loaded at `loaded_at`.
    async fn upsert_load_log(&self, table_id: &str, loaded_at: DateTime<Utc>) -> LoadResult<()>;

    /// Run arbitrary SQL, possibly several statements.
    async fn execute(&self, sql: &str) -> LoadResult<()>;
}
