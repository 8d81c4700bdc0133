//! [`FeatureStore`] over PostgreSQL with PostGIS.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use wfs_common::{LoadError, LoadResult};

use crate::ddl::{qualified, quote_ident, TableSpec, GEOMETRY_COLUMN};
use crate::rows::{FeatureRow, TableName};
use crate::store::FeatureStore;

/// Bookkeeping table holding the latest load time per table.
pub const LOG_TABLE: &str = "bcdata.log";

const LOG_SCHEMA_SQL: &str = r#"
CREATE SCHEMA IF NOT EXISTS bcdata;

CREATE TABLE IF NOT EXISTS bcdata.log (
    table_name text PRIMARY KEY,
    latest_download timestamp with time zone
);
"#;

/// PostGIS-backed store.
pub struct PostgisStore {
    pool: PgPool,
}

impl PostgisStore {
    /// Connect to the database at `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> LoadResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| LoadError::database("connection", format!("Connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Insert statement for rows bound as a JSON array in `$1`.
///
/// Attribute values are cast to the column types by
/// `jsonb_populate_record(set)`. Geometries are read from each element's
/// `geom` member and take the SRID of the target column.
pub fn insert_sql(table: &TableName, columns: &[String], has_geometry: bool) -> String {
    let target = qualified(table);
    let mut targets: Vec<String> = columns
        .iter()
        .filter(|c| c.as_str() != GEOMETRY_COLUMN)
        .map(|c| quote_ident(c))
        .collect();
    let mut values: Vec<String> = targets.iter().map(|c| format!("r.{}", c)).collect();

    let source = if has_geometry {
        targets.push(quote_ident(GEOMETRY_COLUMN));
        values.push(format!(
            "ST_SetSRID(ST_GeomFromGeoJSON(e.value ->> 'geom'), Find_SRID('{}', '{}', 'geom'))",
            table.schema.replace('\'', "''"),
            table.table.replace('\'', "''"),
        ));
        format!(
            "jsonb_array_elements($1) AS e,\n     LATERAL jsonb_populate_record(NULL::{}, e.value - 'geom') AS r",
            target
        )
    } else {
        format!("jsonb_populate_recordset(NULL::{}, $1) AS r", target)
    };

    if targets.is_empty() {
        return format!("INSERT INTO {}\nSELECT FROM {}", target, source);
    }
    format!(
        "INSERT INTO {} ({})\nSELECT {}\nFROM {}",
        target,
        targets.join(", "),
        values.join(", "),
        source
    )
}

#[async_trait]
impl FeatureStore for PostgisStore {
    async fn table_exists(&self, table: &TableName) -> LoadResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = $1 AND table_name = $2)",
        )
        .bind(&table.schema)
        .bind(&table.table)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LoadError::database(table.to_string(), e))?;

        Ok(exists)
    }

    async fn list_columns(&self, table: &TableName) -> LoadResult<Vec<String>> {
        sqlx::query_scalar(
            "SELECT column_name::text FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 \
             ORDER BY ordinal_position",
        )
        .bind(&table.schema)
        .bind(&table.table)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LoadError::database(table.to_string(), e))
    }

    #[instrument(skip(self, spec), fields(table = %spec.name))]
    async fn create_table(&self, spec: &TableSpec) -> LoadResult<()> {
        let table = spec.name.to_string();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| LoadError::database(&table, e))?;

        for statement in spec.create_statements() {
            debug!(sql = %statement, "Executing DDL");
            sqlx::query(&statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| LoadError::database(&table, format!("DDL failed: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| LoadError::database(&table, e))?;

        info!(geometry = %spec.geometry, srid = spec.srid, "Created table");
        Ok(())
    }

    #[instrument(skip(self, rows), fields(table = %table, rows = rows.len()))]
    async fn append_rows(
        &self,
        table: &TableName,
        rows: &[FeatureRow],
        has_geometry: bool,
    ) -> LoadResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        if has_geometry && rows.iter().any(|r| !r.has_geometry()) {
            return Err(LoadError::database(
                table.to_string(),
                "spatial insert given a row without geometry",
            ));
        }

        let columns = self.list_columns(table).await?;
        let sql = insert_sql(table, &columns, has_geometry);
        let payload: Vec<Value> = if has_geometry {
            rows.iter().map(FeatureRow::to_json).collect()
        } else {
            rows.iter().map(|r| Value::Object(r.properties.clone())).collect()
        };

        let result = sqlx::query(&sql)
            .bind(Json(payload))
            .execute(&self.pool)
            .await
            .map_err(|e| LoadError::database(table.to_string(), format!("Insert failed: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn upsert_load_log(&self, table_id: &str, loaded_at: DateTime<Utc>) -> LoadResult<()> {
        self.execute(LOG_SCHEMA_SQL).await?;

        sqlx::query(
            r#"
            INSERT INTO bcdata.log (table_name, latest_download)
            VALUES ($1, $2)
            ON CONFLICT (table_name)
            DO UPDATE SET latest_download = EXCLUDED.latest_download
            "#,
        )
        .bind(table_id)
        .bind(loaded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| LoadError::database(LOG_TABLE, e))?;

        info!(table = table_id, loaded_at = %loaded_at, "Logged load time");
        Ok(())
    }

    async fn execute(&self, sql: &str) -> LoadResult<()> {
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| LoadError::database("sql", e))?;
        Ok(())
    }
}
