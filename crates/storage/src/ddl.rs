//! Target table definitions and the DDL that provisions them.

use wfs_common::{ColumnDefinition, GeometryShape, LoadError, LoadResult, TableDefinition};

use crate::rows::TableName;

/// Name of the geometry column in every target table.
pub const GEOMETRY_COLUMN: &str = "geom";

/// A non-geometry column of a target table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: String,
    pub comment: Option<String>,
}

/// Everything needed to create a target table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub name: TableName,
    pub columns: Vec<ColumnSpec>,
    pub primary_key: Option<String>,
    /// Storage (multi-part) shape of the geometry column
    pub geometry: GeometryShape,
    pub srid: u32,
    pub comment: Option<String>,
}

impl TableSpec {
    /// Build a table from catalogue metadata.
    ///
    /// Source geometry columns are dropped in favour of [`GEOMETRY_COLUMN`],
    /// whose shape is promoted to multi-part. The primary key must name a
    /// catalogue column.
    pub fn from_definition(
        name: TableName,
        definition: &TableDefinition,
        shape: GeometryShape,
        srid: u32,
        primary_key: Option<&str>,
    ) -> LoadResult<Self> {
        let columns: Vec<ColumnSpec> = definition
            .schema
            .iter()
            .filter(|c| !c.is_geometry())
            .map(|c| ColumnSpec {
                name: c.column_name.to_lowercase(),
                sql_type: pg_type(c),
                comment: c.column_comments.clone().filter(|s| !s.trim().is_empty()),
            })
            .collect();

        let primary_key = match primary_key {
            Some(key) => {
                let key = key.to_lowercase();
                if !columns.iter().any(|c| c.name == key) {
                    return Err(LoadError::InvalidPrimaryKey {
                        dataset: name.to_string(),
                        column: key,
                    });
                }
                Some(key)
            }
            None => None,
        };

        Ok(Self {
            name,
            columns,
            primary_key,
            geometry: shape.storage_shape(),
            srid,
            comment: definition.comments.clone().filter(|s| !s.trim().is_empty()),
        })
    }

    /// All column names in table order, geometry last.
    pub fn column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.name.clone())
            .chain(std::iter::once(GEOMETRY_COLUMN.to_string()))
            .collect()
    }

    /// Statements that replace any existing table with this one.
    pub fn create_statements(&self) -> Vec<String> {
        let schema = quote_ident(&self.name.schema);
        let table = qualified(&self.name);

        let mut definitions: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut column = format!("{} {}", quote_ident(&c.name), c.sql_type);
                if self.primary_key.as_deref() == Some(c.name.as_str()) {
                    column.push_str(" PRIMARY KEY");
                }
                column
            })
            .collect();
        definitions.push(format!(
            "{} geometry({}, {})",
            quote_ident(GEOMETRY_COLUMN),
            self.geometry.postgis_type(),
            self.srid
        ));

        let mut statements = vec![
            format!("CREATE SCHEMA IF NOT EXISTS {}", schema),
            format!("DROP TABLE IF EXISTS {}", table),
            format!("CREATE TABLE {} (\n  {}\n)", table, definitions.join(",\n  ")),
        ];

        if let Some(comment) = &self.comment {
            statements.push(format!(
                "COMMENT ON TABLE {} IS {}",
                table,
                quote_literal(comment)
            ));
        }
        for column in &self.columns {
            if let Some(comment) = &column.comment {
                statements.push(format!(
                    "COMMENT ON COLUMN {}.{} IS {}",
                    table,
                    quote_ident(&column.name),
                    quote_literal(comment)
                ));
            }
        }

        statements
    }
}

/// PostgreSQL type for a catalogue (Oracle) column type.
pub fn pg_type(column: &ColumnDefinition) -> String {
    let data_type = column.data_type.trim().to_uppercase();
    match data_type.as_str() {
        "NUMBER" | "FLOAT" => "numeric".to_string(),
        "VARCHAR2" | "NVARCHAR2" | "VARCHAR" | "CHAR" | "NCHAR" => match column.data_precision {
            Some(n) if n > 0 => format!("varchar({})", n),
            _ => "text".to_string(),
        },
        "DATE" => "date".to_string(),
        "CLOB" | "NCLOB" | "LONG" => "text".to_string(),
        t if t.starts_with("TIMESTAMP") => "timestamptz".to_string(),
        _ => "text".to_string(),
    }
}

/// Double-quoted SQL identifier.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Single-quoted SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub(crate) fn qualified(name: &TableName) -> String {
    format!("{}.{}", quote_ident(&name.schema), quote_ident(&name.table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfs_common::GeometryKind;

    fn definition() -> TableDefinition {
        TableDefinition {
            schema: vec![
                ColumnDefinition::new("AIRPORT_ID", "NUMBER"),
                ColumnDefinition::new("NAME", "VARCHAR2").with_precision(100),
                ColumnDefinition::new("SHAPE", "SDO_GEOMETRY"),
                ColumnDefinition {
                    column_comments: Some("It's open".to_string()),
                    ..ColumnDefinition::new("OPENED", "DATE")
                },
            ],
            comments: Some("BC airports".to_string()),
        }
    }

    fn spec(primary_key: Option<&str>) -> LoadResult<TableSpec> {
        TableSpec::from_definition(
            TableName::new("whse_x", "airports"),
            &definition(),
            GeometryShape::new(GeometryKind::Point, false),
            3005,
            primary_key,
        )
    }

    #[test]
    fn test_pg_type_mapping() {
        assert_eq!(pg_type(&ColumnDefinition::new("A", "NUMBER")), "numeric");
        assert_eq!(
            pg_type(&ColumnDefinition::new("A", "VARCHAR2").with_precision(20)),
            "varchar(20)"
        );
        assert_eq!(pg_type(&ColumnDefinition::new("A", "VARCHAR2")), "text");
        assert_eq!(pg_type(&ColumnDefinition::new("A", "DATE")), "date");
        assert_eq!(
            pg_type(&ColumnDefinition::new("A", "TIMESTAMP(6)")),
            "timestamptz"
        );
        assert_eq!(pg_type(&ColumnDefinition::new("A", "CLOB")), "text");
        assert_eq!(pg_type(&ColumnDefinition::new("A", "RAW")), "text");
    }

    #[test]
    fn test_spec_drops_source_geometry() {
        let spec = spec(None).unwrap();
        assert_eq!(
            spec.column_names(),
            vec!["airport_id", "name", "opened", "geom"]
        );
        assert_eq!(spec.geometry.kind, GeometryKind::MultiPoint);
    }

    #[test]
    fn test_unknown_primary_key() {
        let err = spec(Some("nope")).unwrap_err();
        assert!(matches!(err, LoadError::InvalidPrimaryKey { column, .. } if column == "nope"));
    }

    #[test]
    fn test_create_statements() {
        let statements = spec(Some("AIRPORT_ID")).unwrap().create_statements();

        assert_eq!(statements[0], r#"CREATE SCHEMA IF NOT EXISTS "whse_x""#);
        assert_eq!(statements[1], r#"DROP TABLE IF EXISTS "whse_x"."airports""#);
        assert!(statements[2].contains(r#""airport_id" numeric PRIMARY KEY"#));
        assert!(statements[2].contains(r#""name" varchar(100)"#));
        assert!(statements[2].contains(r#""geom" geometry(MULTIPOINT, 3005)"#));
        assert!(!statements[2].contains("shape"));
        assert_eq!(
            statements[3],
            r#"COMMENT ON TABLE "whse_x"."airports" IS 'BC airports'"#
        );
        assert_eq!(
            statements[4],
            r#"COMMENT ON COLUMN "whse_x"."airports"."opened" IS 'It''s open'"#
        );
    }
}
