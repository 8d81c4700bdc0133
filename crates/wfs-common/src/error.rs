//! Error types for chunked WFS replication.

use thiserror::Error;

/// Result type alias using LoadError.
pub type LoadResult<T> = Result<T, LoadError>;

/// Every failure that can end a dataset load.
///
/// All variants are fatal to the load in progress. Only `Upstream` is worth
/// retrying, and then only around a whole load.
#[derive(Debug, Error)]
pub enum LoadError {
    // === Validation Errors ===
    #[error("Dataset not found via WFS or catalogue: {0}")]
    UnknownDataset(String),

    #[error("Invalid dataset name '{0}': expected SCHEMA.TABLE")]
    InvalidDatasetName(String),

    #[error("{0} does not exist, nothing to append to")]
    TargetMissing(String),

    #[error("Cannot create table for {0}, schema details not found via catalogue")]
    SchemaUnavailable(String),

    #[error("Column {column} specified as primary key does not exist in {dataset}")]
    InvalidPrimaryKey { dataset: String, column: String },

    #[error("Specified sortby column {column} is not present in {table}")]
    InvalidSortColumn { table: String, column: String },

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    // === Geometry Errors ===
    #[error("Could not determine geometry type of {0}, no features with geometry were found")]
    UnknownGeometryShape(String),

    #[error("Geometry type {geometry_type} of {dataset} is not supported")]
    UnsupportedGeometryType {
        dataset: String,
        geometry_type: String,
    },

    // === Upstream Errors ===
    #[error("WFS request failed ({request}): {message}")]
    Upstream {
        request: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Failed to parse response ({context}): {message}")]
    Parse { context: String, message: String },

    // === Storage Errors ===
    #[error("Database error on {table}: {message}")]
    Database { table: String, message: String },

    #[error("Table list cache error: {0}")]
    Cache(String),
}

impl LoadError {
    pub fn upstream(request: impl Into<String>, status: Option<u16>, message: impl ToString) -> Self {
        LoadError::Upstream {
            request: request.into(),
            status,
            message: message.to_string(),
        }
    }

    pub fn parse(context: impl Into<String>, message: impl ToString) -> Self {
        LoadError::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    pub fn database(table: impl Into<String>, message: impl ToString) -> Self {
        LoadError::Database {
            table: table.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        LoadError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Whether re-running the whole load could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LoadError::Upstream { .. })
    }

    /// HTTP status of a failed upstream request, if one was received.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            LoadError::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        LoadError::Cache(err.to_string())
    }
}
