//! DataBC WFS command line tool.
//!
//! Lists, describes and downloads DataBC WFS layers, and replicates them
//! into PostGIS with:
//! - Paged requests fetched concurrently
//! - Geometry type detection for new tables
//! - Automatic retry of the whole load with exponential backoff
//! - Load times recorded in `bcdata.log`

mod commands;
mod config;
mod retry;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use wfs_common::{Crs, GeometryShape};

use commands::JsonStyle;
use config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "bcdata")]
#[command(about = "Download and replicate DataBC WFS layers")]
struct Cli {
    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List DataBC layers available via WFS
    List {
        /// Refresh the cached list
        #[arg(short, long)]
        refresh: bool,
    },

    /// Print basic metadata about a layer as JSON
    Info {
        dataset: String,

        /// Print only the feature count
        #[arg(long, conflicts_with = "name")]
        count: bool,

        /// Print only the resolved layer name
        #[arg(long)]
        name: bool,

        /// Indentation level for JSON output
        #[arg(long)]
        indent: Option<usize>,

        /// Write JSON without any whitespace
        #[arg(long, conflicts_with = "indent")]
        compact: bool,
    },

    /// Write a layer to a file or stdout as a GeoJSON FeatureCollection
    Dump {
        dataset: String,

        #[command(flatten)]
        query: QueryArgs,

        /// Output file
        #[arg(short, long)]
        out_file: Option<PathBuf>,
    },

    /// Write features to stdout as GeoJSON feature objects, one per line
    Cat {
        dataset: String,

        #[command(flatten)]
        query: QueryArgs,

        /// Max number of records per request
        #[arg(short, long)]
        pagesize: Option<u64>,

        /// Name of sort field
        #[arg(short, long)]
        sortby: Option<String>,

        /// Indentation level for JSON output
        #[arg(long)]
        indent: Option<usize>,

        /// Write JSON without any whitespace
        #[arg(long, conflicts_with = "indent")]
        compact: bool,
    },

    /// Replicate a layer into a PostGIS table
    Bc2pg(LoadArgs),
}

/// Filtering options shared by the download commands.
#[derive(Args, Debug, Clone)]
struct QueryArgs {
    /// A valid CQL or ECQL query
    #[arg(long)]
    query: Option<String>,

    /// Bounds: "xmin ymin xmax ymax" or "[xmin, ymin, xmax, ymax]"
    #[arg(long, num_args = 1..=4, allow_hyphen_values = true)]
    bounds: Vec<String>,

    /// CRS of the bounds
    #[arg(long, default_value = "EPSG:3005")]
    bounds_crs: Crs,

    /// CRS of the output features
    #[arg(long, default_value = "EPSG:4326")]
    dst_crs: Crs,
}

#[derive(Args, Debug, Clone)]
struct LoadArgs {
    dataset: String,

    /// Target database URL
    #[arg(long, env = "DATABASE_URL")]
    db_url: Option<String>,

    /// Target table name (default: source table name)
    #[arg(long)]
    table: Option<String>,

    /// Target schema name (default: source schema name)
    #[arg(long)]
    schema: Option<String>,

    /// Geometry type of the new table, e.g. POLYGON or MULTILINESTRINGZ
    #[arg(long)]
    geometry_type: Option<GeometryShape>,

    /// A valid CQL or ECQL query
    #[arg(long)]
    query: Option<String>,

    /// Bounds in EPSG:3005: "xmin ymin xmax ymax" or "[xmin, ymin, xmax, ymax]"
    #[arg(long, num_args = 1..=4, allow_hyphen_values = true)]
    bounds: Vec<String>,

    /// Maximum number of features to load
    #[arg(long)]
    count: Option<u64>,

    /// Name of sort field
    #[arg(long)]
    sortby: Option<String>,

    /// Primary key of the new table
    #[arg(long)]
    primary_key: Option<String>,

    /// Max number of records per request
    #[arg(short, long)]
    pagesize: Option<u64>,

    /// Number of requests in flight at once
    #[arg(long)]
    max_workers: Option<usize>,

    /// Do not record the load in bcdata.log
    #[arg(long)]
    no_timestamp: bool,

    /// Create the table but do not load any data
    #[arg(long)]
    schema_only: bool,

    /// Append to an existing table
    #[arg(long)]
    append: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing on stderr so stdout stays clean for data
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);
    if cli.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let config = AppConfig::from_env();
    let app = commands::App::new(config)?;

    match cli.command {
        Command::List { refresh } => app.list(refresh).await,
        Command::Info {
            dataset,
            count,
            name,
            indent,
            compact,
        } => {
            app.info(&dataset, count, name, JsonStyle::new(indent, compact))
                .await
        }
        Command::Dump {
            dataset,
            query,
            out_file,
        } => app.dump(&dataset, &query.into(), out_file).await,
        Command::Cat {
            dataset,
            query,
            pagesize,
            sortby,
            indent,
            compact,
        } => {
            let mut query: commands::Query = query.into();
            query.page_size = pagesize;
            query.sort_by = sortby;
            app.cat(&dataset, &query, JsonStyle::new(indent, compact))
                .await
        }
        Command::Bc2pg(args) => app.bc2pg(args.into()).await,
    }
}

impl From<QueryArgs> for commands::Query {
    fn from(args: QueryArgs) -> Self {
        commands::Query {
            filter: args.query,
            bounds: args.bounds,
            bounds_crs: args.bounds_crs,
            dst_crs: args.dst_crs,
            page_size: None,
            sort_by: None,
        }
    }
}

impl From<LoadArgs> for commands::LoadRequest {
    fn from(args: LoadArgs) -> Self {
        commands::LoadRequest {
            dataset: args.dataset,
            db_url: args.db_url,
            table: args.table,
            schema: args.schema,
            geometry_type: args.geometry_type,
            query: args.query,
            bounds: args.bounds,
            count: args.count,
            sortby: args.sortby,
            primary_key: args.primary_key,
            pagesize: args.pagesize,
            max_workers: args.max_workers,
            timestamp: !args.no_timestamp,
            schema_only: args.schema_only,
            append: args.append,
        }
    }
}
