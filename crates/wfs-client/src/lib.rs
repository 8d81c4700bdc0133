//! Client side of chunked WFS replication.
//!
//! - [`FeatureService`] is the seam to the WFS; [`WfsClient`] implements it
//!   over HTTP.
//! - [`RequestPlanner`] turns a dataset and filter into request descriptors
//!   that cover the result set exactly once.
//! - [`Fetcher`] runs descriptors with bounded concurrency.
//! - [`DatasetResolver`] validates names against the cached feature type
//!   list and the [`Catalogue`].

pub mod catalogue;
pub mod client;
pub mod export;
pub mod fetch;
pub mod names;
pub mod parse;
pub mod planner;
pub mod service;

pub use catalogue::{BcdcCatalogue, Catalogue, DEFAULT_CATALOGUE_URL};
pub use client::{WfsClient, WfsConfig, DEFAULT_WFS_URL};
pub use export::{get_count, get_data, get_features};
pub use fetch::{Fetcher, DEFAULT_CONCURRENCY};
pub use names::{DatasetResolver, TableListCache};
pub use planner::{
    chunk_windows, select_sort_key, PlanOptions, RequestPlan, RequestPlanner, DEFAULT_PAGE_SIZE,
};
pub use service::FeatureService;
