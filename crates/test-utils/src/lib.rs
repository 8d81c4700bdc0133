//! Shared test utilities for the bcdata workspace.
//!
//! This crate provides common testing infrastructure including:
//! - WFS response and feature fixtures
//! - Feature generators
//! - In-memory [`FeatureService`](wfs_client::FeatureService),
//!   [`Catalogue`](wfs_client::Catalogue) and
//!   [`FeatureStore`](storage::FeatureStore) implementations
//! - Temporary path helpers
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Crates that `test-utils` itself depends on must only use it from their
//! `tests/` directory, never from `#[cfg(test)]` modules.

pub mod fixtures;
pub mod generators;
pub mod mocks;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use mocks::*;
pub use paths::*;
