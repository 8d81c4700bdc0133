//! Path utilities for tests that touch the filesystem.

use std::path::PathBuf;

/// Returns the workspace root directory.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Creates a temporary directory, removed when the returned `TempDir` drops.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("bcdata_test_")
        .tempdir()
        .expect("Failed to create temporary test directory")
}

/// Path for a table list cache file inside `dir`. The file is not created.
pub fn cache_file_in(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("bcdata_cache.json")
}
