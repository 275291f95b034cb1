//! Common test utilities for integration tests
//!
//! Provides shared fixtures and helpers used across multiple integration
//! test files.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use bearings::infrastructure::CatalogLoader;
use bearings::Catalog;

/// Catalog used by the scenario tests. `6200-2RS` carries its ID down from
/// the row above.
pub const SAMPLE_CATALOG: &str = "\
Name,ID,OD,Width,Radius
608,8,22,7,0.3
6200,10,30,9,0.6
6200-2RS,,30,9,0.6
6205,25,52,15,1
";

/// Create a temporary directory for test isolation
///
/// Returns a TempDir that will be cleaned up when dropped.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write `contents` as `bearings-data.csv` inside `dir`.
pub fn write_catalog(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("bearings-data.csv");
    std::fs::write(&path, contents).expect("Failed to write catalog");
    path
}

#[allow(dead_code)]
pub fn sample_catalog() -> Catalog {
    CatalogLoader::parse_str(SAMPLE_CATALOG).expect("Sample catalog should parse")
}

/// Files directly inside `dir`, sorted by name.
#[allow(dead_code)]
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to read dir")
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Read a JSON artifact written by the simulated engine.
#[allow(dead_code)]
pub fn read_json(path: &Path) -> serde_json::Value {
    let raw = std::fs::read_to_string(path).expect("Failed to read artifact");
    serde_json::from_str(&raw).expect("Artifact should be JSON")
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
