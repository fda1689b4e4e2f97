//! Shared helpers for unit tests.

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

/// Create a unique, per-test data directory to prevent interference between
/// tests, even when they run in parallel within the same process.
///
/// Strategy:
/// - Base: system temp dir
/// - Subdir: "kiosklock_tests/<tag>"
/// - Unique segment: high-resolution timestamp + thread ID
pub fn temp_data_dir(tag: &str) -> PathBuf {
    let mut base = std::env::temp_dir();
    base.push("kiosklock_tests");
    base.push(tag);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let tid = format!("{:?}", thread::current().id());
    base.push(format!("t_{nanos}_{tid}"));

    let _ = fs::create_dir_all(&base);
    base
}
