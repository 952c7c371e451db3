//! Tunables and fixed operational constants.

use std::time::Duration;

// constants (used as defaults)

/// Default number of comparison cells in flight per job.
///
/// Lower default (5) keeps the paired fetches gentle on both API surfaces;
/// staging environments in particular tend to rate-limit aggressively.
pub const DEFAULT_CELL_CONCURRENCY: usize = 5;

/// Per-request HTTP timeout.
///
/// Enforced independently for every attempt, including retries.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

// Retry strategy
/// Default number of fetch attempts per side (first attempt included).
pub const DEFAULT_FETCH_RETRIES: u32 = 3;
/// Fixed delay in milliseconds between fetch attempts. No backoff.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

// Array element matching
/// Similarity at or above which two array elements are considered the same
/// item (recursed into only when not an exact match).
pub const SIMILARITY_MATCH_THRESHOLD: f64 = 0.95;
/// Similarity at or above which two array elements are treated as the same
/// logical item with substantial edits; below this they are an unrelated
/// remove/add pair.
pub const SIMILARITY_PARTIAL_THRESHOLD: f64 = 0.7;

/// Maximum recursion depth for the scorer and the differencer.
///
/// Structures nested beyond this bound fail closed: the scorer returns a
/// non-match and the differencer emits a type-changed diff instead of
/// recursing further.
pub const MAX_STRUCTURE_DEPTH: usize = 64;

/// Error message recorded on a cell whose resolved URL is empty or unparseable.
pub const INVALID_URL_ERROR: &str = "Invalid URL";

// Severity classification
// A diff's severity is derived from its dot-joined path with a substring
// scan, first match wins. Lists are checked in order: high before medium.

/// Path markers that elevate a diff to high severity.
pub const HIGH_SEVERITY_MARKERS: &[&str] = &["id", "status", "state", "error", "success", "data."];

/// Path markers that elevate a diff to medium severity.
pub const MEDIUM_SEVERITY_MARKERS: &[&str] =
    &["timestamp", "count", "total", "meta", "time", "date"];

// Reporting
/// Offset of the fixed report timezone (IST, UTC+05:30) in seconds.
///
/// Report timestamps are always rendered in this zone regardless of where
/// the run executes, so reports from different hosts line up.
pub const REPORT_TZ_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Timestamp format used on generated reports.
pub const REPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";
