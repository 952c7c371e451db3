use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::Error as ReqwestError;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Failure categories tracked while a run executes.
///
/// Each variant represents one way a comparison cell can degrade. Counts
/// are summarized to the log at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum ErrorType {
    /// A cell's resolved URL was empty or unparseable.
    InvalidUrl,
    /// A fetch exhausted its retries on transport failures.
    TransportFailure,
    /// The diff stage could not run because a side had no body.
    ComparisonSkipped,
    /// A cell task failed outright (panic or runtime error).
    CellFailure,
    /// An endpoint key did not resolve for the job's platform.
    EndpointSkipped,
}

impl ErrorType {
    /// Human-readable label used in the end-of-run summary.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::InvalidUrl => "Invalid URL",
            ErrorType::TransportFailure => "Transport failure",
            ErrorType::ComparisonSkipped => "Comparison skipped",
            ErrorType::CellFailure => "Cell failure",
            ErrorType::EndpointSkipped => "Endpoint skipped",
        }
    }
}

/// Thread-safe failure counters, shared across all of a run's cells.
///
/// All error types are initialized to zero on creation, so `increment`
/// and `get_count` never allocate.
pub struct ErrorStats {
    errors: HashMap<ErrorType, AtomicUsize>,
}

impl ErrorStats {
    /// A tracker with every counter at zero.
    pub fn new() -> Self {
        let mut errors = HashMap::new();
        for error in ErrorType::iter() {
            errors.insert(error, AtomicUsize::new(0));
        }
        ErrorStats { errors }
    }

    /// Bumps the counter for one failure category.
    pub fn increment(&self, error: ErrorType) {
        // All ErrorType variants are initialized in new(), so the lookup
        // cannot miss.
        if let Some(counter) = self.errors.get(&error) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Current count for one failure category.
    pub fn get_count(&self, error: ErrorType) -> usize {
        self.errors
            .get(&error)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Writes non-zero counters to the log.
    pub fn log_summary(&self) {
        let mut any = false;
        for error in ErrorType::iter() {
            let count = self.get_count(error);
            if count > 0 {
                any = true;
                log::info!("{}: {}", error.as_str(), count);
            }
        }
        if !any {
            log::info!("No failures recorded");
        }
    }
}

impl Default for ErrorStats {
    fn default() -> Self {
        ErrorStats::new()
    }
}
