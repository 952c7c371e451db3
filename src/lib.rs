//! api_parity library: structural comparison of two HTTP API surfaces.
//!
//! This library fans a comparison job out over a matrix of endpoint pairs,
//! geographic header variants and entity IDs, fetches both sides of every
//! combination with bounded concurrency and retries, and reduces the
//! responses into a structured diff report with per-difference severity.
//!
//! # Example
//!
//! ```no_run
//! use api_parity::{run_comparison, RunInput};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let input: RunInput = serde_json::from_value(serde_json::json!({
//!     "jobs": [{
//!         "name": "prod vs staging",
//!         "platform": "android",
//!         "baseUrlA": "https://api.example.com",
//!         "baseUrlB": "https://staging.example.com",
//!         "endpointPairs": ["cart"]
//!     }],
//!     "catalog": [{
//!         "key": "cart",
//!         "platforms": ["android"],
//!         "pathA": "/v1/cart",
//!         "pathB": "/v1/cart"
//!     }]
//! }))?;
//!
//! let report = run_comparison(input).await?;
//! println!(
//!     "Compared {} cells: {} succeeded, {} with diffs",
//!     report.summary.total_comparisons,
//!     report.summary.successful,
//!     report.summary.comparisons_with_diffs
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

#![warn(missing_docs)]

pub mod aggregate;
pub mod config;
pub mod diff;
mod error_handling;
pub mod fetch;
pub mod initialization;
mod models;
mod report;
mod scheduler;
pub mod similarity;

// Re-export public API
pub use aggregate::{filter_and_summarize, DiffCounts, IgnoreSet};
pub use diff::{classify_severity, Diff, Differencer, DiffKind, PathSegment, Severity};
pub use error_handling::{ErrorStats, ErrorType, InitializationError};
pub use fetch::{
    HttpTransport, ReqwestTransport, ResponseCache, RetryingFetcher, TransportError,
    TransportRequest, TransportResponse,
};
pub use models::{
    EndpointEntry, FetchOutcome, HeaderTemplate, HeaderValue, IdValue, JobConfig, PairSpec,
    RetryPolicy, RunInput,
};
pub use report::{
    ComparisonRecord, EndpointView, JobResult, JobSummary, Report, RunSummary,
};
pub use run::{run_comparison, run_comparison_with};
pub use scheduler::run_job;
pub use similarity::score;

// Internal run module (ties the scheduler and aggregator together)
mod run {
    use std::sync::Arc;
    use std::time::Instant;

    use anyhow::{Context, Result};
    use log::info;

    use crate::error_handling::ErrorStats;
    use crate::fetch::{HttpTransport, ReqwestTransport};
    use crate::initialization::init_client;
    use crate::models::RunInput;
    use crate::report::{aggregate, Report};
    use crate::scheduler::run_job;

    /// Runs a full comparison with the production HTTP transport.
    ///
    /// This is the main entry point for the library. It builds the shared
    /// HTTP client, executes every job, and merges the results into one
    /// report.
    ///
    /// # Errors
    ///
    /// Returns an error only if the HTTP client cannot be initialized.
    /// Fetch, configuration and comparison failures are carried as data
    /// inside the report, never as errors from this function.
    pub async fn run_comparison(input: RunInput) -> Result<Report> {
        let client = init_client().context("Failed to initialize HTTP client")?;
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(client));
        Ok(run_comparison_with(input, transport).await)
    }

    /// Runs a full comparison over a caller-provided transport.
    ///
    /// Used by embedders that tunnel requests (proxies, recorded fixtures)
    /// and by tests that need an instrumented transport. Jobs execute
    /// concurrently; each job bounds its own cells but there is no shared
    /// limiter across jobs.
    pub async fn run_comparison_with(input: RunInput, transport: Arc<dyn HttpTransport>) -> Report {
        let started = Instant::now();
        let stats = Arc::new(ErrorStats::new());
        info!("Starting comparison run: {} job(s)", input.jobs.len());

        let job_futures = input
            .jobs
            .iter()
            .map(|job| run_job(job, &input, Arc::clone(&transport), Arc::clone(&stats)));
        let results = futures::future::join_all(job_futures).await;

        stats.log_summary();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!("Comparison run finished in {elapsed_ms}ms");
        aggregate(results, &input.headers, elapsed_ms)
    }
}
