//! Job fan-out and bounded-concurrency execution.
//!
//! A job expands into the cross product of its geos, endpoint pairs and ID
//! values; each combination is one comparison cell. Cells run as spawned
//! tasks behind a semaphore so at most N are in flight per job, and every
//! cell folds its own failures into its record — nothing a cell does can
//! abort its siblings or the job.

mod cell;
mod expand;

use std::sync::Arc;
use std::time::Instant;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{info, warn};

use crate::error_handling::{ErrorStats, ErrorType};
use crate::fetch::{HttpTransport, ResponseCache, RetryingFetcher};
use crate::initialization::init_semaphore;
use crate::models::{JobConfig, RunInput};
use crate::report::{endpoint_views, ComparisonRecord, JobResult, JobSummary};

use cell::{failed_cell_record, run_cell, CellContext};

/// Executes one job end to end and returns its result.
///
/// Configuration problems shrink the job (skipped pairs, warnings) rather
/// than failing it; a job whose every pair is unresolved still returns a
/// zero-comparison result.
pub async fn run_job(
    job: &JobConfig,
    input: &RunInput,
    transport: Arc<dyn HttpTransport>,
    stats: Arc<ErrorStats>,
) -> JobResult {
    let started = Instant::now();
    let template = input.headers.get(&job.platform).cloned().unwrap_or_default();
    let (cells, warnings) = expand::build_cells(job, &template, &input.catalog, &input.ids, &stats);

    info!(
        "Job {}: {} comparison cells on platform {} (concurrency {})",
        job.name,
        cells.len(),
        job.platform,
        input.cell_concurrency
    );

    let semaphore = init_semaphore(input.cell_concurrency);
    let fetcher = RetryingFetcher::new(transport, job.retry_policy.clone());
    let cache = Arc::new(ResponseCache::new());
    let ctx = Arc::new(CellContext::new(job, fetcher, cache, Arc::clone(&stats)));

    let mut tasks = FuturesUnordered::new();
    for cell in cells {
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Job {}: semaphore closed, cell skipped", job.name);
                continue;
            }
        };

        let ctx = Arc::clone(&ctx);
        let stats = Arc::clone(&stats);
        let job_name = job.name.clone();
        let platform = job.platform.clone();
        // Enough of the cell survives outside the task to build an error
        // record if the task itself dies.
        let fallback = cell.clone();

        let handle = tokio::spawn(async move {
            let _permit = permit;
            let index = cell.index;
            (index, run_cell(cell, ctx).await)
        });

        tasks.push(async move {
            match handle.await {
                Ok(indexed) => indexed,
                Err(join_error) => {
                    warn!("Job {job_name}: cell task failed: {join_error:?}");
                    stats.increment(ErrorType::CellFailure);
                    let record = failed_cell_record(
                        &fallback,
                        &job_name,
                        &platform,
                        format!("cell task failed: {join_error}"),
                    );
                    (fallback.index, record)
                }
            }
        });
    }

    let mut indexed: Vec<(usize, ComparisonRecord)> = Vec::new();
    while let Some(result) = tasks.next().await {
        indexed.push(result);
    }
    // Completion order is arbitrary; the report keeps generation order.
    indexed.sort_by_key(|(index, _)| *index);
    let records: Vec<ComparisonRecord> = indexed.into_iter().map(|(_, record)| record).collect();

    let endpoints = endpoint_views(&records);
    let successful = records.iter().filter(|r| r.success).count() as u32;
    let summary = JobSummary {
        total: records.len() as u32,
        successful,
        failed: records.len() as u32 - successful,
        endpoints_with_diffs: endpoints.iter().filter(|v| v.diff_total > 0).count() as u32,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        "Job {} finished: {}/{} comparisons succeeded, {} endpoint pair(s) with diffs",
        job.name, summary.successful, summary.total, summary.endpoints_with_diffs
    );

    JobResult {
        job: job.name.clone(),
        platform: job.platform.clone(),
        summary,
        endpoints,
        records,
        warnings,
    }
}
