//! Execution of a single comparison cell.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::aggregate::{filter_and_summarize, DiffCounts, IgnoreSet};
use crate::config::INVALID_URL_ERROR;
use crate::diff::Differencer;
use crate::error_handling::{ErrorStats, ErrorType};
use crate::fetch::{ResponseCache, RetryingFetcher};
use crate::models::{FetchOutcome, IdValue, JobConfig};
use crate::report::ComparisonRecord;

use super::expand::ComparisonCell;

/// Everything a cell task needs, shared across one job's cells.
pub(crate) struct CellContext {
    pub job_name: String,
    pub platform: String,
    pub base_url_a: String,
    pub base_url_b: String,
    pub fetcher: RetryingFetcher,
    pub cache: Arc<ResponseCache>,
    pub ignore: IgnoreSet,
    pub differ: Differencer,
    pub stats: Arc<ErrorStats>,
}

impl CellContext {
    pub(crate) fn new(
        job: &JobConfig,
        fetcher: RetryingFetcher,
        cache: Arc<ResponseCache>,
        stats: Arc<ErrorStats>,
    ) -> Self {
        CellContext {
            job_name: job.name.clone(),
            platform: job.platform.clone(),
            base_url_a: job.base_url_a.clone(),
            base_url_b: job.base_url_b.clone(),
            fetcher,
            cache,
            ignore: IgnoreSet::new(&job.ignore_paths),
            differ: Differencer::new().order_sensitive(job.order_sensitive),
            stats,
        }
    }
}

/// Substitutes the ID value into a path template and joins it to the base
/// URL. Returns `None` when the result is empty or unparseable.
fn build_url(
    base: &str,
    path_template: &str,
    id_category: Option<&str>,
    id: Option<&IdValue>,
) -> Option<String> {
    if base.is_empty() || path_template.is_empty() {
        return None;
    }
    let mut path = path_template.to_string();
    if let (Some(category), Some(id)) = (id_category, id) {
        path = path.replace(&format!("{{{category}}}"), &id.value);
    }
    let full = format!("{}{}", base.trim_end_matches('/'), path);
    Url::parse(&full).ok().map(|_| full)
}

/// Fetches one side, going through the per-job cache first.
async fn fetch_cached(ctx: &CellContext, url: &str, headers: &BTreeMap<String, String>) -> FetchOutcome {
    let key = ResponseCache::key(url, headers);
    if let Some(hit) = ctx.cache.get(&key) {
        log::debug!("Cache hit for {url}");
        return hit;
    }
    let outcome = ctx.fetcher.fetch(url, headers).await;
    if outcome.success {
        ctx.cache.put(key, &outcome);
    } else {
        ctx.stats.increment(ErrorType::TransportFailure);
    }
    outcome
}

/// Runs one cell to completion: build URLs, fetch both sides, diff.
///
/// Never fails; every degradation folds into the returned record.
pub(crate) async fn run_cell(cell: ComparisonCell, ctx: Arc<CellContext>) -> ComparisonRecord {
    let entry_a = &cell.pair.entry_a;
    let entry_b = &cell.pair.entry_b;
    let category = entry_a
        .id_category
        .as_deref()
        .or(entry_b.id_category.as_deref());

    let base_a = entry_a.base_url_a.as_deref().unwrap_or(&ctx.base_url_a);
    let base_b = entry_b.base_url_b.as_deref().unwrap_or(&ctx.base_url_b);
    let url_a = build_url(base_a, &entry_a.path_a, category, cell.id.as_ref());
    let url_b = build_url(base_b, &entry_b.path_b, category, cell.id.as_ref());

    let (Some(url_a), Some(url_b)) = (url_a, url_b) else {
        // Short-circuit: no network call for a cell that cannot name both
        // sides.
        ctx.stats.increment(ErrorType::InvalidUrl);
        log::warn!(
            "Job {}: invalid URL for pair {}|{}, cell skipped",
            ctx.job_name,
            entry_a.key,
            entry_b.key
        );
        return invalid_url_record(&cell, &ctx);
    };

    let (response_a, response_b) = tokio::join!(
        fetch_cached(&ctx, &url_a, &cell.headers),
        fetch_cached(&ctx, &url_b, &cell.headers),
    );

    let success = response_a.success && response_b.success;
    let (diffs, counts, error) = if success {
        let lhs = response_a.data.clone().unwrap_or(Value::Null);
        let rhs = response_b.data.clone().unwrap_or(Value::Null);
        let (diffs, counts) = filter_and_summarize(ctx.differ.diff(&lhs, &rhs), &ctx.ignore);
        (diffs, counts, None)
    } else {
        ctx.stats.increment(ErrorType::ComparisonSkipped);
        let side = if response_a.success { "B" } else { "A" };
        (
            Vec::new(),
            DiffCounts::default(),
            Some(format!("side {side} fetch failed")),
        )
    };

    ComparisonRecord {
        job: ctx.job_name.clone(),
        platform: ctx.platform.clone(),
        endpoint_a: entry_a.key.clone(),
        endpoint_b: entry_b.key.clone(),
        url_a,
        url_b,
        geo: cell.geo,
        id: cell.id,
        response_a,
        response_b,
        diffs,
        counts,
        success,
        error,
    }
}

/// The error record for a cell whose URL(s) did not resolve.
fn invalid_url_record(cell: &ComparisonCell, ctx: &CellContext) -> ComparisonRecord {
    ComparisonRecord {
        job: ctx.job_name.clone(),
        platform: ctx.platform.clone(),
        endpoint_a: cell.pair.entry_a.key.clone(),
        endpoint_b: cell.pair.entry_b.key.clone(),
        url_a: String::new(),
        url_b: String::new(),
        geo: cell.geo.clone(),
        id: cell.id.clone(),
        response_a: FetchOutcome::failed(INVALID_URL_ERROR, 0),
        response_b: FetchOutcome::failed(INVALID_URL_ERROR, 0),
        diffs: Vec::new(),
        counts: DiffCounts::default(),
        success: false,
        error: Some(INVALID_URL_ERROR.to_string()),
    }
}

/// The error record for a cell whose task failed outright.
pub(crate) fn failed_cell_record(
    cell: &ComparisonCell,
    job_name: &str,
    platform: &str,
    error: String,
) -> ComparisonRecord {
    ComparisonRecord {
        job: job_name.to_string(),
        platform: platform.to_string(),
        endpoint_a: cell.pair.entry_a.key.clone(),
        endpoint_b: cell.pair.entry_b.key.clone(),
        url_a: String::new(),
        url_b: String::new(),
        geo: cell.geo.clone(),
        id: cell.id.clone(),
        response_a: FetchOutcome::failed(error.clone(), 0),
        response_b: FetchOutcome::failed(error.clone(), 0),
        diffs: Vec::new(),
        counts: DiffCounts::default(),
        success: false,
        error: Some(error),
    }
}
