//! Comparison records, job results and run-level report aggregation.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::DiffCounts;
use crate::config::{REPORT_TIMESTAMP_FORMAT, REPORT_TZ_OFFSET_SECS};
use crate::diff::Diff;
use crate::models::{FetchOutcome, HeaderTemplate, IdValue};

/// Outcome of one comparison cell. Produced exactly once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRecord {
    /// Name of the job that produced this record.
    pub job: String,
    /// Platform the job targeted.
    pub platform: String,
    /// Catalog key compared on side A.
    pub endpoint_a: String,
    /// Catalog key compared on side B.
    pub endpoint_b: String,
    /// Resolved side-A URL (empty when URL building failed).
    pub url_a: String,
    /// Resolved side-B URL (empty when URL building failed).
    pub url_b: String,
    /// Geo header value this cell ran with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<String>,
    /// ID value substituted into the path templates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<IdValue>,
    /// Side-A fetch outcome.
    pub response_a: FetchOutcome,
    /// Side-B fetch outcome.
    pub response_b: FetchOutcome,
    /// Structural differences, after ignore filtering.
    pub diffs: Vec<Diff>,
    /// Diff totals for this cell.
    pub counts: DiffCounts,
    /// Whether both sides produced comparable responses.
    pub success: bool,
    /// Why the cell degraded, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Flattened rollup of one endpoint pair inside a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointView {
    /// Catalog key compared on side A.
    pub endpoint_a: String,
    /// Catalog key compared on side B.
    pub endpoint_b: String,
    /// Cells executed for this pair.
    pub comparisons: u32,
    /// Cells that failed to produce a comparison.
    pub failed: u32,
    /// Diffs across all of the pair's cells.
    pub diff_total: u32,
    /// Critical diffs across all of the pair's cells.
    pub critical: u32,
    /// True when every successful cell was identical.
    pub identical: bool,
}

/// Totals for one job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    /// Comparison cells executed.
    pub total: u32,
    /// Cells where both sides responded and the diff ran.
    pub successful: u32,
    /// Cells that degraded into an error record.
    pub failed: u32,
    /// Endpoint pairs with at least one diff.
    pub endpoints_with_diffs: u32,
    /// Wall-clock job duration.
    pub elapsed_ms: u64,
}

/// Everything one job produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    /// Job name.
    pub job: String,
    /// Platform the job targeted.
    pub platform: String,
    /// Job totals.
    pub summary: JobSummary,
    /// Per-endpoint rollups, in first-seen order.
    pub endpoints: Vec<EndpointView>,
    /// Every comparison record, in cell-generation order.
    pub records: Vec<ComparisonRecord>,
    /// Configuration problems encountered while expanding the job.
    pub warnings: Vec<String>,
}

/// Run-level totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Jobs executed.
    pub jobs: u32,
    /// Comparison cells executed across all jobs.
    pub total_comparisons: u32,
    /// Cells that produced a comparison.
    pub successful: u32,
    /// Cells that degraded into an error record.
    pub failed: u32,
    /// Cells with at least one surviving diff.
    pub comparisons_with_diffs: u32,
    /// Wall-clock run duration.
    pub elapsed_ms: u64,
}

/// The complete output of one comparison run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// When the report was generated, rendered in the fixed report zone.
    pub generated_at: String,
    /// Run totals.
    pub summary: RunSummary,
    /// Endpoint keys actually exercised, both sides.
    pub endpoints_run: BTreeSet<String>,
    /// Geo values actually exercised.
    pub geos_used: BTreeSet<String>,
    /// ID values actually exercised.
    pub ids_used: BTreeSet<String>,
    /// Header templates the run used, echoed for audit.
    pub headers: BTreeMap<String, HeaderTemplate>,
    /// Full per-job results, retained for drill-down.
    pub jobs: Vec<JobResult>,
}

/// Builds the per-endpoint rollup for one job's records.
pub fn endpoint_views(records: &[ComparisonRecord]) -> Vec<EndpointView> {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut views: BTreeMap<(String, String), EndpointView> = BTreeMap::new();
    for record in records {
        let key = (record.endpoint_a.clone(), record.endpoint_b.clone());
        let view = views.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            EndpointView {
                endpoint_a: record.endpoint_a.clone(),
                endpoint_b: record.endpoint_b.clone(),
                comparisons: 0,
                failed: 0,
                diff_total: 0,
                critical: 0,
                identical: true,
            }
        });
        view.comparisons += 1;
        if !record.success {
            view.failed += 1;
        }
        view.diff_total += record.counts.total;
        view.critical += record.counts.critical;
        if record.counts.total > 0 {
            view.identical = false;
        }
    }
    order
        .into_iter()
        .filter_map(|key| views.remove(&key))
        .collect()
}

/// Merges all job results for a run into one report.
pub fn aggregate(
    results: Vec<JobResult>,
    headers: &BTreeMap<String, HeaderTemplate>,
    elapsed_ms: u64,
) -> Report {
    let mut summary = RunSummary {
        jobs: results.len() as u32,
        elapsed_ms,
        ..RunSummary::default()
    };
    let mut endpoints_run = BTreeSet::new();
    let mut geos_used = BTreeSet::new();
    let mut ids_used = BTreeSet::new();

    for result in &results {
        summary.total_comparisons += result.summary.total;
        summary.successful += result.summary.successful;
        summary.failed += result.summary.failed;
        for record in &result.records {
            if record.counts.total > 0 {
                summary.comparisons_with_diffs += 1;
            }
            endpoints_run.insert(record.endpoint_a.clone());
            endpoints_run.insert(record.endpoint_b.clone());
            if let Some(geo) = &record.geo {
                geos_used.insert(geo.clone());
            }
            if let Some(id) = &record.id {
                ids_used.insert(id.value.clone());
            }
        }
    }

    Report {
        generated_at: report_timestamp(),
        summary,
        endpoints_run,
        geos_used,
        ids_used,
        headers: headers.clone(),
        jobs: results,
    }
}

/// Current time rendered in the fixed report timezone.
fn report_timestamp() -> String {
    // The offset is a compile-time constant well inside chrono's bounds.
    let zone = FixedOffset::east_opt(REPORT_TZ_OFFSET_SECS).expect("valid report offset");
    Utc::now()
        .with_timezone(&zone)
        .format(REPORT_TIMESTAMP_FORMAT)
        .to_string()
}
