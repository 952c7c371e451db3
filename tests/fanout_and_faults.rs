//! Fan-out arithmetic, ordering and fault-tolerance tests over an
//! instrumented fake transport.

mod helpers;

use std::sync::Arc;

use serde_json::json;

use api_parity::{run_comparison_with, PairSpec};
use helpers::*;

#[tokio::test]
async fn test_fanout_produces_one_record_per_cell() {
    // 1 pair x 2 geos x 2 ids = 4 records.
    let mut catalog = vec![catalog_entry("cart", &["android"], Some("storeId"))];
    catalog[0].path_a = "/v1/stores/{storeId}/cart".to_string();
    catalog[0].path_b = "/v1/stores/{storeId}/cart".to_string();
    let job = base_job("fanout", "https://a.test", "https://b.test", &["cart"]);

    let transport = Arc::new(StaticTransport::new(json!({"ok": true})));
    let input = run_input(job, catalog, &["IN", "US"]);
    let report = run_comparison_with(input, transport).await;

    assert_eq!(report.summary.total_comparisons, 4);
    assert_eq!(report.summary.successful, 4);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(report.jobs[0].records.len(), 4);
    assert_eq!(report.geos_used.len(), 2);
    assert_eq!(report.ids_used.len(), 2);
}

#[tokio::test]
async fn test_quick_mode_restricts_to_first_geo_and_id() {
    let mut catalog = vec![catalog_entry("cart", &["android"], Some("storeId"))];
    catalog[0].path_a = "/v1/stores/{storeId}/cart".to_string();
    catalog[0].path_b = "/v1/stores/{storeId}/cart".to_string();
    let mut job = base_job("quick", "https://a.test", "https://b.test", &["cart"]);
    job.quick_mode = true;

    let transport = Arc::new(StaticTransport::new(json!({"ok": true})));
    let report = run_comparison_with(run_input(job, catalog, &["IN", "US"]), transport).await;

    assert_eq!(report.summary.total_comparisons, 1);
    let record = &report.jobs[0].records[0];
    assert_eq!(record.geo.as_deref(), Some("IN"));
    assert_eq!(record.id.as_ref().map(|i| i.value.as_str()), Some("101"));
}

#[tokio::test]
async fn test_records_keep_generation_order() {
    let mut catalog = vec![catalog_entry("cart", &["android"], Some("storeId"))];
    catalog[0].path_a = "/v1/stores/{storeId}/cart".to_string();
    catalog[0].path_b = "/v1/stores/{storeId}/cart".to_string();
    let job = base_job("ordering", "https://a.test", "https://b.test", &["cart"]);

    let transport = Arc::new(StaticTransport::new(json!({"ok": true})));
    let report = run_comparison_with(run_input(job, catalog, &["IN", "US"]), transport).await;

    let cells: Vec<(Option<&str>, Option<&str>)> = report.jobs[0]
        .records
        .iter()
        .map(|r| (r.geo.as_deref(), r.id.as_ref().map(|i| i.value.as_str())))
        .collect();
    assert_eq!(
        cells,
        vec![
            (Some("IN"), Some("101")),
            (Some("IN"), Some("202")),
            (Some("US"), Some("101")),
            (Some("US"), Some("202")),
        ]
    );
}

#[tokio::test]
async fn test_invalid_url_short_circuits_without_network() {
    // Empty side-A base URL: the cell must not touch the transport.
    let catalog = vec![catalog_entry("cart", &["android"], None)];
    let job = base_job("invalid", "", "https://b.test", &["cart"]);

    let transport = Arc::new(StaticTransport::new(json!({"ok": true})));
    let input = run_input(job, catalog, &["IN"]);
    let report = run_comparison_with(input, transport.clone()).await;

    assert_eq!(transport.call_count(), 0);
    assert_eq!(report.summary.total_comparisons, 1);
    assert_eq!(report.summary.failed, 1);
    let record = &report.jobs[0].records[0];
    assert!(!record.success);
    assert_eq!(record.response_a.error.as_deref(), Some("Invalid URL"));
    assert_eq!(record.error.as_deref(), Some("Invalid URL"));
    assert!(record.diffs.is_empty());
}

#[tokio::test]
async fn test_unknown_endpoint_key_yields_warning_not_failure() {
    let catalog = vec![catalog_entry("cart", &["android"], None)];
    let mut job = base_job("partial", "https://a.test", "https://b.test", &["cart"]);
    job.endpoint_pairs
        .push(PairSpec::SelfCompare("ghost".to_string()));

    let transport = Arc::new(StaticTransport::new(json!({"ok": true})));
    let report = run_comparison_with(run_input(job, catalog, &["IN"]), transport).await;

    let job_result = &report.jobs[0];
    assert_eq!(job_result.warnings.len(), 1);
    assert!(job_result.warnings[0].contains("ghost"));
    // The resolvable pair still ran.
    assert_eq!(job_result.summary.total, 1);
    assert_eq!(job_result.summary.successful, 1);
}

#[tokio::test]
async fn test_job_with_no_resolvable_pairs_returns_empty_result() {
    let catalog = vec![catalog_entry("cart", &["ios"], None)];
    let job = base_job("empty", "https://a.test", "https://b.test", &["cart"]);

    let transport = Arc::new(StaticTransport::new(json!({"ok": true})));
    let report = run_comparison_with(run_input(job, catalog, &["IN"]), transport).await;

    assert_eq!(report.summary.total_comparisons, 0);
    assert_eq!(report.jobs.len(), 1);
    assert_eq!(report.jobs[0].warnings.len(), 1);
}

#[tokio::test]
async fn test_total_transport_failure_still_completes_the_run() {
    let catalog = vec![catalog_entry("cart", &["android"], None)];
    let job = base_job("dark", "https://a.test", "https://b.test", &["cart"]);

    let transport = Arc::new(FailingTransport::new());
    let report =
        run_comparison_with(run_input(job, catalog, &["IN"]), transport.clone()).await;

    assert_eq!(report.summary.total_comparisons, 1);
    assert_eq!(report.summary.failed, 1);
    let record = &report.jobs[0].records[0];
    assert!(!record.success);
    assert!(!record.response_a.success);
    let error = record.response_a.error.as_deref().unwrap_or_default();
    assert!(error.contains("connection refused"), "got: {error}");
    // retry_policy.retries = 2, two sides: every attempt failed.
    assert_eq!(transport.call_count(), 4);
}

#[tokio::test]
async fn test_identical_sides_report_identical() {
    let catalog = vec![catalog_entry("cart", &["android"], None)];
    let job = base_job("same", "https://a.test", "https://b.test", &["cart"]);

    let transport = Arc::new(StaticTransport::new(json!({
        "id": 7,
        "items": [{"sku": "x"}, {"sku": "y"}]
    })));
    let report = run_comparison_with(run_input(job, catalog, &["IN"]), transport).await;

    let record = &report.jobs[0].records[0];
    assert!(record.success);
    assert!(record.counts.identical);
    assert!(record.diffs.is_empty());
    assert_eq!(report.summary.comparisons_with_diffs, 0);
}
