//! End-to-end runs against real HTTP servers (wiremock), through the
//! production reqwest transport.

mod helpers;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use api_parity::{run_comparison, DiffKind, Severity};
use helpers::*;

#[tokio::test]
async fn test_run_detects_and_classifies_diffs() {
    let server_a = MockServer::start().await;
    let server_b = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "status": "ok",
            "label": "cart",
            "items": [{"sku": "x", "qty": 1}, {"sku": "y", "qty": 2}]
        })))
        .mount(&server_a)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "status": "degraded",
            "label": "basket",
            // Same items reordered: must not produce diffs.
            "items": [{"sku": "y", "qty": 2}, {"sku": "x", "qty": 1}]
        })))
        .mount(&server_b)
        .await;

    let catalog = vec![catalog_entry("cart", &["android"], None)];
    let job = base_job("e2e", &server_a.uri(), &server_b.uri(), &["cart"]);
    let report = run_comparison(run_input(job, catalog, &["IN"]))
        .await
        .expect("run completes");

    assert_eq!(report.summary.total_comparisons, 1);
    assert_eq!(report.summary.successful, 1);
    let record = &report.jobs[0].records[0];
    assert_eq!(record.counts.total, 2);
    assert_eq!(record.counts.changed, 2);

    let status = record
        .diffs
        .iter()
        .find(|d| d.dotted_path() == "status")
        .expect("status diff");
    assert_eq!(status.kind, DiffKind::Changed);
    assert_eq!(status.severity, Severity::High);

    let label = record
        .diffs
        .iter()
        .find(|d| d.dotted_path() == "label")
        .expect("label diff");
    assert_eq!(label.severity, Severity::Low);
}

#[tokio::test]
async fn test_run_sends_geo_header_and_fans_out() {
    let server_a = MockServer::start().await;
    let server_b = MockServer::start().await;

    for server in [&server_a, &server_b] {
        Mock::given(method("GET"))
            .and(path("/v1/cart"))
            .and(header("x-geo", "IN"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"region": "in"})))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/cart"))
            .and(header("x-geo", "US"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"region": "us"})))
            .expect(1)
            .mount(server)
            .await;
    }

    let catalog = vec![catalog_entry("cart", &["android"], None)];
    let job = base_job("geo", &server_a.uri(), &server_b.uri(), &["cart"]);
    let report = run_comparison(run_input(job, catalog, &["IN", "US"]))
        .await
        .expect("run completes");

    assert_eq!(report.summary.total_comparisons, 2);
    assert_eq!(report.summary.successful, 2);
    assert_eq!(
        report.geos_used.iter().cloned().collect::<Vec<_>>(),
        vec!["IN".to_string(), "US".to_string()]
    );
}

#[tokio::test]
async fn test_run_treats_http_500_as_comparable_response() {
    let server_a = MockServer::start().await;
    let server_b = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/cart"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
        .mount(&server_a)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": null})))
        .mount(&server_b)
        .await;

    let catalog = vec![catalog_entry("cart", &["android"], None)];
    let job = base_job("errors", &server_a.uri(), &server_b.uri(), &["cart"]);
    let report = run_comparison(run_input(job, catalog, &["IN"]))
        .await
        .expect("run completes");

    let record = &report.jobs[0].records[0];
    // A 500 is still a successful fetch; the diff engine sees both bodies.
    assert!(record.success);
    assert_eq!(record.response_a.status, Some(500));
    assert_eq!(record.response_b.status, Some(200));
    let error_diff = record
        .diffs
        .iter()
        .find(|d| d.dotted_path() == "error")
        .expect("error field diff");
    assert_eq!(error_diff.kind, DiffKind::TypeChanged);
    assert_eq!(error_diff.severity, Severity::Critical);
}

#[tokio::test]
async fn test_run_applies_ignore_paths() {
    let server_a = MockServer::start().await;
    let server_b = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"timestamp": 1111, "build": "a"},
            "value": 1
        })))
        .mount(&server_a)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"timestamp": 2222, "build": "a"},
            "value": 1
        })))
        .mount(&server_b)
        .await;

    let catalog = vec![catalog_entry("cart", &["android"], None)];
    let mut job = base_job("ignores", &server_a.uri(), &server_b.uri(), &["cart"]);
    job.ignore_paths = vec!["meta.timestamp".to_string()];
    let report = run_comparison(run_input(job, catalog, &["IN"]))
        .await
        .expect("run completes");

    let record = &report.jobs[0].records[0];
    assert!(record.success);
    assert!(record.counts.identical);
    assert!(record.diffs.is_empty());
}

#[tokio::test]
async fn test_run_substitutes_ids_into_paths() {
    let server_a = MockServer::start().await;
    let server_b = MockServer::start().await;

    for server in [&server_a, &server_b] {
        for store in ["101", "202"] {
            Mock::given(method("GET"))
                .and(path(format!("/v1/stores/{store}/menu")))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({"store": store})),
                )
                .expect(1)
                .mount(server)
                .await;
        }
    }

    let mut catalog = vec![catalog_entry("menu", &["android"], Some("storeId"))];
    catalog[0].path_a = "/v1/stores/{storeId}/menu".to_string();
    catalog[0].path_b = "/v1/stores/{storeId}/menu".to_string();
    let job = base_job("ids", &server_a.uri(), &server_b.uri(), &["menu"]);
    let report = run_comparison(run_input(job, catalog, &["IN"]))
        .await
        .expect("run completes");

    assert_eq!(report.summary.total_comparisons, 2);
    assert_eq!(report.summary.successful, 2);
    assert_eq!(
        report.ids_used.iter().cloned().collect::<Vec<_>>(),
        vec!["101".to_string(), "202".to_string()]
    );
    let urls: Vec<&str> = report.jobs[0]
        .records
        .iter()
        .map(|r| r.url_a.as_str())
        .collect();
    assert!(urls[0].ends_with("/v1/stores/101/menu"));
    assert!(urls[1].ends_with("/v1/stores/202/menu"));
}

#[tokio::test]
async fn test_report_is_json_serializable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let catalog = vec![catalog_entry("cart", &["android"], None)];
    let job = base_job("serialize", &server.uri(), &server.uri(), &["cart"]);
    let report = run_comparison(run_input(job, catalog, &["IN"]))
        .await
        .expect("run completes");

    let rendered = serde_json::to_string(&report).expect("report serializes");
    assert!(rendered.contains("\"generatedAt\""));
    assert!(rendered.contains("\"totalComparisons\""));
    let parsed: api_parity::Report = serde_json::from_str(&rendered).expect("round trips");
    assert_eq!(parsed.summary.total_comparisons, 1);
}
