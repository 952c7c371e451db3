// Shared test helpers: input builders and instrumented fake transports.
//
// This module provides common utilities used across multiple test files to
// reduce duplication. Every test file pulls it in with `mod helpers;`, so
// items are marked dead_code-tolerant for the files that only use a subset.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use api_parity::{
    EndpointEntry, HeaderTemplate, HeaderValue, HttpTransport, IdValue, JobConfig, PairSpec,
    RetryPolicy, RunInput, TransportError, TransportRequest, TransportResponse,
};

/// Builds a canonical catalog entry for one endpoint key.
#[allow(dead_code)]
pub fn catalog_entry(key: &str, platforms: &[&str], id_category: Option<&str>) -> EndpointEntry {
    EndpointEntry {
        key: key.to_string(),
        platforms: platforms
            .iter()
            .map(|p| p.to_string())
            .collect::<BTreeSet<_>>(),
        path_a: format!("/v1/{key}"),
        path_b: format!("/v1/{key}"),
        id_category: id_category.map(str::to_string),
        base_url_a: None,
        base_url_b: None,
    }
}

/// Builds a job self-comparing the given endpoint keys.
#[allow(dead_code)]
pub fn base_job(name: &str, base_a: &str, base_b: &str, keys: &[&str]) -> JobConfig {
    JobConfig {
        name: name.to_string(),
        platform: "android".to_string(),
        ignore_paths: Vec::new(),
        retry_policy: RetryPolicy {
            retries: 2,
            delay_ms: 1,
        },
        quick_mode: false,
        order_sensitive: false,
        base_url_a: base_a.to_string(),
        base_url_b: base_b.to_string(),
        endpoint_pairs: keys
            .iter()
            .map(|k| PairSpec::SelfCompare(k.to_string()))
            .collect(),
        endpoints_to_run: Vec::new(),
    }
}

/// A header template fanning out over the given geos.
#[allow(dead_code)]
pub fn geo_template(geos: &[&str]) -> HeaderTemplate {
    let mut headers = BTreeMap::new();
    headers.insert(
        "x-geo".to_string(),
        HeaderValue::Many(geos.iter().map(|g| g.to_string()).collect()),
    );
    headers.insert(
        "x-client".to_string(),
        HeaderValue::One("api_parity-tests".to_string()),
    );
    HeaderTemplate {
        headers,
        geo_header: Some("x-geo".to_string()),
    }
}

/// Two store IDs under the `storeId` category.
#[allow(dead_code)]
pub fn store_ids() -> BTreeMap<String, Vec<IdValue>> {
    let mut ids = BTreeMap::new();
    ids.insert(
        "storeId".to_string(),
        vec![
            IdValue {
                value: "101".to_string(),
                name: "Store A".to_string(),
            },
            IdValue {
                value: "202".to_string(),
                name: "Store B".to_string(),
            },
        ],
    );
    ids
}

/// Assembles a complete run input around one job.
#[allow(dead_code)]
pub fn run_input(job: JobConfig, catalog: Vec<EndpointEntry>, geos: &[&str]) -> RunInput {
    let mut headers = BTreeMap::new();
    headers.insert(job.platform.clone(), geo_template(geos));
    RunInput {
        jobs: vec![job],
        headers,
        ids: store_ids(),
        catalog,
        cell_concurrency: 5,
    }
}

/// Serves a fixed JSON body for every request and counts calls.
#[allow(dead_code)]
pub struct StaticTransport {
    pub body: Value,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl StaticTransport {
    pub fn new(body: Value) -> Self {
        StaticTransport {
            body,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for StaticTransport {
    async fn execute(
        &self,
        _request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TransportResponse {
            status: 200,
            body: self.body.to_string(),
        })
    }
}

/// Refuses every request and counts calls.
#[allow(dead_code)]
pub struct FailingTransport {
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl FailingTransport {
    pub fn new() -> Self {
        FailingTransport {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for FailingTransport {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Connect(format!(
            "connection refused: {}",
            request.url
        )))
    }
}

/// Tracks the maximum number of simultaneously in-flight requests.
///
/// Each comparison cell issues two parallel fetches, so a job bounded at N
/// cells can have at most 2N requests in flight at once.
#[allow(dead_code)]
pub struct GaugeTransport {
    pub current: AtomicUsize,
    pub max_observed: AtomicUsize,
    pub delay: Duration,
}

#[allow(dead_code)]
impl GaugeTransport {
    pub fn new(delay: Duration) -> Self {
        GaugeTransport {
            current: AtomicUsize::new(0),
            max_observed: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_observed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for GaugeTransport {
    async fn execute(
        &self,
        _request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_observed.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(TransportResponse {
            status: 200,
            body: "{\"ok\":true}".to_string(),
        })
    }
}
