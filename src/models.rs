//! Input data model for a comparison run.
//!
//! Everything here is plain serde data: the surrounding application (config
//! ingestion, UI, storage) speaks JSON with camelCase keys, and this crate
//! only ever sees the canonical shapes below.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{DEFAULT_CELL_CONCURRENCY, DEFAULT_FETCH_RETRIES, DEFAULT_RETRY_DELAY_MS};

/// One catalog endpoint in canonical form.
///
/// The ingestion layer normalizes legacy duck-typed shapes (`platform`
/// string vs `platforms` array) into this one variant before the core sees
/// it. Loaded once per run, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointEntry {
    /// Stable catalog key referenced by job pair specs.
    pub key: String,
    /// Platforms this endpoint applies to.
    pub platforms: BTreeSet<String>,
    /// Path template for side A. May contain an `{idCategory}` placeholder.
    pub path_a: String,
    /// Path template for side B. May be identical to `path_a`.
    pub path_b: String,
    /// Name of the ID dimension substituted into the path templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_category: Option<String>,
    /// Per-endpoint override for the job's side-A base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url_a: Option<String>,
    /// Per-endpoint override for the job's side-B base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url_b: Option<String>,
}

impl EndpointEntry {
    /// Whether this endpoint is eligible for the given platform.
    pub fn supports_platform(&self, platform: &str) -> bool {
        self.platforms.contains(platform)
    }
}

/// Retry behavior for one job's fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts per fetch, first attempt included.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Fixed delay between attempts in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_retries() -> u32 {
    DEFAULT_FETCH_RETRIES
}

fn default_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            retries: DEFAULT_FETCH_RETRIES,
            delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

/// One endpoint-pair selector inside a job.
///
/// Three shapes survive in stored job definitions: a bare key
/// (self-compare), an explicit `{endpointA, endpointB}` object, and an
/// array of keys each self-compared. All three deserialize into this
/// tagged union and are resolved into flat pairs before fan-out begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PairSpec {
    /// Compare one endpoint against itself (side A base vs side B base).
    SelfCompare(String),
    /// Compare two distinct catalog endpoints.
    #[serde(rename_all = "camelCase")]
    ExplicitPair {
        /// Catalog key for side A.
        endpoint_a: String,
        /// Catalog key for side B.
        endpoint_b: String,
    },
    /// Legacy list form: every key is self-compared.
    LegacyList(Vec<String>),
}

/// One comparison job: a named batch of endpoint pairs fanned out over the
/// platform's geos and ID values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfig {
    /// Display name, carried onto every record this job produces.
    pub name: String,
    /// Target platform; selects the header template and filters the catalog.
    pub platform: String,
    /// Diff paths to exclude from summaries. Entries wrapped in `/.../` are
    /// treated as regular expressions, anything else as a literal path.
    #[serde(default)]
    pub ignore_paths: Vec<String>,
    /// Retry behavior for this job's fetches.
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    /// Restrict geo and ID fan-out to their first value (smoke-check mode).
    #[serde(default)]
    pub quick_mode: bool,
    /// Compare arrays positionally instead of by similarity matching.
    #[serde(default)]
    pub order_sensitive: bool,
    /// Base URL for side A, unless an endpoint overrides it.
    pub base_url_a: String,
    /// Base URL for side B, unless an endpoint overrides it.
    pub base_url_b: String,
    /// Endpoint pairs to compare.
    #[serde(default)]
    pub endpoint_pairs: Vec<PairSpec>,
    /// Legacy field: endpoint keys to self-compare. Kept readable so stored
    /// job definitions keep working; merged behind `endpoint_pairs`.
    #[serde(default)]
    pub endpoints_to_run: Vec<String>,
}

impl JobConfig {
    /// All pair specs for this job, legacy `endpointsToRun` entries last.
    pub fn pair_specs(&self) -> Vec<PairSpec> {
        let mut specs = self.endpoint_pairs.clone();
        if !self.endpoints_to_run.is_empty() {
            specs.push(PairSpec::LegacyList(self.endpoints_to_run.clone()));
        }
        specs
    }
}

/// A header value in a template: a single value, or several values meaning
/// "run the job once per value" (the geo fan-out).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    /// A plain header value.
    One(String),
    /// A fan-out header: the job runs once per value.
    Many(Vec<String>),
}

/// Per-platform request header template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderTemplate {
    /// Header name to value(s). BTreeMap keeps iteration deterministic.
    #[serde(default)]
    pub headers: BTreeMap<String, HeaderValue>,
    /// Name of the geo fan-out header. When absent, the first multi-valued
    /// header (in key order) is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_header: Option<String>,
}

impl HeaderTemplate {
    /// Name of the header that carries the geo dimension, if any.
    pub fn geo_header_name(&self) -> Option<&str> {
        if let Some(name) = self.geo_header.as_deref() {
            return Some(name);
        }
        self.headers
            .iter()
            .find(|(_, v)| matches!(v, HeaderValue::Many(_)))
            .map(|(k, _)| k.as_str())
    }

    /// The geo values to fan out over.
    ///
    /// A multi-valued geo header yields all its values (only the first in
    /// quick mode); a single-valued one yields that value; a template with
    /// no geo header yields one `None` entry so the job still runs once.
    pub fn geo_values(&self, quick_mode: bool) -> Vec<Option<String>> {
        let Some(name) = self.geo_header_name() else {
            return vec![None];
        };
        match self.headers.get(name) {
            Some(HeaderValue::Many(values)) if !values.is_empty() => {
                let take = if quick_mode { 1 } else { values.len() };
                values.iter().take(take).cloned().map(Some).collect()
            }
            Some(HeaderValue::One(value)) => vec![Some(value.clone())],
            _ => vec![None],
        }
    }

    /// Concrete headers for one cell, with the geo header pinned to `geo`.
    ///
    /// Non-geo multi-valued headers collapse to their first value.
    pub fn materialize(&self, geo: Option<&str>) -> BTreeMap<String, String> {
        let geo_name = self.geo_header_name().map(str::to_owned);
        let mut out = BTreeMap::new();
        for (name, value) in &self.headers {
            let is_geo = geo_name.as_deref() == Some(name.as_str());
            let resolved = match (value, is_geo, geo) {
                (_, true, Some(geo)) => Some(geo.to_string()),
                (HeaderValue::One(v), _, _) => Some(v.clone()),
                (HeaderValue::Many(vs), _, _) => vs.first().cloned(),
            };
            if let Some(v) = resolved {
                out.insert(name.clone(), v);
            }
        }
        out
    }
}

/// A concrete substitution value for a path placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdValue {
    /// The value substituted into the path template.
    pub value: String,
    /// Operator-facing label for the value.
    pub name: String,
}

/// Result of one side's HTTP call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutcome {
    /// Whether a response was obtained. Any HTTP status counts as success;
    /// only transport-level failures are failures.
    pub success: bool,
    /// HTTP status code, when a response was obtained.
    pub status: Option<u16>,
    /// Parsed JSON body, with a raw-text fallback for non-JSON responses.
    pub data: Option<Value>,
    /// Last transport error message, when all attempts failed.
    pub error: Option<String>,
    /// Wall-clock time of the final attempt. Zero signals a cache hit.
    pub elapsed_ms: u64,
}

impl FetchOutcome {
    /// An outcome carrying a response body.
    pub fn completed(status: u16, data: Value, elapsed_ms: u64) -> Self {
        FetchOutcome {
            success: true,
            status: Some(status),
            data: Some(data),
            error: None,
            elapsed_ms,
        }
    }

    /// A failed outcome carrying the last error message.
    pub fn failed(error: impl Into<String>, elapsed_ms: u64) -> Self {
        FetchOutcome {
            success: false,
            status: None,
            data: None,
            error: Some(error.into()),
            elapsed_ms,
        }
    }
}

/// Complete input for one comparison run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInput {
    /// Jobs to execute. Jobs run concurrently with no shared limiter.
    pub jobs: Vec<JobConfig>,
    /// Header template per platform.
    #[serde(default)]
    pub headers: BTreeMap<String, HeaderTemplate>,
    /// ID values per category.
    #[serde(default)]
    pub ids: BTreeMap<String, Vec<IdValue>>,
    /// The endpoint catalog, in canonical form.
    #[serde(default)]
    pub catalog: Vec<EndpointEntry>,
    /// Maximum comparison cells in flight per job.
    #[serde(default = "default_cell_concurrency")]
    pub cell_concurrency: usize,
}

fn default_cell_concurrency() -> usize {
    DEFAULT_CELL_CONCURRENCY
}
