//! HTTP fetching with bounded retries and per-job memoization.

mod cache;
mod transport;

pub use cache::ResponseCache;
pub use transport::{
    HttpTransport, ReqwestTransport, TransportError, TransportRequest, TransportResponse,
};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;

use crate::models::{FetchOutcome, RetryPolicy};

/// Failure of a single fetch attempt, carried through the retry loop so
/// the final outcome can report the last attempt's message and timing.
#[derive(Debug)]
struct AttemptFailure {
    message: String,
    elapsed_ms: u64,
}

/// Executes HTTP GETs with fixed-interval retries.
///
/// HTTP status codes are never treated as failures: a 500 is a perfectly
/// comparable response. Only transport-level errors (timeout, DNS,
/// connection refused) trigger a retry, with a fixed delay between
/// attempts and the elapsed clock reset at the start of each attempt.
pub struct RetryingFetcher {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    /// A fetcher over the given transport and retry policy.
    pub fn new(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        RetryingFetcher { transport, policy }
    }

    /// Fetches one URL, retrying transport failures per the policy.
    ///
    /// Never returns an error: exhaustion folds into a failed
    /// [`FetchOutcome`] carrying the last error's message.
    pub async fn fetch(&self, url: &str, headers: &BTreeMap<String, String>) -> FetchOutcome {
        let attempts = self.policy.retries.max(1);
        let strategy =
            FixedInterval::from_millis(self.policy.delay_ms).take((attempts - 1) as usize);

        let transport = Arc::clone(&self.transport);
        let url_owned = url.to_string();
        let headers_owned = headers.clone();

        let result = Retry::spawn(strategy, move || {
            let transport = Arc::clone(&transport);
            let request = TransportRequest::get(&url_owned, &headers_owned);
            let url_for_log = url_owned.clone();
            async move {
                let started = Instant::now();
                match transport.execute(request).await {
                    Ok(response) => {
                        let elapsed_ms = started.elapsed().as_millis() as u64;
                        log::debug!(
                            "Fetched {url_for_log} -> {} in {elapsed_ms}ms",
                            response.status
                        );
                        Ok(build_outcome(response, elapsed_ms))
                    }
                    Err(e) => {
                        log::debug!("Transport failure for {url_for_log}: {e}");
                        Err(AttemptFailure {
                            message: e.to_string(),
                            elapsed_ms: started.elapsed().as_millis() as u64,
                        })
                    }
                }
            }
        })
        .await;

        match result {
            Ok(outcome) => outcome,
            Err(last) => FetchOutcome::failed(last.message, last.elapsed_ms),
        }
    }
}

/// Parses the body as JSON, falling back to the raw text for non-JSON
/// responses so the comparison still has something to look at.
fn build_outcome(response: TransportResponse, elapsed_ms: u64) -> FetchOutcome {
    let data = serde_json::from_str::<Value>(&response.body)
        .unwrap_or_else(|_| Value::String(response.body));
    FetchOutcome::completed(response.status, data, elapsed_ms)
}
