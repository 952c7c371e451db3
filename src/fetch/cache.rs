//! Per-job response memoization.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use crate::models::FetchOutcome;

/// Caches successful responses for the duration of one job.
///
/// ID and geo permutations frequently resolve to the same URL (an endpoint
/// without a placeholder, or a self-compare with identical bases); the
/// cache keeps those from hitting the network twice. The check-then-insert
/// sequence is not atomic: two cells racing on a cold key may both fetch.
/// Requests are idempotent GETs, so the duplicate fetch is harmless and
/// cheaper than locking across the await.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CachedResponse>>,
}

#[derive(Debug, Clone)]
struct CachedResponse {
    status: Option<u16>,
    data: Option<Value>,
}

impl ResponseCache {
    /// An empty cache, scoped to one job invocation.
    pub fn new() -> Self {
        ResponseCache::default()
    }

    /// The cache key for a request: the exact URL plus serialized headers.
    pub fn key(url: &str, headers: &BTreeMap<String, String>) -> String {
        let serialized = serde_json::to_string(headers).unwrap_or_default();
        format!("{url}|{serialized}")
    }

    /// Returns the cached outcome for a key, with `elapsed_ms == 0` to
    /// signal the hit.
    pub fn get(&self, key: &str) -> Option<FetchOutcome> {
        let entries = self.lock();
        entries.get(key).map(|cached| FetchOutcome {
            success: true,
            status: cached.status,
            data: cached.data.clone(),
            error: None,
            elapsed_ms: 0,
        })
    }

    /// Stores a successful outcome. Failed outcomes are never cached, so a
    /// later cell retries the fetch itself.
    pub fn put(&self, key: String, outcome: &FetchOutcome) {
        if !outcome.success {
            return;
        }
        let mut entries = self.lock();
        entries.insert(
            key,
            CachedResponse {
                status: outcome.status,
                data: outcome.data.clone(),
            },
        );
    }

    /// Number of cached responses.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CachedResponse>> {
        // A poisoned lock only means another cell panicked mid-insert; the
        // map itself is still usable.
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
