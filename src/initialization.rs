//! Shared resource initialization: logger, HTTP client, semaphore.

use std::sync::Arc;

use reqwest::ClientBuilder;
use tokio::sync::Semaphore;

use crate::config::FETCH_TIMEOUT;
use crate::error_handling::InitializationError;

/// Initializes the logger from the environment.
///
/// Reads `RUST_LOG` via `env_logger`, quiets the HTTP stack down to info,
/// and uses `try_init` so tests can call it repeatedly without panicking.
pub fn init_logger() {
    let _ = env_logger::Builder::from_default_env()
        .filter_module("reqwest", log::LevelFilter::Info)
        .filter_module("hyper", log::LevelFilter::Info)
        .try_init();
}

/// Builds the shared HTTP client with the fixed per-request timeout.
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if the client cannot be
/// constructed.
pub fn init_client() -> Result<Arc<reqwest::Client>, InitializationError> {
    let client = ClientBuilder::new().timeout(FETCH_TIMEOUT).build()?;
    Ok(Arc::new(client))
}

/// Creates the bounded-concurrency semaphore for one job's cells.
pub fn init_semaphore(count: usize) -> Arc<Semaphore> {
    // A zero-permit semaphore would deadlock the job; clamp to one.
    Arc::new(Semaphore::new(count.max(1)))
}
