pub mod chunk;
pub mod correlation;
pub mod io;
pub mod merge;
pub mod plan;
pub mod pool;
pub mod single;

pub use chunk::ChunkUploader;
pub use correlation::CorrelationIssuer;
pub use merge::MergeCoordinator;
pub use plan::{ChunkRange, TransferPlan};
pub use pool::{ChunkTransfer, PoolOutcome, WorkerPool};
pub use single::SingleShotUploader;

use crate::common::RunConfig;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};

/// Headers common to every benchmark request: configured extra headers
/// (minus any `Authorization`), the bearer token when configured, and the
/// correlation id when present.
pub(crate) fn request_headers(config: &RunConfig, correlation_id: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for pair in config.active_headers() {
        match (
            HeaderName::from_bytes(pair.key.as_bytes()),
            HeaderValue::from_str(&pair.value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(key = %pair.key, "skipping malformed extra header"),
        }
    }

    if let Some(token) = config.bearer_token() {
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
            headers.insert(AUTHORIZATION, value);
        }
    }

    if let Some(id) = correlation_id {
        if let Ok(value) = HeaderValue::from_str(id) {
            headers.insert("x-request-id", value);
        }
    }

    headers
}
