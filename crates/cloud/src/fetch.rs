//! Asset retrieval with availability-aware retry.
//!
//! A finished render is announced before the object is necessarily
//! readable: uploads lag, caches hold stale 404s, and a file can be
//! served mid-write. [`AssetFetcher`] absorbs that window by retrying
//! with exponential backoff, switching to presigned URLs for private
//! buckets, and probing one alternate key before giving up.

use std::time::Duration;

use reqwest::header::{CONTENT_RANGE, RANGE};

use crate::storage::{alternate_key, ObjectStore, StorageError};

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single retrieval attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Smallest believable finished asset. A result file served while still
/// being written comes back shorter than this and is treated as not
/// ready rather than delivered broken.
pub const MIN_PLAYABLE_BYTES: u64 = 2048;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors from asset retrieval.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The store answered with a non-2xx status code.
    #[error("upstream returned HTTP {0}")]
    Upstream(u16),

    /// The object exists but is below the playability threshold.
    #[error("asset is {size} bytes, below the {min} byte playability threshold")]
    TooSmall { size: u64, min: u64 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl FetchError {
    /// Whether waiting and retrying can plausibly fix this failure.
    fn is_availability(&self) -> bool {
        match self {
            FetchError::Request(_) => true,
            FetchError::Upstream(status) => is_availability_status(*status),
            FetchError::TooSmall { .. } => true,
            FetchError::Storage(_) => false,
        }
    }

    /// Whether the store refused an un-signed request.
    fn needs_signing(&self) -> bool {
        matches!(self, FetchError::Upstream(401) | FetchError::Upstream(403))
    }
}

/// Statuses that mean "not there yet" for a freshly produced object.
fn is_availability_status(status: u16) -> bool {
    matches!(status, 404 | 410 | 416) || status >= 500
}

// ---------------------------------------------------------------------------
// AssetFetcher
// ---------------------------------------------------------------------------

/// A successfully opened upstream response.
pub struct FetchedAsset {
    /// The streaming upstream response, status and headers intact.
    pub response: reqwest::Response,
    /// Set when the object was found under a different key than the
    /// record pointed at. Callers should persist it.
    pub corrected_key: Option<String>,
}

/// Retrieves stored assets through HTTP, retrying around the window
/// where a finished result is not fully readable yet.
pub struct AssetFetcher {
    client: reqwest::Client,
    store: ObjectStore,
}

impl AssetFetcher {
    /// Create a fetcher over the given object store.
    pub fn new(store: ObjectStore) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, store }
    }

    /// Fetch an object, optionally a byte range of it.
    ///
    /// The recorded key is tried with the full retry schedule; if that
    /// is exhausted, the one alternate key derived from `filename` gets
    /// a single extra attempt. The original failure is reported when
    /// the alternate misses too.
    pub async fn fetch(
        &self,
        storage_key: &str,
        filename: &str,
        range: Option<(u64, Option<u64>)>,
    ) -> Result<FetchedAsset, FetchError> {
        let primary_err = match self.fetch_key(storage_key, range).await {
            Ok(response) => {
                return Ok(FetchedAsset {
                    response,
                    corrected_key: None,
                })
            }
            Err(e) => e,
        };

        if let Some(alt) = alternate_key(storage_key, filename) {
            tracing::info!(
                storage_key,
                alternate = %alt,
                "Recorded key exhausted, probing alternate location",
            );
            if let Ok(response) = self.attempt(&alt, range, false).await {
                return Ok(FetchedAsset {
                    response,
                    corrected_key: Some(alt),
                });
            }
        }
        Err(primary_err)
    }

    /// Run the full retry schedule against one key.
    async fn fetch_key(
        &self,
        key: &str,
        range: Option<(u64, Option<u64>)>,
    ) -> Result<reqwest::Response, FetchError> {
        let mut signed = false;

        for (attempt, delay_secs) in RETRY_DELAYS_SECS.iter().enumerate() {
            match self.attempt(key, range, signed).await {
                Ok(response) => return Ok(response),
                Err(e) if e.needs_signing() && !signed => {
                    // Auth refusal is immediate, not transient: switch
                    // to a presigned URL without sleeping.
                    tracing::debug!(key, "Un-signed fetch refused, switching to presigned URL");
                    signed = true;
                }
                Err(e) if e.is_availability() => {
                    // A tiny body can be the store's error document
                    // rather than the object; sign the retries.
                    if !signed && matches!(e, FetchError::TooSmall { .. }) {
                        tracing::debug!(key, "Short un-signed read, retrying presigned");
                        signed = true;
                    }
                    tracing::warn!(
                        attempt = attempt + 1,
                        key,
                        error = %e,
                        "Asset not retrievable yet, retrying",
                    );
                    tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
                }
                Err(e) => return Err(e),
            }
        }

        // Final attempt after the last backoff.
        match self.attempt(key, range, signed).await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::error!(key, error = %e, "Asset retrieval failed after all retries");
                Err(e)
            }
        }
    }

    /// One GET against the store, un-signed or presigned.
    async fn attempt(
        &self,
        key: &str,
        range: Option<(u64, Option<u64>)>,
        signed: bool,
    ) -> Result<reqwest::Response, FetchError> {
        let url = if signed {
            self.store.presign_get(key).await?
        } else {
            self.store.public_url(key)
        };

        let mut request = self.client.get(url);
        if let Some((start, end)) = range {
            request = request.header(RANGE, format_range(start, end));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Upstream(status.as_u16()));
        }

        ensure_playable(effective_size(&response, range.is_some()))?;
        Ok(response)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Format a `Range` request header value.
fn format_range(start: u64, end: Option<u64>) -> String {
    match end {
        Some(end) => format!("bytes={start}-{end}"),
        None => format!("bytes={start}-"),
    }
}

/// Total object size implied by a response.
///
/// Range responses report the full size after the slash in
/// `Content-Range`; plain responses report it as `Content-Length`.
fn effective_size(response: &reqwest::Response, ranged: bool) -> Option<u64> {
    if ranged {
        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
    } else {
        response.content_length()
    }
}

/// Pull the total size out of a `Content-Range` value like
/// `bytes 0-1023/4096`. A `*` total means the size is unknown.
fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

/// Reject objects below [`MIN_PLAYABLE_BYTES`]. Unknown sizes pass; the
/// threshold only guards against observably truncated files.
fn ensure_playable(size: Option<u64>) -> Result<(), FetchError> {
    match size {
        Some(size) if size < MIN_PLAYABLE_BYTES => Err(FetchError::TooSmall {
            size,
            min: MIN_PLAYABLE_BYTES,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- classification --

    #[test]
    fn missing_and_range_errors_are_retryable() {
        for status in [404, 410, 416, 500, 503] {
            assert!(FetchError::Upstream(status).is_availability(), "{status}");
        }
    }

    #[test]
    fn client_errors_are_not_retryable() {
        for status in [400, 401, 403, 422] {
            assert!(!is_availability_status(status), "{status}");
        }
    }

    #[test]
    fn auth_refusals_request_signing() {
        assert!(FetchError::Upstream(403).needs_signing());
        assert!(FetchError::Upstream(401).needs_signing());
        assert!(!FetchError::Upstream(404).needs_signing());
    }

    #[test]
    fn short_read_is_retryable() {
        let err = FetchError::TooSmall { size: 12, min: MIN_PLAYABLE_BYTES };
        assert!(err.is_availability());
    }

    // -- range plumbing --

    #[test]
    fn formats_open_and_closed_ranges() {
        assert_eq!(format_range(0, None), "bytes=0-");
        assert_eq!(format_range(100, Some(1099)), "bytes=100-1099");
    }

    #[test]
    fn parses_content_range_totals() {
        assert_eq!(parse_content_range_total("bytes 0-1023/4096"), Some(4096));
        assert_eq!(parse_content_range_total("bytes */4096"), Some(4096));
        assert_eq!(parse_content_range_total("bytes 0-1023/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    // -- playability threshold --

    #[test]
    fn sizes_below_threshold_are_rejected() {
        let err = ensure_playable(Some(MIN_PLAYABLE_BYTES - 1)).unwrap_err();
        match err {
            FetchError::TooSmall { size, min } => {
                assert_eq!(size, MIN_PLAYABLE_BYTES - 1);
                assert_eq!(min, MIN_PLAYABLE_BYTES);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn threshold_and_unknown_sizes_pass() {
        assert!(ensure_playable(Some(MIN_PLAYABLE_BYTES)).is_ok());
        assert!(ensure_playable(None).is_ok());
    }
}
