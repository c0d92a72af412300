//! Resilient HTTP fetch layer.
//!
//! One GET at a time, with bounded retries for transient failures. Retryable
//! HTTP statuses and transport-level errors wait out a backoff delay
//! (honoring `Retry-After`) and try again; anything else fails immediately.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::backoff::BackoffPolicy;

/// HTTP statuses that indicate a transient server-side condition.
pub const RETRYABLE_STATUS_CODES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Default number of attempts per fetch.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, DNS, or timeout failure at the transport level.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// A status from [`RETRYABLE_STATUS_CODES`].
    #[error("retryable status {status}")]
    RetryableStatus { status: StatusCode },
    /// Any other non-2xx status; never retried.
    #[error("unexpected status {status}")]
    FatalStatus { status: StatusCode },
    /// The attempt budget was spent; wraps the last transient failure.
    #[error("giving up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },
}

/// Outcome of a single attempt that did not produce a body.
struct AttemptFailure {
    error: FetchError,
    retry_after: Option<String>,
    retryable: bool,
}

/// HTTP GET client with retry/backoff for transient failures.
pub struct Fetcher {
    client: Client,
    max_attempts: u32,
    backoff: BackoffPolicy,
}

impl Fetcher {
    /// Build a fetcher with the given default headers and timing knobs.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(
        headers: HeaderMap,
        timeout: Duration,
        max_attempts: u32,
        backoff: BackoffPolicy,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            max_attempts: max_attempts.max(1),
            backoff,
        })
    }

    /// GET `url` with the given query parameters and return the raw body.
    ///
    /// List-valued parameters are passed as repeated keys and everything is
    /// URL-encoded by the client.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::FatalStatus`] immediately on a non-retryable
    /// status, and [`FetchError::RetriesExhausted`] once the attempt budget
    /// is spent on transient failures.
    pub async fn get_bytes(&self, url: &str, params: &[(&str, &str)]) -> Result<Vec<u8>, FetchError> {
        let mut attempt = 1;
        loop {
            let failure = match self.attempt(url, params).await {
                Ok(body) => return Ok(body),
                Err(failure) => failure,
            };

            if !failure.retryable {
                return Err(failure.error);
            }
            if attempt >= self.max_attempts {
                warn!(url, attempts = self.max_attempts, "Retry budget exhausted");
                return Err(FetchError::RetriesExhausted {
                    attempts: self.max_attempts,
                    source: Box::new(failure.error),
                });
            }

            let delay = self
                .backoff
                .delay(attempt, failure.retry_after.as_deref());
            debug!(
                url,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %failure.error,
                "Transient failure, retrying after delay"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// GET `url` and return the body decoded as UTF-8 (lossily).
    ///
    /// # Errors
    ///
    /// Same as [`Fetcher::get_bytes`].
    pub async fn get_text(&self, url: &str, params: &[(&str, &str)]) -> Result<String, FetchError> {
        let body = self.get_bytes(url, params).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    async fn attempt(&self, url: &str, params: &[(&str, &str)]) -> Result<Vec<u8>, AttemptFailure> {
        let mut request = self.client.get(url);
        if !params.is_empty() {
            request = request.query(params);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                return Err(AttemptFailure {
                    error: FetchError::Transport(e),
                    retry_after: None,
                    retryable: true,
                })
            }
        };

        let status = response.status();
        if status.is_success() {
            return match response.bytes().await {
                Ok(body) => Ok(body.to_vec()),
                // The connection dropped mid-body; same treatment as any
                // other transport failure.
                Err(e) => Err(AttemptFailure {
                    error: FetchError::Transport(e),
                    retry_after: None,
                    retryable: true,
                }),
            };
        }

        if RETRYABLE_STATUS_CODES.contains(&status) {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            return Err(AttemptFailure {
                error: FetchError::RetryableStatus { status },
                retry_after,
                retryable: true,
            });
        }

        Err(AttemptFailure {
            error: FetchError::FatalStatus { status },
            retry_after: None,
            retryable: false,
        })
    }
}
