//! Single posting-list call with bounded retry and error classification.
//!
//! One logical call is an explicit loop over attempts. Each attempt ends in
//! one of three outcomes: success, a retryable failure (timeouts and the
//! statuses the [`RetryPolicy`] marks as retryable), or a fatal failure.
//! Retryable failures sleep `backoff_base * 2^i` before attempt `i + 1`
//! until the policy's attempt budget is spent.

use crate::domain::model::{Page, PostingListRequest};
use crate::domain::ports::{ApiTransport, RawResponse, SendError, Sleeper};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Immutable retry configuration for a [`TransportSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    /// 5xx 以外也要重試的狀態碼（例如 429）
    retryable_statuses: BTreeSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF_BASE)
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
            retryable_statuses: BTreeSet::new(),
        }
    }

    /// Adds `status` to the retried set. Client errors (400/401/403) are
    /// never retried and are ignored here.
    pub fn with_retryable_status(mut self, status: u16) -> Self {
        if is_client_error(status) {
            warn!("Ignoring retryable status {}: client errors are never retried", status);
            return self;
        }
        self.retryable_statuses.insert(status);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff_base(&self) -> Duration {
        self.backoff_base
    }

    /// Delay slept before retrying after the failed attempt `attempt_index` (0-based).
    pub fn delay_before_retry(&self, attempt_index: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt_index))
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        !is_client_error(status) && (status >= 500 || self.retryable_statuses.contains(&status))
    }
}

/// Statuses that always fail the call on the first attempt.
pub const CLIENT_ERROR_STATUSES: [u16; 3] = [400, 401, 403];

pub fn is_client_error(status: u16) -> bool {
    CLIENT_ERROR_STATUSES.contains(&status)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Timeout,
    ServerError,
    ClientError,
    Other,
}

/// Failed attempt inside one logical call; logged, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    pub attempt_index: u32,
    pub error_class: ErrorClass,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("server error (HTTP {status}) after {attempts} attempt(s)")]
    ServerError { status: u16, attempts: u32 },

    /// `body` 只用於診斷，不會出現在 Display 或使用者訊息中
    #[error("request rejected by the API (HTTP {status})")]
    ClientError { status: u16, body: String },

    #[error("transport failure: {0}")]
    TransportFailure(String),
}

impl FetchError {
    pub fn class(&self) -> ErrorClass {
        match self {
            FetchError::Timeout { .. } => ErrorClass::Timeout,
            FetchError::ServerError { .. } => ErrorClass::ServerError,
            FetchError::ClientError { .. } => ErrorClass::ClientError,
            FetchError::TransportFailure(_) => ErrorClass::Other,
        }
    }

    pub fn user_hint(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => {
                "The request timed out. Check the internet connection or try again later, the API may be overloaded."
            }
            FetchError::ServerError { .. } => {
                "The posting API is temporarily unavailable. Try again later."
            }
            FetchError::ClientError { status: 400, .. } => {
                "Malformed request (400). Check the Client-Id and API-Key; details are in the logs."
            }
            FetchError::ClientError { status: 401, .. } => {
                "Authentication failed (401). Check the Client-Id and API-Key."
            }
            FetchError::ClientError { status: 403, .. } => {
                "Access denied (403). Check the permissions of the API key."
            }
            FetchError::ClientError { .. } => "The posting API rejected the request.",
            FetchError::TransportFailure(_) => {
                "Unexpected failure while talking to the posting API; details are in the logs."
            }
        }
    }
}

enum AttemptOutcome {
    Success(Page),
    Retryable(FetchError),
    Fatal(FetchError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub struct TransportSession<T: ApiTransport, S: Sleeper = TokioSleeper> {
    transport: T,
    policy: RetryPolicy,
    sleeper: S,
}

impl<T: ApiTransport> TransportSession<T, TokioSleeper> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self::with_sleeper(transport, policy, TokioSleeper)
    }
}

impl<T: ApiTransport, S: Sleeper> TransportSession<T, S> {
    pub fn with_sleeper(transport: T, policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            transport,
            policy,
            sleeper,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Performs one logical call. Every attempt sends the same `request`.
    pub async fn call(&self, request: &PostingListRequest) -> Result<Page, FetchError> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt_index = 0;

        loop {
            debug!(
                "📡 Fetching postings (limit={}, attempt={}/{}, cursor={})",
                request.limit,
                attempt_index + 1,
                max_attempts,
                request.cursor.as_deref().unwrap_or("-")
            );

            let sent = self.transport.send(request).await;
            match self.classify(sent, attempt_index + 1) {
                AttemptOutcome::Success(page) => {
                    info!("📡 Fetched {} postings", page.postings.len());
                    return Ok(page);
                }
                AttemptOutcome::Fatal(err) => {
                    error!("❌ Posting API call failed: {}", err);
                    return Err(err);
                }
                AttemptOutcome::Retryable(err) => {
                    let attempt = RetryAttempt {
                        attempt_index,
                        error_class: err.class(),
                    };

                    if attempt_index + 1 >= max_attempts {
                        error!(
                            "❌ Giving up after {} attempts ({:?}): {}",
                            max_attempts, attempt.error_class, err
                        );
                        return Err(err);
                    }

                    let delay = self.policy.delay_before_retry(attempt_index);
                    warn!(
                        "🔁 {:?} on attempt {}/{}, retrying in {:?}",
                        attempt.error_class,
                        attempt_index + 1,
                        max_attempts,
                        delay
                    );
                    self.sleeper.sleep(delay).await;
                    attempt_index += 1;
                }
            }
        }
    }

    fn classify(
        &self,
        sent: std::result::Result<RawResponse, SendError>,
        attempts: u32,
    ) -> AttemptOutcome {
        let response = match sent {
            Ok(response) => response,
            Err(SendError::Timeout(msg)) => {
                debug!("Request timed out: {}", msg);
                return AttemptOutcome::Retryable(FetchError::Timeout { attempts });
            }
            Err(SendError::Network(msg)) => {
                return AttemptOutcome::Fatal(FetchError::TransportFailure(msg));
            }
        };

        let status = response.status;
        if (200..300).contains(&status) {
            return match serde_json::from_str::<serde_json::Value>(&response.body) {
                Ok(value) if value.is_object() => AttemptOutcome::Success(Page::from_value(&value)),
                Ok(_) => AttemptOutcome::Fatal(FetchError::TransportFailure(
                    "response body is not a JSON object".to_string(),
                )),
                Err(e) => AttemptOutcome::Fatal(FetchError::TransportFailure(format!(
                    "invalid JSON in response body: {}",
                    e
                ))),
            };
        }

        if is_client_error(status) {
            error!("❌ HTTP {} from posting API, response body: {}", status, response.body);
            return AttemptOutcome::Fatal(FetchError::ClientError {
                status,
                body: response.body,
            });
        }

        if self.policy.is_retryable_status(status) {
            let err = if status >= 500 {
                FetchError::ServerError { status, attempts }
            } else {
                FetchError::TransportFailure(format!("HTTP {} after {} attempt(s)", status, attempts))
            };
            return AttemptOutcome::Retryable(err);
        }

        error!("❌ HTTP {} from posting API, response body: {}", status, response.body);
        AttemptOutcome::Fatal(FetchError::TransportFailure(format!("HTTP {}", status)))
    }
}
