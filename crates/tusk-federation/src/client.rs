// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for delivering activities to remote inboxes.
//!
//! Transient failures (timeouts, connection errors, 5xx, 429) are retried
//! with exponential backoff up to the configured attempt count. Other 4xx
//! responses are permanent. A server's `Retry-After` is honored up to a cap.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER, USER_AGENT};
use tracing::{debug, warn};

use tusk_config::model::DeliveryConfig;
use tusk_core::{Account, FailureKind, HandlerContext, Signer, TuskError};
use tusk_resilience::RetryPolicy;

pub const ACTIVITY_CONTENT_TYPE: &str = "application/activity+json";

/// Outcome of a single HTTP attempt.
enum Attempt {
    Delivered,
    Failed {
        kind: FailureKind,
        message: String,
        retry_after: Option<Duration>,
    },
}

#[derive(Clone)]
pub struct DeliveryClient {
    client: reqwest::Client,
    signer: Arc<dyn Signer>,
    retry: RetryPolicy,
    max_retry_after: Duration,
    user_agent: String,
}

impl DeliveryClient {
    pub fn new(config: &DeliveryConfig, signer: Arc<dyn Signer>) -> Result<Self, TuskError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TuskError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            signer,
            retry: RetryPolicy::from(&config.retry),
            max_retry_after: config.max_retry_after(),
            user_agent: config.user_agent.clone(),
        })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// POST `body` to `inbox` on behalf of `actor`, retrying transient failures.
    ///
    /// Stops early with a transient error when the next backoff would run past
    /// the handler deadline, so the whole message is retried later instead.
    pub async fn deliver(
        &self,
        ctx: &HandlerContext,
        actor: &Account,
        inbox: &str,
        body: &[u8],
    ) -> Result<(), TuskError> {
        let url = match reqwest::Url::parse(inbox) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => {
                return Err(delivery_error(
                    inbox,
                    FailureKind::Permanent,
                    format!("unsupported inbox scheme `{}`", url.scheme()),
                ));
            }
            Err(e) => {
                return Err(delivery_error(
                    inbox,
                    FailureKind::Permanent,
                    format!("invalid inbox url: {e}"),
                ));
            }
        };

        let mut attempt = 1;
        loop {
            let (kind, message, retry_after) = match self.attempt(&url, actor, inbox, body).await? {
                Attempt::Delivered => {
                    debug!(inbox, attempt, "activity delivered");
                    return Ok(());
                }
                Attempt::Failed {
                    kind,
                    message,
                    retry_after,
                } => (kind, message, retry_after),
            };

            if kind == FailureKind::Permanent {
                return Err(delivery_error(inbox, kind, message));
            }
            if !self.retry.allows_retry(attempt) {
                return Err(delivery_error(
                    inbox,
                    FailureKind::Exhausted,
                    format!("gave up after {attempt} attempts: {message}"),
                ));
            }

            let backoff = self.retry.delay_for(attempt);
            let delay = retry_after
                .map(|server| server.min(self.max_retry_after).max(backoff))
                .unwrap_or(backoff);
            if delay >= ctx.remaining() {
                return Err(delivery_error(
                    inbox,
                    FailureKind::Transient,
                    format!("handler deadline reached after {attempt} attempts: {message}"),
                ));
            }

            warn!(
                inbox,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %message,
                "delivery failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(
        &self,
        url: &reqwest::Url,
        actor: &Account,
        inbox: &str,
        body: &[u8],
    ) -> Result<Attempt, TuskError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(ACTIVITY_CONTENT_TYPE));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|e| TuskError::Config(format!("invalid user agent: {e}")))?,
        );
        for (name, value) in self.signer.sign(actor, inbox, body)? {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TuskError::Internal(format!("signer produced bad header name: {e}")))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|e| TuskError::Internal(format!("signer produced bad header value: {e}")))?;
            headers.insert(name, value);
        }

        let response = self
            .client
            .post(url.clone())
            .headers(headers)
            .body(body.to_vec())
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                let kind = if e.is_builder() {
                    FailureKind::Permanent
                } else {
                    FailureKind::Transient
                };
                return Ok(Attempt::Failed {
                    kind,
                    message: format!("request failed: {e}"),
                    retry_after: None,
                });
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(Attempt::Delivered);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()));
        let body = response.text().await.unwrap_or_default();
        Ok(Attempt::Failed {
            kind: classify_status(status),
            message: format!("inbox returned {status}: {}", truncate(&body, 200)),
            retry_after,
        })
    }
}

fn delivery_error(inbox: &str, kind: FailureKind, message: String) -> TuskError {
    TuskError::Delivery {
        inbox: inbox.to_string(),
        kind,
        message,
    }
}

/// 429 and 5xx are worth retrying; everything else that is not 2xx is not.
pub fn classify_status(status: StatusCode) -> FailureKind {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        FailureKind::Transient
    } else {
        FailureKind::Permanent
    }
}

/// `Retry-After` as delta-seconds or an HTTP date.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    (at - now).to_std().ok()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_and_server_errors_are_transient() {
        assert_eq!(classify_status(StatusCode::TOO_MANY_REQUESTS), FailureKind::Transient);
        assert_eq!(classify_status(StatusCode::BAD_GATEWAY), FailureKind::Transient);
        assert_eq!(classify_status(StatusCode::GONE), FailureKind::Permanent);
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), FailureKind::Permanent);
    }

    #[test]
    fn retry_after_accepts_seconds_and_dates() {
        let now = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_retry_after("7", now), Some(Duration::from_secs(7)));
        assert_eq!(
            parse_retry_after("Thu, 01 Jan 2026 00:00:30 GMT", now),
            Some(Duration::from_secs(30))
        );
        assert_eq!(parse_retry_after("Wed, 31 Dec 2025 23:00:00 GMT", now), None);
        assert_eq!(parse_retry_after("soon", now), None);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
