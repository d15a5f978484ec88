//! Middleware stack wrapped around every vendor request.
//!
//! The outer layer retries transient failures with exponential backoff. The
//! inner layer runs once per attempt: it takes a request slot and a rate slot,
//! sends, and counts the response. 404 and 429 are final at this level; the
//! client turns them into empty observations and uncounted waits.

use super::{RateLimiter, RequestMetrics, Throttler, backoff_delay};
use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;
use http::Extensions;
use reqwest::{Request, Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::{Jitter, RetryTransientMiddleware, Retryable, RetryableStrategy};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "middleware";

/// Per-send state handed down the stack as a request extension.
///
/// Clones share the attempt counter, so the sender can read how many attempts
/// the retry layer made once the send returns.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    attempts: Arc<AtomicU32>,
}

impl RequestContext {
    #[must_use]
    pub fn new(cancel: &CancellationToken) -> Self {
        Self {
            cancel: cancel.clone(),
            attempts: Arc::default(),
        }
    }

    /// Attempts that reached the gates so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }
}

/// Shared state every attempt passes through.
#[derive(Debug)]
pub struct Gates {
    pub requests: Arc<Throttler>,
    pub rate: RateLimiter,
    pub metrics: RequestMetrics,
}

/// Request slot, then rate slot, then the send. Every response is counted.
#[derive(Debug)]
struct Pacing {
    gates: Arc<Gates>,
}

#[async_trait::async_trait]
impl Middleware for Pacing {
    async fn handle(&self, req: Request, extensions: &mut Extensions, next: Next<'_>) -> reqwest_middleware::Result<Response> {
        let context = extensions.get::<RequestContext>().cloned().unwrap_or_default();
        let attempt = context.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        if attempt > 1 {
            log::debug!(target: LOG_TARGET, "attempt {attempt} for {}", req.url().path());
        }

        let _permit = self
            .gates
            .requests
            .acquire(&context.cancel)
            .await
            .map_err(reqwest_middleware::Error::middleware)?;
        self.gates.rate.wait().await;

        let path = req.url().path().to_string();
        let start = Instant::now();
        let response = next.run(req, extensions).await?;

        let status = response.status().as_u16();
        self.gates.metrics.record(status, start.elapsed());
        log::trace!(target: LOG_TARGET, "HTTP {status} {path} in {}ms", start.elapsed().as_millis());
        Ok(response)
    }
}

/// Which outcomes the retry layer may repeat.
#[derive(Debug, Clone, Copy)]
struct VendorRetryStrategy;

impl RetryableStrategy for VendorRetryStrategy {
    fn handle(&self, res: &reqwest_middleware::Result<Response>) -> Option<Retryable> {
        match res {
            Ok(response) => classify_status(response.status()),
            Err(reqwest_middleware::Error::Reqwest(_)) => Some(Retryable::Transient),

            // raised by the gates once the request is cancelled
            Err(reqwest_middleware::Error::Middleware(_)) => Some(Retryable::Fatal),
        }
    }
}

fn classify_status(status: StatusCode) -> Option<Retryable> {
    match status {
        StatusCode::OK => None,
        StatusCode::NOT_FOUND | StatusCode::TOO_MANY_REQUESTS => Some(Retryable::Fatal),
        _ => Some(Retryable::Transient),
    }
}

/// Backoff of `base * 2^n` after the `n+1`-th counted failure, for `max_attempts` attempts in all.
#[must_use]
pub fn retry_policy(base: Duration, max_attempts: u32) -> ExponentialBackoff {
    let retries = max_attempts.max(1) - 1;
    ExponentialBackoff::builder()
        .retry_bounds(base, backoff_delay(base, retries.max(1)))
        .jitter(Jitter::None)
        .base(2)
        .build_with_max_retries(retries)
}

/// Wrap `http` in the retry and pacing layers.
pub fn with_middleware(http: reqwest::Client, gates: Arc<Gates>, backoff_base: Duration, max_attempts: u32) -> ClientWithMiddleware {
    ClientBuilder::new(http)
        .with(RetryTransientMiddleware::new_with_policy_and_strategy(
            retry_policy(backoff_base, max_attempts),
            VendorRetryStrategy,
        ))
        .with(Pacing { gates })
        .build()
}
