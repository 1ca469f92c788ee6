// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry with exponential backoff for Kubernetes API and Infoblox WAPI calls.
//!
//! Transient failures (429, 5xx, connection errors) are retried with jittered
//! exponential backoff; everything else fails immediately. Both backoffs stop well
//! inside the reconcile deadline so a retrying call never outlives its reconcile.

use anyhow::Result;
use rand::Rng;
use reqwest::StatusCode;
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

const BACKOFF_MULTIPLIER: f64 = 2.0;
const RANDOMIZATION_FACTOR: f64 = 0.1;

const KUBE_INITIAL_INTERVAL_MILLIS: u64 = 100;
const KUBE_MAX_INTERVAL_SECS: u64 = 5;
const KUBE_MAX_ELAPSED_TIME_SECS: u64 = 20;

const WAPI_INITIAL_INTERVAL_MILLIS: u64 = 250;
const WAPI_MAX_INTERVAL_SECS: u64 = 5;
const WAPI_MAX_ELAPSED_TIME_SECS: u64 = 20;

/// Jittered exponential backoff.
#[derive(Debug)]
pub struct ExponentialBackoff {
    pub current_interval: Duration,
    pub max_interval: Duration,
    pub max_elapsed_time: Option<Duration>,
    pub multiplier: f64,
    pub randomization_factor: f64,
    start_time: Instant,
}

impl ExponentialBackoff {
    fn new(initial_interval: Duration, max_interval: Duration, max_elapsed_time: Duration) -> Self {
        Self {
            current_interval: initial_interval,
            max_interval,
            max_elapsed_time: Some(max_elapsed_time),
            multiplier: BACKOFF_MULTIPLIER,
            randomization_factor: RANDOMIZATION_FACTOR,
            start_time: Instant::now(),
        }
    }

    /// Next delay, or `None` once the elapsed budget is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if let Some(max_elapsed) = self.max_elapsed_time {
            if self.start_time.elapsed() >= max_elapsed {
                return None;
            }
        }

        let interval = self.current_interval;
        let jittered = self.apply_jitter(interval);

        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        Some(jittered)
    }

    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;

        let mut rng = rand::thread_rng();
        let jittered = rng.gen_range((secs - delta)..=(secs + delta));

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Backoff for Kubernetes API calls: 100ms doubling to 5s, for at most 20s.
#[must_use]
pub fn kube_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(KUBE_INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(KUBE_MAX_INTERVAL_SECS),
        Duration::from_secs(KUBE_MAX_ELAPSED_TIME_SECS),
    )
}

/// Backoff for Infoblox WAPI calls: 250ms doubling to 5s, for at most 20s.
#[must_use]
pub fn wapi_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(WAPI_INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(WAPI_MAX_INTERVAL_SECS),
        Duration::from_secs(WAPI_MAX_ELAPSED_TIME_SECS),
    )
}

/// Whether an HTTP status is worth retrying.
#[must_use]
pub fn is_retryable_http_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Whether a Kubernetes API error is transient.
pub(crate) fn is_retryable_kube_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(api_err) => api_err.code == 429 || (500..600).contains(&api_err.code),
        kube::Error::Service(_) => true,
        _ => false,
    }
}

/// Run `operation` until it succeeds, fails permanently, or `backoff` runs out.
///
/// # Errors
///
/// Returns the last error once it is not retryable or the backoff is exhausted.
pub async fn retry_with<T, E, F, Fut>(
    mut operation: F,
    operation_name: &str,
    mut backoff: ExponentialBackoff,
    retryable: fn(&E) -> bool,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display + Into<anyhow::Error>,
{
    let start_time = Instant::now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        "Call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) if !retryable(&e) => {
                debug!(operation = operation_name, error = %e, "Non-retryable error");
                return Err(e.into());
            }
            Err(e) => {
                let Some(delay) = backoff.next_backoff() else {
                    error!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        error = %e,
                        "Backoff exhausted, giving up"
                    );
                    return Err(anyhow::anyhow!(
                        "{operation_name}: backoff exhausted after {attempt} attempts: {e}"
                    ));
                };
                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    retry_after = ?delay,
                    error = %e,
                    "Retryable error, will retry"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Retry a Kubernetes API call on transient errors.
///
/// # Errors
///
/// See [`retry_with`].
pub async fn retry_api_call<T, F, Fut>(operation: F, operation_name: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, kube::Error>>,
{
    retry_with(operation, operation_name, kube_backoff(), is_retryable_kube_error).await
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
