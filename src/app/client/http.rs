//! Core HTTP operations with rate limiting and retry logic
//!
//! This module provides the fundamental HTTP request operations with
//! rate limiting and exponential backoff for transient failures.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::app::client::auth::Authorization;
use crate::app::client::config::ClientConfig;
use crate::constants::limits;
use crate::errors::{DownloadError, DownloadResult};

type DirectRateLimiter = RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>;

/// HTTP operations handler with resilience patterns
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: DirectRateLimiter,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl HttpHandler {
    /// Creates a new HttpHandler from a client configuration
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the client cannot be built or the rate
    /// limit is zero
    pub fn new(config: &ClientConfig) -> DownloadResult<Self> {
        let client = config.build_http_client()?;
        let rate_limiter = Self::build_rate_limiter(config.rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
        })
    }

    /// Builds the rate limiter with the specified rate limit
    fn build_rate_limiter(rate_limit_rps: u32) -> DownloadResult<DirectRateLimiter> {
        let rps =
            NonZeroU32::new(rate_limit_rps).ok_or_else(|| DownloadError::InvalidClientConfig {
                reason: "Rate limit must be non-zero".to_string(),
            })?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    /// Exponential backoff, capped at [`limits::MAX_RETRY_DELAY`]
    fn retry_delay(&self, attempt: u32) -> Duration {
        2_u32
            .checked_pow(attempt)
            .and_then(|factor| self.retry_base_delay.checked_mul(factor))
            .map_or(limits::MAX_RETRY_DELAY, |delay| {
                delay.min(limits::MAX_RETRY_DELAY)
            })
    }

    /// Sends a GET request with rate limiting and retry logic
    ///
    /// 429 and 503 responses and transport errors are retried with
    /// exponential backoff. Every other response, including 401, is returned
    /// to the caller.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the request still fails after all retries
    pub async fn get_response(
        &self,
        url: &Url,
        authorization: Option<&Authorization>,
    ) -> DownloadResult<reqwest::Response> {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;

        let mut retries = 0;
        loop {
            let mut request = self.client.get(url.as_str());
            if let Some(authorization) = authorization {
                request = authorization.apply(request);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let transient = status == StatusCode::TOO_MANY_REQUESTS
                        || status == StatusCode::SERVICE_UNAVAILABLE;

                    if !transient {
                        tracing::debug!("Fetched response {} for {}", status, url);
                        return Ok(response);
                    }

                    if retries >= self.max_retries {
                        return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                            DownloadError::RateLimitExceeded
                        } else {
                            DownloadError::ServerOverloaded
                        });
                    }

                    retries += 1;
                    let delay = self.retry_delay(retries);
                    tracing::warn!(
                        "Server responded {} for {}. Backing off for {}ms",
                        status,
                        url,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if retries < self.max_retries => {
                    retries += 1;
                    let delay = self.retry_delay(retries);
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {}ms",
                        retries,
                        self.max_retries,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        "Request failed after {} retries: {}",
                        self.max_retries,
                        e
                    );
                    return Err(DownloadError::MaxRetriesExceeded {
                        max_retries: self.max_retries,
                    });
                }
            }
        }
    }
}
