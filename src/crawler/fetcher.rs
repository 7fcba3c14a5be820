//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the mirror, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Following redirects only while they stay on the requested host
//! - Streaming response bodies with periodic progress reports
//! - Optional byte-rate throttling
//! - Error classification

use crate::config::{parse_rate_limit, HttpOptions};
use crate::output::{TransferLog, TransferProgress};
use crate::url::same_host;
use crate::MirrorError;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, redirect, Client};
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// How often progress is reported while a body streams in
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Upper bound on the buffer reserved up front from Content-Length
const MAX_PREALLOCATION: u64 = 8 * 1024 * 1024;

/// Redirect hops followed before a request is abandoned
pub const MAX_REDIRECTS: usize = 10;

/// Transport-level failures
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("failed to read body of {url}: {message}")]
    Body { url: String, message: String },
}

impl FetchError {
    fn from_request(url: &Url, error: reqwest::Error) -> Self {
        let url = url.to_string();
        if error.is_timeout() {
            FetchError::Timeout { url }
        } else if error.is_connect() {
            FetchError::Connect {
                url,
                message: error.to_string(),
            }
        } else {
            FetchError::Network {
                url,
                message: error.to_string(),
            }
        }
    }

    fn from_body(url: &Url, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return FetchError::Timeout {
                url: url.to_string(),
            };
        }
        FetchError::Body {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// A completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// URL that produced this response, after any redirects
    pub final_url: Url,

    /// HTTP status code
    pub status: u16,

    /// Content-Type header value (empty when absent)
    pub content_type: String,

    /// Content-Length announced by the server
    pub content_length: Option<u64>,

    /// Response body; empty for non-2xx responses
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Returns true for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true if the Content-Type declares an HTML document
    pub fn is_html(&self) -> bool {
        self.content_type
            .trim_start()
            .to_ascii_lowercase()
            .starts_with("text/html")
    }
}

/// Retrieves one URL
///
/// Implementations report `status`, `content_info` and `progress` to the
/// log. The caller owns the `start`, `saving_to`, `done` and `error` events.
/// A non-2xx answer is returned as a response, not an error.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url, log: &dyn TransferLog) -> Result<FetchResponse, FetchError>;
}

/// Builds an HTTP client with the configured user agent and timeouts
///
/// Redirects are followed up to [`MAX_REDIRECTS`] hops while they stay on
/// the host of the original request. A redirect to another host is not
/// followed; the 3xx response itself is returned.
///
/// # Example
///
/// ```
/// use sumi_mirror::config::HttpOptions;
/// use sumi_mirror::crawler::build_http_client;
///
/// let client = build_http_client(&HttpOptions::default()).unwrap();
/// ```
pub fn build_http_client(options: &HttpOptions) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(options.user_agent.clone())
        .timeout(Duration::from_secs(options.timeout_secs))
        .connect_timeout(Duration::from_secs(options.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .redirect(same_host_redirects())
        .build()
}

fn same_host_redirects() -> redirect::Policy {
    redirect::Policy::custom(|attempt| {
        let leaves_host = attempt
            .previous()
            .first()
            .map_or(false, |origin| !same_host(origin, attempt.url()));

        if leaves_host {
            tracing::debug!("Not following redirect to {}", attempt.url());
            attempt.stop()
        } else if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error(format!("more than {} redirects", MAX_REDIRECTS))
        } else {
            attempt.follow()
        }
    })
}

/// [`Fetcher`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    rate_limit: Option<u64>,
    progress_interval: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher from the `[http]` options
    pub fn new(options: &HttpOptions) -> Result<Self, MirrorError> {
        let client = build_http_client(options)?;
        let rate_limit = match options.rate_limit.as_deref() {
            Some(rate) => parse_rate_limit(rate)?,
            None => None,
        };

        Ok(Self::with_client(client).with_rate_limit(rate_limit))
    }

    /// Wraps an existing client with no throttling
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            rate_limit: None,
            progress_interval: PROGRESS_INTERVAL,
        }
    }

    /// Caps the body transfer rate in bytes per second
    pub fn with_rate_limit(mut self, bytes_per_sec: Option<u64>) -> Self {
        self.rate_limit = bytes_per_sec.filter(|rate| *rate > 0);
        self
    }

    /// Changes how often progress is reported
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// The active rate limit, if any
    pub fn rate_limit(&self) -> Option<u64> {
        self.rate_limit
    }

    /// Sleeps until `written` bytes are no longer ahead of the allowed rate
    async fn throttle(&self, written: u64, started: Instant) {
        let Some(limit) = self.rate_limit else {
            return;
        };

        let allowed = Duration::from_secs_f64(written as f64 / limit as f64);
        let elapsed = started.elapsed();
        if allowed > elapsed {
            tokio::time::sleep(allowed - elapsed).await;
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, log: &dyn TransferLog) -> Result<FetchResponse, FetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_request(url, e))?;

        let final_url = response.url().clone();
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let content_length = response.content_length();

        log.status(url, status);

        if !response.status().is_success() {
            return Ok(FetchResponse {
                final_url,
                status,
                content_type,
                content_length,
                body: Vec::new(),
            });
        }

        log.content_info(url, content_length);

        let capacity = content_length.unwrap_or(0).min(MAX_PREALLOCATION) as usize;
        let mut body = Vec::with_capacity(capacity);
        let started = Instant::now();
        let mut last_report = started;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::from_body(url, e))?
        {
            body.extend_from_slice(&chunk);
            let written = body.len() as u64;

            self.throttle(written, started).await;

            if last_report.elapsed() >= self.progress_interval {
                let progress = TransferProgress::measure(written, content_length, started.elapsed());
                log.progress(url, &progress);
                last_report = Instant::now();
            }
        }

        let progress =
            TransferProgress::measure(body.len() as u64, content_length, started.elapsed());
        log.progress(url, &progress);

        tracing::trace!("Fetched {} bytes from {}", body.len(), url);

        if final_url != *url {
            tracing::debug!("{} redirected to {}", url, final_url);
        }

        Ok(FetchResponse {
            final_url,
            status,
            content_type,
            content_length,
            body,
        })
    }
}
