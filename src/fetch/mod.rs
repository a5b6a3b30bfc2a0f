//! Bounded HTTP retrieval of raw feed payloads.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use reqwest::Url;

use crate::error::{FeedError, ProcessingError};

/// Default bound on a single upstream request, body included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
/// Default bound on the size of a feed payload.
pub const DEFAULT_MAX_BYTES: usize = 16 * 1024 * 1024;

/// Time and size bounds applied to every fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub timeout: Duration,
    pub max_bytes: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Issues a single GET for `url` and returns the response body.
///
/// No retry is attempted. Dropping the returned future aborts the request.
///
/// # Errors
///
/// - [`FeedError::Timeout`] if the request or body read exceeds `limits.timeout`
/// - [`FeedError::Fetch`] for non-2xx responses (with status) and connection failures
/// - [`FeedError::Processing`] if the body exceeds `limits.max_bytes`
#[tracing::instrument(skip(client, limits), fields(url = %url))]
pub async fn fetch_bytes<C>(client: &C, url: &Url, limits: &FetchLimits) -> Result<Bytes, FeedError>
where
    C: HttpClient + ?Sized,
{
    let timeout_error = || FeedError::Timeout {
        url: url.to_string(),
        after: limits.timeout,
    };

    let started = std::time::Instant::now();
    let bytes = tokio::time::timeout(limits.timeout, fetch_body(client, url, limits.max_bytes))
        .await
        .map_err(|_| timeout_error())?
        .map_err(|e| match e {
            FetchFailure::Transport(source) if source.is_timeout() => timeout_error(),
            FetchFailure::Transport(source) => FeedError::Fetch {
                url: url.to_string(),
                status: source.status().map(|s| s.as_u16()),
                source: Some(source),
            },
            FetchFailure::Status(status) => FeedError::Fetch {
                url: url.to_string(),
                status: Some(status),
                source: None,
            },
            FetchFailure::TooLarge => ProcessingError::PayloadTooLarge {
                limit: limits.max_bytes,
            }
            .into(),
        })?;

    tracing::debug!(
        bytes = bytes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Feed bytes received"
    );
    Ok(bytes)
}

enum FetchFailure {
    Transport(reqwest::Error),
    Status(u16),
    TooLarge,
}

async fn fetch_body<C>(client: &C, url: &Url, max_bytes: usize) -> Result<Bytes, FetchFailure>
where
    C: HttpClient + ?Sized,
{
    let mut resp = client.get_feed(url).await.map_err(FetchFailure::Transport)?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchFailure::Status(status.as_u16()));
    }

    // Fast path: reject on the advertised length before reading anything.
    if let Some(len) = resp.content_length() {
        if len > max_bytes as u64 {
            return Err(FetchFailure::TooLarge);
        }
    }

    let mut body = BytesMut::new();
    while let Some(chunk) = resp.chunk().await.map_err(FetchFailure::Transport)? {
        if body.len().saturating_add(chunk.len()) > max_bytes {
            return Err(FetchFailure::TooLarge);
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body.freeze())
}
