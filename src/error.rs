//! Failure taxonomy of the feed pipeline.
//!
//! Every call into [`crate::service::FeedService`] ends in either a page of
//! entities or exactly one [`FeedError`]. Mapping the kinds onto transport
//! status codes or exit codes is left to the caller.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed identifier has no configured upstream URL. This is a
    /// deployment defect rather than a user error.
    #[error("no endpoint configured for feed '{feed}'")]
    EndpointNotFound { feed: String },

    /// The upstream could not be fetched. `status` is the upstream HTTP status
    /// when one was received.
    #[error("{}", fetch_message(url, *status))]
    Fetch {
        url: String,
        status: Option<u16>,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The upstream did not answer within the configured bound.
    #[error("timed out after {}ms fetching {url}", after.as_millis())]
    Timeout { url: String, after: Duration },

    /// The payload could not be turned into a feed snapshot.
    #[error("error processing feed: {0}")]
    Processing(#[from] ProcessingError),
}

fn fetch_message(url: &str, status: Option<u16>) -> String {
    match status {
        Some(code) => format!("[{code}]: error fetching feed from {url}"),
        None => format!("error fetching feed from {url}"),
    }
}

/// Coarse classification of a [`FeedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EndpointNotFound,
    Fetch,
    Timeout,
    Processing,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::EndpointNotFound => "endpoint_not_found",
            ErrorKind::Fetch => "fetch_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Processing => "processing_error",
        })
    }
}

impl FeedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FeedError::EndpointNotFound { .. } => ErrorKind::EndpointNotFound,
            FeedError::Fetch { .. } => ErrorKind::Fetch,
            FeedError::Timeout { .. } => ErrorKind::Timeout,
            FeedError::Processing(_) => ErrorKind::Processing,
        }
    }

    /// Upstream HTTP status carried by a [`FeedError::Fetch`].
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            FeedError::Fetch { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether a layer above may reasonably retry the call.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Fetch | ErrorKind::Timeout)
    }
}

/// Reasons a fetched payload could not become a [`crate::model::FeedSnapshot`].
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("malformed protobuf payload: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("entity '{entity_id}' has none of alert, trip_update or vehicle set")]
    MissingVariant { entity_id: String },

    #[error("entity '{entity_id}' has more than one variant set: {}", populated.join(", "))]
    AmbiguousVariant {
        entity_id: String,
        populated: Vec<&'static str>,
    },

    #[error("{context} is missing required field '{field}'")]
    MissingField { context: String, field: &'static str },

    #[error("entity '{entity_id}' has unknown vehicle stop status {value}")]
    UnknownStatus { entity_id: String, value: i32 },

    #[error("payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("internal error: {0}")]
    Internal(String),
}
