//! Feed identifier → upstream URL mapping.
//!
//! Built once at startup and never mutated, so it can be shared across
//! concurrent requests behind an `Arc` without locking.
//!
//! The on-disk form is a plain JSON object:
//! ```json
//! {
//!   "ACE": "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-ace",
//!   "G":   "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-g"
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use reqwest::Url;
use thiserror::Error;

use crate::error::FeedError;

const MTA_FEED_BASE_URL: &str = "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds";

/// MTA real-time feeds and their path under [`MTA_FEED_BASE_URL`].
const MTA_FEEDS: &[(&str, &str)] = &[
    ("ACE", "nyct%2Fgtfs-ace"),
    ("BDFM", "nyct%2Fgtfs-bdfm"),
    ("G", "nyct%2Fgtfs-g"),
    ("JZ", "nyct%2Fgtfs-jz"),
    ("NQRW", "nyct%2Fgtfs-nqrw"),
    ("L", "nyct%2Fgtfs-l"),
    ("S1234567", "nyct%2Fgtfs"),
    ("SIR", "nyct%2Fgtfs-si"),
    ("LIRR", "lirr%2Fgtfs-lirr"),
    ("MNR", "mnr%2Fgtfs-mnr"),
];

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read feed endpoint file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid feed endpoint file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("feed '{feed}' has an invalid URL '{url}': {source}")]
    InvalidUrl {
        feed: String,
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    endpoints: BTreeMap<String, Url>,
}

impl EndpointRegistry {
    /// Builds a registry from `(feed, url)` pairs, rejecting unparsable URLs.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let endpoints = entries
            .into_iter()
            .map(|(feed, url)| {
                let feed = feed.into();
                let raw = url.as_ref();
                match Url::parse(raw) {
                    Ok(parsed) => Ok((feed, parsed)),
                    Err(source) => Err(RegistryError::InvalidUrl {
                        feed,
                        url: raw.to_string(),
                        source,
                    }),
                }
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self { endpoints })
    }

    /// Loads the registry from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&content)?;
        let registry = Self::from_entries(entries)?;
        tracing::info!(
            path = %path.display(),
            feeds = registry.len(),
            "Loaded feed endpoints"
        );
        Ok(registry)
    }

    /// The public MTA subway, LIRR and Metro-North feeds.
    pub fn mta_defaults() -> Self {
        let endpoints = MTA_FEEDS
            .iter()
            .filter_map(|(feed, path)| {
                Url::parse(&format!("{MTA_FEED_BASE_URL}/{path}"))
                    .ok()
                    .map(|url| (feed.to_string(), url))
            })
            .collect();
        Self { endpoints }
    }

    /// Returns the upstream URL for `feed`.
    ///
    /// # Errors
    ///
    /// [`FeedError::EndpointNotFound`] if the feed is not configured.
    pub fn resolve(&self, feed: &str) -> Result<&Url, FeedError> {
        self.endpoints
            .get(feed)
            .ok_or_else(|| FeedError::EndpointNotFound {
                feed: feed.to_string(),
            })
    }

    /// Iterates over `(feed, url)` pairs in feed order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Url)> {
        self.endpoints.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
