//! Request pipeline: resolve → fetch → decode → filter → paginate.
//!
//! A [`FeedService`] holds only immutable state (the endpoint registry, the
//! transport and the fetch limits) and can be shared across tasks behind an
//! `Arc`. Each call builds and drops its own snapshot; nothing is cached
//! between calls.

use std::any::Any;
use std::fmt;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{ErrorKind, FeedError, ProcessingError};
use crate::fetch::{BasicClient, FetchLimits, HttpClient, fetch_bytes};
use crate::filter::{FilterCriteria, filter_entities};
use crate::model::{EntityType, FeedEntity, FeedHeader};
use crate::paginate::{DEFAULT_PAGE_LIMIT, PageResult, paginate, single_page};
use crate::parser;
use crate::registry::EndpointRegistry;

/// Pipeline position of a request, recorded on log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    Fetching,
    Decoding,
    Filtering,
    Paginating,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Resolving => "resolving",
            Stage::Fetching => "fetching",
            Stage::Decoding => "decoding",
            Stage::Filtering => "filtering",
            Stage::Paginating => "paginating",
            Stage::Done => "done",
            Stage::Failed => "failed",
        })
    }
}

/// A page of entities plus the header of the snapshot it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedPage {
    pub header: FeedHeader,
    #[serde(flatten)]
    pub page: PageResult<FeedEntity>,
}

#[derive(Debug, Clone, Copy)]
enum Window {
    Slice { offset: usize, limit: NonZeroUsize },
    Everything,
}

pub struct FeedService {
    registry: Arc<EndpointRegistry>,
    client: Box<dyn HttpClient>,
    limits: FetchLimits,
}

impl FeedService {
    pub fn new(registry: Arc<EndpointRegistry>, client: Box<dyn HttpClient>, limits: FetchLimits) -> Self {
        Self {
            registry,
            client,
            limits,
        }
    }

    /// Service with a plain `reqwest` transport and default limits.
    pub fn with_defaults(registry: Arc<EndpointRegistry>) -> Self {
        Self::new(registry, Box::new(BasicClient::new()), FetchLimits::default())
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Fetches `feed`, keeps the entities matching `criteria` and returns the
    /// requested page of them.
    ///
    /// # Errors
    ///
    /// Exactly one of [`FeedError::EndpointNotFound`], [`FeedError::Fetch`],
    /// [`FeedError::Timeout`] or [`FeedError::Processing`].
    #[tracing::instrument(skip_all, fields(feed = %feed, offset = offset, limit = limit.get()))]
    pub async fn get_entities(
        &self,
        feed: &str,
        criteria: &FilterCriteria,
        offset: usize,
        limit: NonZeroUsize,
    ) -> Result<FeedPage, FeedError> {
        self.run(feed, criteria, Window::Slice { offset, limit }).await
    }

    /// Every alert in `feed`.
    #[tracing::instrument(skip_all, fields(feed = %feed))]
    pub async fn get_alerts(&self, feed: &str) -> Result<FeedPage, FeedError> {
        let criteria = FilterCriteria::new().entity_type(EntityType::Alert);
        self.run(feed, &criteria, Window::Everything).await
    }

    /// Every trip update in `feed` matching `criteria`; any entity type set
    /// on `criteria` is replaced.
    #[tracing::instrument(skip_all, fields(feed = %feed))]
    pub async fn get_trip_updates(
        &self,
        feed: &str,
        criteria: &FilterCriteria,
    ) -> Result<FeedPage, FeedError> {
        let criteria = criteria.clone().entity_type(EntityType::TripUpdate);
        self.run(feed, &criteria, Window::Everything).await
    }

    /// Every vehicle position in `feed` matching `criteria`; any entity type
    /// set on `criteria` is replaced.
    #[tracing::instrument(skip_all, fields(feed = %feed))]
    pub async fn get_vehicle_updates(
        &self,
        feed: &str,
        criteria: &FilterCriteria,
    ) -> Result<FeedPage, FeedError> {
        let criteria = criteria.clone().entity_type(EntityType::Vehicle);
        self.run(feed, &criteria, Window::Everything).await
    }

    /// The first [`DEFAULT_PAGE_LIMIT`] entities of `feed` matching `criteria`.
    #[tracing::instrument(skip_all, fields(feed = %feed))]
    pub async fn get_all_paginated(
        &self,
        feed: &str,
        criteria: &FilterCriteria,
    ) -> Result<FeedPage, FeedError> {
        self.get_entities(feed, criteria, 0, DEFAULT_PAGE_LIMIT).await
    }

    async fn run(
        &self,
        feed: &str,
        criteria: &FilterCriteria,
        window: Window,
    ) -> Result<FeedPage, FeedError> {
        let result = self.pipeline(feed, criteria, window).await;
        if let Err((stage, e)) = &result {
            report_failure(feed, *stage, e);
        }
        result.map_err(|(_, e)| e)
    }

    async fn pipeline(
        &self,
        feed: &str,
        criteria: &FilterCriteria,
        window: Window,
    ) -> Result<FeedPage, (Stage, FeedError)> {
        debug!(stage = %Stage::Resolving, "Resolving feed endpoint");
        let url = self
            .registry
            .resolve(feed)
            .map_err(|e| (Stage::Resolving, e))?;

        info!(stage = %Stage::Fetching, url = %url, "Fetching GTFS-RT feed");
        let bytes = fetch_bytes(self.client.as_ref(), url, &self.limits)
            .await
            .map_err(|e| (Stage::Fetching, e))?;

        contained(|stage| select(&bytes, criteria, window, stage))
    }
}

/// Runs the synchronous tail of the pipeline. A panic in it is reported as a
/// processing failure at the stage it reached instead of unwinding into the
/// caller.
fn contained<T>(
    f: impl FnOnce(&mut Stage) -> Result<T, ProcessingError>,
) -> Result<T, (Stage, FeedError)> {
    let mut stage = Stage::Decoding;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&mut stage)));
    match outcome {
        Ok(result) => result.map_err(|e| (stage, e.into())),
        Err(payload) => Err((
            stage,
            ProcessingError::Internal(panic_message(payload.as_ref())).into(),
        )),
    }
}

fn select(
    bytes: &[u8],
    criteria: &FilterCriteria,
    window: Window,
    stage: &mut Stage,
) -> Result<FeedPage, ProcessingError> {
    *stage = Stage::Decoding;
    debug!(stage = %stage, bytes = bytes.len(), "Decoding GTFS-RT feed");
    let snapshot = parser::decode(bytes)?;
    let entity_count = snapshot.entities.len();

    *stage = Stage::Filtering;
    debug!(stage = %stage, entity_count, ?criteria, "Filtering entities");
    let matched = filter_entities(snapshot.entities, criteria);

    *stage = Stage::Paginating;
    debug!(stage = %stage, total = matched.len(), ?window, "Paginating entities");
    let page = match window {
        Window::Slice { offset, limit } => paginate(matched, offset, limit),
        Window::Everything => single_page(matched),
    };

    info!(
        stage = %Stage::Done,
        entity_count,
        total = page.total,
        returned = page.items.len(),
        "Feed processed successfully"
    );
    Ok(FeedPage {
        header: snapshot.header,
        page,
    })
}

/// Logs a failed request as [`Stage::Failed`], keeping the stage it failed in.
fn report_failure(feed: &str, failed_at: Stage, e: &FeedError) {
    let kind = e.kind();
    let stage = Stage::Failed;
    match kind {
        ErrorKind::EndpointNotFound | ErrorKind::Processing => {
            error!(feed, %stage, %failed_at, %kind, error = %e, error_detail = ?e, "Feed request failed")
        }
        ErrorKind::Fetch | ErrorKind::Timeout => {
            warn!(feed, %stage, %failed_at, %kind, status = e.upstream_status(), error = %e, "Feed request failed")
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic while processing feed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extracts_text() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");

        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "panic while processing feed");
    }

    #[test]
    fn test_panic_keeps_stage_reached() {
        let result: Result<(), _> = contained(|stage| {
            *stage = Stage::Filtering;
            panic!("filter blew up");
        });
        match result {
            Err((stage, FeedError::Processing(ProcessingError::Internal(message)))) => {
                assert_eq!(stage, Stage::Filtering);
                assert_eq!(message, "filter blew up");
            }
            other => panic!("expected an internal processing error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_failure_is_tagged_decoding() {
        let criteria = FilterCriteria::new();
        let window = Window::Everything;
        let result = contained(|stage| select(&[0xff, 0xff], &criteria, window, stage));
        match result {
            Err((stage, e)) => {
                assert_eq!(stage, Stage::Decoding);
                assert_eq!(e.kind(), ErrorKind::Processing);
            }
            Ok(page) => panic!("expected a decode failure, got {page:?}"),
        }
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Resolving.to_string(), "resolving");
        assert_eq!(Stage::Failed.to_string(), "failed");
    }

    #[tokio::test]
    async fn test_unknown_feed_fails_before_fetching() {
        let registry = Arc::new(EndpointRegistry::from_entries([("ACE", "http://127.0.0.1:9/ace")]).unwrap());
        let service = FeedService::with_defaults(registry);
        let err = service.get_alerts("ZZZZZ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EndpointNotFound);
    }
}
