//! Feed assembly: candidate retrieval, visibility filtering, ranking, pagination
//!
//! A page consumes one contiguous recency window of candidates:
//! 1. Fetch `limit + 1` candidates strictly older than the cursor
//! 2. Evaluate visibility for the batch (bounded concurrency, order preserved)
//! 3. Consume candidates newest first until `limit` survivors are collected;
//!    if the batch runs out first, fetch the next one (up to `max_scan_batches`)
//! 4. Score survivors and order them by combined score
//! 5. Emit the position of the oldest consumed candidate as the next cursor
//!
//! Because windows are contiguous, pages never overlap or skip candidates and
//! every item on page k is newer than every item on page k+1.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::connection_graph::ConnectionGraph;
use super::cursor::FeedCursor;
use super::scoring::{rank_and_truncate, recency_order, ScoringEngine};
use super::visibility::{Viewer, VisibilityEvaluator};
use crate::config::FeedConfig;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{FeedKind, FeedPage, Post, RankedPost, TrustLevel, UserProfile};
use crate::repository::{ConnectionStore, ContentStore, ModerationStore, ProfileStore};

/// Injected storage handles.
#[derive(Clone)]
pub struct FeedStores {
    pub profiles: Arc<dyn ProfileStore>,
    pub connections: Arc<dyn ConnectionStore>,
    pub content: Arc<dyn ContentStore>,
    pub moderation: Arc<dyn ModerationStore>,
}

impl FeedStores {
    /// Use one backend for every collaborator.
    pub fn from_repository<R>(repo: Arc<R>) -> Self
    where
        R: ProfileStore + ConnectionStore + ContentStore + ModerationStore + 'static,
    {
        Self {
            profiles: repo.clone(),
            connections: repo.clone(),
            content: repo.clone(),
            moderation: repo,
        }
    }
}

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

enum CandidateSource {
    Authors(Vec<Uuid>),
    Recent,
}

pub struct FeedAssembler {
    profiles: Arc<dyn ProfileStore>,
    content: Arc<dyn ContentStore>,
    moderation: Arc<dyn ModerationStore>,
    graph: ConnectionGraph,
    evaluator: VisibilityEvaluator,
    scoring: ScoringEngine,
    config: FeedConfig,
    clock: Clock,
}

impl FeedAssembler {
    pub fn new(stores: FeedStores, scoring: ScoringEngine, config: FeedConfig) -> Self {
        let timeout = Duration::from_millis(config.upstream_timeout_ms);
        let graph = ConnectionGraph::new(stores.connections).with_timeout(timeout);

        Self {
            profiles: stores.profiles,
            content: stores.content,
            moderation: stores.moderation,
            evaluator: VisibilityEvaluator::new(graph.clone()),
            graph,
            scoring,
            config,
            clock: Arc::new(Utc::now),
        }
    }

    /// Pin "now" for scoring, e.g. to compare pages across calls.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn clamp_limit(&self, limit: Option<usize>) -> usize {
        limit
            .unwrap_or(self.config.default_limit)
            .clamp(1, self.config.max_limit.max(1))
    }

    /// Assemble one feed page for `viewer_id`.
    ///
    /// A missing or unknown viewer is `Unauthenticated`; any collaborator
    /// failure other than a connection check is `UpstreamUnavailable`.
    /// No partial page is returned on error.
    pub async fn get_feed(
        &self,
        viewer_id: Option<Uuid>,
        kind: FeedKind,
        cursor: Option<FeedCursor>,
        limit: Option<usize>,
    ) -> Result<FeedPage> {
        let started = Instant::now();
        let result = self.assemble(viewer_id, kind, cursor, limit).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.error_code(),
        };
        metrics::record_feed_request(kind.as_str(), outcome, started.elapsed());

        result
    }

    async fn assemble(
        &self,
        viewer_id: Option<Uuid>,
        kind: FeedKind,
        cursor: Option<FeedCursor>,
        limit: Option<usize>,
    ) -> Result<FeedPage> {
        let viewer_id =
            viewer_id.ok_or_else(|| AppError::Unauthenticated("Missing viewer".to_string()))?;
        let viewer = self.load_viewer(viewer_id).await?;
        let limit = self.clamp_limit(limit);
        let now = (self.clock)();

        let source = match kind {
            FeedKind::Network => {
                let mut authors = self
                    .upstream("connection list", self.graph.connection_ids(viewer_id))
                    .await?;
                authors.push(viewer_id);
                CandidateSource::Authors(authors)
            }
            FeedKind::ForYou => CandidateSource::Recent,
        };

        let batch_size = limit + 1;
        let mut position = cursor;
        let mut authors: HashMap<Uuid, UserProfile> = HashMap::new();
        let mut survivors: Vec<Post> = Vec::with_capacity(limit);
        let mut filtered = 0usize;
        let mut has_more = false;

        'scan: for batch_index in 0..self.config.max_scan_batches {
            let mut batch = self.fetch_batch(&source, position, batch_size).await?;
            batch.sort_by(recency_order);
            let exhausted = batch.len() < batch_size;

            self.load_authors(&batch, &mut authors).await?;
            let decisions = self.evaluate_batch(&viewer, &batch, &authors).await;

            for (post, visible) in batch.into_iter().zip(decisions) {
                if survivors.len() == limit {
                    has_more = true;
                    break 'scan;
                }
                position = Some(FeedCursor::from_post(&post));
                if visible {
                    survivors.push(post);
                } else {
                    filtered += 1;
                }
            }

            if exhausted {
                break;
            }
            if survivors.len() == limit || batch_index + 1 == self.config.max_scan_batches {
                has_more = true;
                break;
            }
        }

        metrics::record_candidates(kind.as_str(), survivors.len(), filtered);

        let report_counts = if survivors.is_empty() {
            HashMap::new()
        } else {
            let ids: Vec<Uuid> = survivors.iter().map(|p| p.id).collect();
            self.upstream("moderation report counts", self.moderation.open_report_counts(&ids))
                .await?
        };

        let ranked: Vec<RankedPost> = survivors
            .into_iter()
            .map(|post| {
                let trust = authors
                    .get(&post.author_id)
                    .map(|a| a.trust_level)
                    .unwrap_or(TrustLevel::Unverified);
                let reports = report_counts.get(&post.id).copied().unwrap_or(0);
                let score = self.scoring.score_post(&post, trust, reports, now);
                RankedPost { post, score }
            })
            .collect();
        let items = rank_and_truncate(ranked, limit);

        let next_cursor = if has_more {
            position.map(|p| p.encode())
        } else {
            None
        };

        info!(
            viewer_id = %viewer_id,
            kind = kind.as_str(),
            limit,
            items = items.len(),
            filtered,
            has_more = next_cursor.is_some(),
            "Feed generated"
        );

        Ok(FeedPage { items, next_cursor })
    }

    async fn load_viewer(&self, viewer_id: Uuid) -> Result<Viewer> {
        let profile = self
            .upstream("viewer profile", self.profiles.get_profile(viewer_id))
            .await?
            .ok_or_else(|| AppError::Unauthenticated("Unknown viewer".to_string()))?;

        if profile.is_disabled() {
            return Err(AppError::Unauthenticated(
                "Viewer account is disabled".to_string(),
            ));
        }

        Ok(Viewer::Authenticated(profile))
    }

    async fn fetch_batch(
        &self,
        source: &CandidateSource,
        before: Option<FeedCursor>,
        limit: usize,
    ) -> Result<Vec<Post>> {
        match source {
            CandidateSource::Authors(author_ids) => {
                self.upstream(
                    "posts by authors",
                    self.content.list_by_authors(author_ids, before, limit),
                )
                .await
            }
            CandidateSource::Recent => {
                self.upstream("recent posts", self.content.list_recent(before, limit))
                    .await
            }
        }
    }

    async fn load_authors(
        &self,
        batch: &[Post],
        authors: &mut HashMap<Uuid, UserProfile>,
    ) -> Result<()> {
        let mut missing: Vec<Uuid> = batch
            .iter()
            .map(|p| p.author_id)
            .filter(|id| !authors.contains_key(id))
            .collect();
        missing.sort_unstable();
        missing.dedup();

        if missing.is_empty() {
            return Ok(());
        }

        let found = self
            .upstream("author profiles", self.profiles.get_profiles(&missing))
            .await?;
        debug!(requested = missing.len(), found = found.len(), "Loaded author profiles");
        authors.extend(found);
        Ok(())
    }

    async fn evaluate_batch(
        &self,
        viewer: &Viewer,
        batch: &[Post],
        authors: &HashMap<Uuid, UserProfile>,
    ) -> Vec<bool> {
        stream::iter(batch)
            .map(|post| {
                self.evaluator
                    .can_view(viewer, post, authors.get(&post.author_id))
            })
            .buffered(self.config.evaluation_concurrency.max(1))
            .collect()
            .await
    }

    /// Run a collaborator call under the upstream timeout, mapping any
    /// failure to `UpstreamUnavailable`.
    async fn upstream<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let timeout = Duration::from_millis(self.config.upstream_timeout_ms);
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!(operation, error = %e, "Upstream call failed");
                Err(AppError::UpstreamUnavailable(format!(
                    "{} failed: {}",
                    operation, e
                )))
            }
            Err(_) => {
                error!(operation, timeout_ms = self.config.upstream_timeout_ms, "Upstream call timed out");
                Err(AppError::UpstreamUnavailable(format!(
                    "{} timed out after {:?}",
                    operation, timeout
                )))
            }
        }
    }
}
