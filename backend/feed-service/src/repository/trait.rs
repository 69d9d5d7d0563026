use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{ConnectionStatus, Post, UserProfile};
use crate::services::cursor::FeedCursor;

/// User/profile lookups: trust level and school affiliations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>>;

    /// Batch lookup. Unknown ids are absent from the map.
    async fn get_profiles(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, UserProfile>> {
        let mut profiles = HashMap::with_capacity(user_ids.len());
        for id in user_ids {
            if let Some(profile) = self.get_profile(*id).await? {
                profiles.insert(*id, profile);
            }
        }
        Ok(profiles)
    }
}

/// Directed connection edges between users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Status of the edge `requester -> addressee`, if one exists.
    async fn connection_status(
        &self,
        requester_id: Uuid,
        addressee_id: Uuid,
    ) -> Result<Option<ConnectionStatus>>;

    /// Users with an accepted edge to or from `user_id`.
    async fn accepted_connection_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>>;
}

/// Post retrieval. Results are newest first (`created_at DESC, id DESC`),
/// strictly before `before` when given, and exclude soft-deleted posts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn list_by_authors(
        &self,
        author_ids: &[Uuid],
        before: Option<FeedCursor>,
        limit: usize,
    ) -> Result<Vec<Post>>;

    async fn list_recent(&self, before: Option<FeedCursor>, limit: usize) -> Result<Vec<Post>>;
}

/// Open moderation reports per post.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModerationStore: Send + Sync {
    async fn open_report_count(&self, post_id: Uuid) -> Result<u32>;

    /// Batch lookup. Posts without open reports may be absent from the map.
    async fn open_report_counts(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, u32>> {
        let mut counts = HashMap::with_capacity(post_ids.len());
        for id in post_ids {
            counts.insert(*id, self.open_report_count(*id).await?);
        }
        Ok(counts)
    }
}

/// Readiness probe for the backing store.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn ping(&self) -> Result<()>;
}
