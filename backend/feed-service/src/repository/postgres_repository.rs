use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ConnectionStore, ContentStore, HealthProbe, ModerationStore, ProfileStore};
use crate::models::{ConnectionStatus, Post, PrivacyPreference, TrustLevel, UserProfile, Visibility};
use crate::services::cursor::FeedCursor;

/// PostgreSQL-backed implementation of every storage collaborator.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    display_name: Option<String>,
    trust_level: Option<String>,
    privacy: Option<String>,
    disabled_at: Option<DateTime<Utc>>,
    school_ids: Vec<Uuid>,
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            display_name: row.display_name.unwrap_or_default(),
            trust_level: TrustLevel::from_db(row.trust_level.as_deref()),
            school_ids: row.school_ids,
            privacy: PrivacyPreference::from_db(row.privacy.as_deref()),
            disabled_at: row.disabled_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    author_id: Uuid,
    body: String,
    media_urls: Vec<String>,
    visibility: Option<String>,
    created_at: DateTime<Utc>,
    like_count: i64,
    comment_count: i64,
    share_count: i64,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            body: row.body,
            media_urls: row.media_urls,
            visibility: Visibility::from_db(row.visibility.as_deref()),
            created_at: row.created_at,
            like_count: row.like_count,
            comment_count: row.comment_count,
            share_count: row.share_count,
            deleted_at: row.deleted_at,
        }
    }
}

const PROFILE_SELECT: &str = r#"
    SELECT p.id,
           p.display_name,
           p.trust_level,
           p.privacy,
           p.disabled_at,
           COALESCE(
               array_agg(m.school_id) FILTER (WHERE m.school_id IS NOT NULL),
               '{}'::uuid[]
           ) AS school_ids
    FROM profiles p
    LEFT JOIN school_memberships m ON m.user_id = p.id
"#;

const POST_COLUMNS: &str = r#"
    id,
    author_id,
    COALESCE(body, '') AS body,
    COALESCE(media_urls, '{}'::text[]) AS media_urls,
    visibility,
    created_at,
    COALESCE(like_count, 0)::bigint AS like_count,
    COALESCE(comment_count, 0)::bigint AS comment_count,
    COALESCE(share_count, 0)::bigint AS share_count,
    deleted_at
"#;

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthProbe for PostgresRepository {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("PostgreSQL health check failed")?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for PostgresRepository {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        let query = format!("{} WHERE p.id = $1 GROUP BY p.id", PROFILE_SELECT);
        let row = sqlx::query_as::<_, ProfileRow>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load profile")?;

        Ok(row.map(UserProfile::from))
    }

    async fn get_profiles(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, UserProfile>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = format!("{} WHERE p.id = ANY($1) GROUP BY p.id", PROFILE_SELECT);
        let rows = sqlx::query_as::<_, ProfileRow>(&query)
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await
            .context("Failed to batch load profiles")?;

        debug!(requested = user_ids.len(), found = rows.len(), "Loaded profiles");

        Ok(rows
            .into_iter()
            .map(|row| (row.id, UserProfile::from(row)))
            .collect())
    }
}

#[async_trait]
impl ConnectionStore for PostgresRepository {
    async fn connection_status(
        &self,
        requester_id: Uuid,
        addressee_id: Uuid,
    ) -> Result<Option<ConnectionStatus>> {
        let row = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT status
            FROM connections
            WHERE requester_id = $1 AND addressee_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(requester_id)
        .bind(addressee_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load connection status")?;

        Ok(row.and_then(|(status,)| {
            let parsed = ConnectionStatus::from_db(&status);
            if parsed.is_none() {
                warn!(
                    requester = %requester_id,
                    addressee = %addressee_id,
                    status = %status,
                    "Unrecognized connection status"
                );
            }
            parsed
        }))
    }

    async fn accepted_connection_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query_as::<_, (Uuid,)>(
            r#"
            SELECT DISTINCT
                CASE WHEN requester_id = $1 THEN addressee_id ELSE requester_id END
            FROM connections
            WHERE status = 'accepted'
              AND (requester_id = $1 OR addressee_id = $1)
              AND requester_id <> addressee_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load accepted connections")?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[async_trait]
impl ContentStore for PostgresRepository {
    async fn list_by_authors(
        &self,
        author_ids: &[Uuid],
        before: Option<FeedCursor>,
        limit: usize,
    ) -> Result<Vec<Post>> {
        if author_ids.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let query = format!(
            r#"
            SELECT {}
            FROM posts
            WHERE author_id = ANY($1)
              AND deleted_at IS NULL
              AND ($2::timestamptz IS NULL OR (created_at, id) < ($2::timestamptz, $3::uuid))
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            "#,
            POST_COLUMNS
        );

        let rows = sqlx::query_as::<_, PostRow>(&query)
            .bind(author_ids)
            .bind(before.map(|c| c.created_at))
            .bind(before.map(|c| c.post_id))
            .bind(limit_param(limit))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list posts by authors")?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn list_recent(&self, before: Option<FeedCursor>, limit: usize) -> Result<Vec<Post>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query = format!(
            r#"
            SELECT {}
            FROM posts
            WHERE deleted_at IS NULL
              AND ($1::timestamptz IS NULL OR (created_at, id) < ($1::timestamptz, $2::uuid))
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
            POST_COLUMNS
        );

        let rows = sqlx::query_as::<_, PostRow>(&query)
            .bind(before.map(|c| c.created_at))
            .bind(before.map(|c| c.post_id))
            .bind(limit_param(limit))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list recent posts")?;

        Ok(rows.into_iter().map(Post::from).collect())
    }
}

#[async_trait]
impl ModerationStore for PostgresRepository {
    async fn open_report_count(&self, post_id: Uuid) -> Result<u32> {
        let (count,) = sqlx::query_as::<_, (i64,)>(
            r#"
            SELECT COUNT(*)
            FROM post_reports
            WHERE post_id = $1 AND status = 'open'
            "#,
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count open reports")?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn open_report_counts(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, u32>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT post_id, COUNT(*)
            FROM post_reports
            WHERE post_id = ANY($1) AND status = 'open'
            GROUP BY post_id
            "#,
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to batch count open reports")?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, u32::try_from(count).unwrap_or(u32::MAX)))
            .collect())
    }
}
