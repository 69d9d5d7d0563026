//! In-memory storage collaborators
//!
//! Backs integration tests and local tooling. Each store can be switched into
//! a failing mode to simulate an unavailable upstream.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use uuid::Uuid;

use super::{ConnectionStore, ContentStore, HealthProbe, ModerationStore, ProfileStore};
use crate::models::{Connection, ConnectionStatus, Post, UserProfile};
use crate::services::cursor::FeedCursor;
use crate::services::scoring::recency_order;

#[derive(Default)]
struct State {
    profiles: HashMap<Uuid, UserProfile>,
    connections: Vec<Connection>,
    posts: Vec<Post>,
    open_reports: HashMap<Uuid, u32>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
    fail_profiles: AtomicBool,
    fail_connections: AtomicBool,
    fail_content: AtomicBool,
    fail_moderation: AtomicBool,
}

/// Which collaborator to take down in failure tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Profiles,
    Connections,
    Content,
    Moderation,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn check(&self, flag: &AtomicBool, name: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(anyhow!("{} store unavailable", name));
        }
        Ok(())
    }

    pub fn set_failing(&self, kind: StoreKind, failing: bool) {
        let flag = match kind {
            StoreKind::Profiles => &self.fail_profiles,
            StoreKind::Connections => &self.fail_connections,
            StoreKind::Content => &self.fail_content,
            StoreKind::Moderation => &self.fail_moderation,
        };
        flag.store(failing, Ordering::SeqCst);
    }

    pub fn upsert_profile(&self, profile: UserProfile) -> Result<()> {
        self.write()?.profiles.insert(profile.id, profile);
        Ok(())
    }

    pub fn add_connection(
        &self,
        requester_id: Uuid,
        addressee_id: Uuid,
        status: ConnectionStatus,
    ) -> Result<()> {
        let mut state = self.write()?;
        state.connections.retain(|c| {
            !(c.requester_id == requester_id && c.addressee_id == addressee_id)
        });
        state.connections.push(Connection {
            requester_id,
            addressee_id,
            status,
            created_at: Utc::now(),
        });
        Ok(())
    }

    pub fn add_post(&self, post: Post) -> Result<()> {
        let mut state = self.write()?;
        state.posts.retain(|p| p.id != post.id);
        state.posts.push(post);
        Ok(())
    }

    pub fn set_open_reports(&self, post_id: Uuid, count: u32) -> Result<()> {
        self.write()?.open_reports.insert(post_id, count);
        Ok(())
    }

    fn page(posts: impl Iterator<Item = Post>, before: Option<FeedCursor>, limit: usize) -> Vec<Post> {
        let mut page: Vec<Post> = posts
            .filter(|p| !p.is_deleted())
            .filter(|p| before.map_or(true, |cursor| cursor.admits(p)))
            .collect();
        page.sort_by(recency_order);
        page.truncate(limit);
        page
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        self.check(&self.fail_profiles, "profile")?;
        Ok(self.read()?.profiles.get(&user_id).cloned())
    }

    async fn get_profiles(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, UserProfile>> {
        self.check(&self.fail_profiles, "profile")?;
        let state = self.read()?;
        Ok(user_ids
            .iter()
            .filter_map(|id| state.profiles.get(id).map(|p| (*id, p.clone())))
            .collect())
    }
}

#[async_trait]
impl ConnectionStore for InMemoryStore {
    async fn connection_status(
        &self,
        requester_id: Uuid,
        addressee_id: Uuid,
    ) -> Result<Option<ConnectionStatus>> {
        self.check(&self.fail_connections, "connection")?;
        Ok(self
            .read()?
            .connections
            .iter()
            .find(|c| c.requester_id == requester_id && c.addressee_id == addressee_id)
            .map(|c| c.status))
    }

    async fn accepted_connection_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        self.check(&self.fail_connections, "connection")?;
        let state = self.read()?;
        let ids: HashSet<Uuid> = state
            .connections
            .iter()
            .filter(|c| c.status == ConnectionStatus::Accepted)
            .filter(|c| c.requester_id != c.addressee_id)
            .filter_map(|c| {
                if c.requester_id == user_id {
                    Some(c.addressee_id)
                } else if c.addressee_id == user_id {
                    Some(c.requester_id)
                } else {
                    None
                }
            })
            .collect();
        Ok(ids.into_iter().collect())
    }
}

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn list_by_authors(
        &self,
        author_ids: &[Uuid],
        before: Option<FeedCursor>,
        limit: usize,
    ) -> Result<Vec<Post>> {
        self.check(&self.fail_content, "content")?;
        let state = self.read()?;
        let authors: HashSet<&Uuid> = author_ids.iter().collect();
        Ok(Self::page(
            state
                .posts
                .iter()
                .filter(|p| authors.contains(&p.author_id))
                .cloned(),
            before,
            limit,
        ))
    }

    async fn list_recent(&self, before: Option<FeedCursor>, limit: usize) -> Result<Vec<Post>> {
        self.check(&self.fail_content, "content")?;
        let state = self.read()?;
        Ok(Self::page(state.posts.iter().cloned(), before, limit))
    }
}

#[async_trait]
impl ModerationStore for InMemoryStore {
    async fn open_report_count(&self, post_id: Uuid) -> Result<u32> {
        self.check(&self.fail_moderation, "moderation")?;
        Ok(self
            .read()?
            .open_reports
            .get(&post_id)
            .copied()
            .unwrap_or(0))
    }
}

#[async_trait]
impl HealthProbe for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        self.check(&self.fail_profiles, "profile")?;
        self.check(&self.fail_content, "content")?;
        self.read().map(|_| ())
    }
}
