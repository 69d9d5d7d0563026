//! Shared fixtures for integration tests
#![allow(dead_code)]

use alumni_feed::config::FeedConfig;
use alumni_feed::models::{Post, PrivacyPreference, TrustLevel, UserProfile, Visibility};
use alumni_feed::repository::InMemoryStore;
use alumni_feed::services::{FeedAssembler, FeedStores, ScoringEngine};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub struct World {
    pub store: Arc<InMemoryStore>,
}

impl World {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
        }
    }

    pub fn user(&self, trust_level: TrustLevel, school_ids: Vec<Uuid>) -> UserProfile {
        let profile = UserProfile {
            id: Uuid::new_v4(),
            display_name: "alum".to_string(),
            trust_level,
            school_ids,
            privacy: PrivacyPreference::Public,
            disabled_at: None,
        };
        self.store.upsert_profile(profile.clone()).unwrap();
        profile
    }

    /// Post `minutes_ago` before [`fixed_now`].
    pub fn post(&self, author: &UserProfile, visibility: Visibility, minutes_ago: i64) -> Post {
        let post = Post {
            id: Uuid::new_v4(),
            author_id: author.id,
            body: "Reunion planning thread".to_string(),
            media_urls: vec![],
            visibility,
            created_at: fixed_now() - Duration::minutes(minutes_ago),
            like_count: 0,
            comment_count: 0,
            share_count: 0,
            deleted_at: None,
        };
        self.store.add_post(post.clone()).unwrap();
        post
    }

    pub fn assembler(&self) -> FeedAssembler {
        self.assembler_with(FeedConfig::default())
    }

    pub fn assembler_with(&self, config: FeedConfig) -> FeedAssembler {
        FeedAssembler::new(
            FeedStores::from_repository(self.store.clone()),
            ScoringEngine::default(),
            config,
        )
        .with_clock(Arc::new(fixed_now))
    }
}
