//! Trending and quality scoring for feed items
//!
//! Both scores are pure functions of their inputs and a [`ScoringWeights`]
//! policy; the current time is passed in so results are reproducible.
//!
//! Trending:
//! - Engagement: likes, comments and shares weighted (comments and shares count more)
//! - Boost: 1 + ln(1 + engagement) so viral posts cannot dominate
//! - Time decay: 1 / (1 + age_hours / decay_hours)
//! - Trust: small multiplier per author trust tier
//!
//! Quality:
//! - Text length up to a saturation point, a bonus for media,
//!   minus a penalty per open moderation report, floored at zero.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::{Post, RankedPost, TrustLevel};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub like_weight: f64,
    pub comment_weight: f64,
    pub share_weight: f64,
    /// Age at which the time-decay factor halves
    pub decay_hours: f64,
    /// Multiplier added per trust tier above `unverified`
    pub trust_step: f64,
    /// Text length (chars) beyond which longer text earns nothing extra
    pub text_saturation_chars: f64,
    pub text_weight: f64,
    pub media_bonus: f64,
    pub report_penalty: f64,
    pub trending_weight: f64,
    pub quality_weight: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            like_weight: 1.0,
            comment_weight: 2.0,
            share_weight: 3.0,
            decay_hours: 24.0,
            trust_step: 0.05,
            text_saturation_chars: 280.0,
            text_weight: 1.0,
            media_bonus: 0.5,
            report_penalty: 0.25,
            trending_weight: 0.7,
            quality_weight: 0.3,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("like_weight", self.like_weight),
            ("comment_weight", self.comment_weight),
            ("share_weight", self.share_weight),
            ("decay_hours", self.decay_hours),
            ("trust_step", self.trust_step),
            ("text_saturation_chars", self.text_saturation_chars),
            ("text_weight", self.text_weight),
            ("media_bonus", self.media_bonus),
            ("report_penalty", self.report_penalty),
            ("trending_weight", self.trending_weight),
            ("quality_weight", self.quality_weight),
        ];

        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(anyhow!("{} must be finite and non-negative, got {}", name, value));
            }
        }
        if self.decay_hours == 0.0 {
            return Err(anyhow!("decay_hours must be positive"));
        }
        if self.text_saturation_chars == 0.0 {
            return Err(anyhow!("text_saturation_chars must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: ScoringWeights,
}

impl ScoringEngine {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn trending_score(
        &self,
        likes: i64,
        comments: i64,
        shares: i64,
        created_at: DateTime<Utc>,
        author_trust: TrustLevel,
        now: DateTime<Utc>,
    ) -> f64 {
        let w = &self.weights;

        let engagement = w.like_weight * likes.max(0) as f64
            + w.comment_weight * comments.max(0) as f64
            + w.share_weight * shares.max(0) as f64;
        let engagement_boost = 1.0 + engagement.ln_1p();

        // Future timestamps (clock skew) count as brand new
        let age_hours = ((now - created_at).num_seconds().max(0) as f64) / 3600.0;
        let time_decay = 1.0 / (1.0 + age_hours / w.decay_hours);

        let trust_multiplier = 1.0 + w.trust_step * f64::from(author_trust.rank());

        engagement_boost * time_decay * trust_multiplier
    }

    pub fn quality_score(&self, text_length: usize, has_media: bool, report_count: u32) -> f64 {
        let w = &self.weights;

        let text = (text_length as f64 / w.text_saturation_chars).min(1.0) * w.text_weight;
        let media = if has_media { w.media_bonus } else { 0.0 };
        let penalty = w.report_penalty * f64::from(report_count);

        (text + media - penalty).max(0.0)
    }

    pub fn combined_score(&self, trending: f64, quality: f64) -> f64 {
        self.weights.trending_weight * trending + self.weights.quality_weight * quality
    }

    /// Combined score for a post given its author's trust tier and open reports.
    pub fn score_post(
        &self,
        post: &Post,
        author_trust: TrustLevel,
        report_count: u32,
        now: DateTime<Utc>,
    ) -> f64 {
        let trending = self.trending_score(
            post.like_count,
            post.comment_count,
            post.share_count,
            post.created_at,
            author_trust,
            now,
        );
        let quality = self.quality_score(post.text_length(), post.has_media(), report_count);
        self.combined_score(trending, quality)
    }
}

/// Sort by score descending; ties go to the newer post, then the larger id,
/// so the order is total and repeatable.
pub fn rank_and_truncate(mut posts: Vec<RankedPost>, limit: usize) -> Vec<RankedPost> {
    posts.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.post.created_at.cmp(&a.post.created_at))
            .then_with(|| b.post.id.cmp(&a.post.id))
    });
    posts.truncate(limit);
    posts
}

/// Order used by candidate retrieval: newest first, id descending on ties.
pub fn recency_order(a: &Post, b: &Post) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}
