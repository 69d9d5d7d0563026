/// Configuration management for the feed service
///
/// Loads configuration from environment variables (and a `.env` file when present).
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::services::scoring::ScoringWeights;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub feed: FeedConfig,
    pub scoring: ScoringWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Apply bundled migrations on startup
    #[serde(default)]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    /// Expected `aud` claim, if the provider sets one
    pub jwt_audience: Option<String>,
}

/// Feed assembly limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// Candidate batches a single request may scan while filling a page
    #[serde(default = "default_max_scan_batches")]
    pub max_scan_batches: usize,
    /// Concurrent visibility checks per batch
    #[serde(default = "default_evaluation_concurrency")]
    pub evaluation_concurrency: usize,
    /// Per-call timeout for storage collaborators
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            max_scan_batches: default_max_scan_batches(),
            evaluation_concurrency: default_evaluation_concurrency(),
            upstream_timeout_ms: default_upstream_timeout_ms(),
        }
    }
}

// Default values
fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_limit() -> usize {
    20
}

fn default_max_limit() -> usize {
    100
}

fn default_max_scan_batches() -> usize {
    5
}

fn default_evaluation_concurrency() -> usize {
    16
}

fn default_upstream_timeout_ms() -> u64 {
    2_000
}

/// Read `key`, falling back to `default` when unset. A set but unparsable
/// value is an error rather than a silent fallback.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{} has invalid value {:?}: {}", key, raw, e)),
        _ => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("APP_PORT", default_port())?,
        };

        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL environment variable not set")?,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", default_max_connections())?,
            acquire_timeout_secs: env_or(
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
                default_acquire_timeout_secs(),
            )?,
            run_migrations: env_or("DATABASE_RUN_MIGRATIONS", false)?,
        };

        let auth = AuthConfig {
            jwt_secret: std::env::var("JWT_SECRET")
                .context("JWT_SECRET environment variable not set")?,
            jwt_audience: std::env::var("JWT_AUDIENCE")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        };

        let feed = FeedConfig {
            default_limit: env_or("FEED_DEFAULT_LIMIT", default_limit())?,
            max_limit: env_or("FEED_MAX_LIMIT", default_max_limit())?,
            max_scan_batches: env_or("FEED_MAX_SCAN_BATCHES", default_max_scan_batches())?,
            evaluation_concurrency: env_or(
                "FEED_EVALUATION_CONCURRENCY",
                default_evaluation_concurrency(),
            )?,
            upstream_timeout_ms: env_or("FEED_UPSTREAM_TIMEOUT_MS", default_upstream_timeout_ms())?,
        };

        let defaults = ScoringWeights::default();
        let scoring = ScoringWeights {
            like_weight: env_or("SCORING_LIKE_WEIGHT", defaults.like_weight)?,
            comment_weight: env_or("SCORING_COMMENT_WEIGHT", defaults.comment_weight)?,
            share_weight: env_or("SCORING_SHARE_WEIGHT", defaults.share_weight)?,
            decay_hours: env_or("SCORING_DECAY_HOURS", defaults.decay_hours)?,
            trust_step: env_or("SCORING_TRUST_STEP", defaults.trust_step)?,
            text_saturation_chars: env_or(
                "SCORING_TEXT_SATURATION_CHARS",
                defaults.text_saturation_chars,
            )?,
            text_weight: env_or("SCORING_TEXT_WEIGHT", defaults.text_weight)?,
            media_bonus: env_or("SCORING_MEDIA_BONUS", defaults.media_bonus)?,
            report_penalty: env_or("SCORING_REPORT_PENALTY", defaults.report_penalty)?,
            trending_weight: env_or("SCORING_TRENDING_WEIGHT", defaults.trending_weight)?,
            quality_weight: env_or("SCORING_QUALITY_WEIGHT", defaults.quality_weight)?,
        };

        let config = Config {
            app,
            database,
            auth,
            feed,
            scoring,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < 16 {
            return Err(anyhow!("JWT_SECRET must be at least 16 bytes"));
        }
        if self.feed.max_limit == 0 {
            return Err(anyhow!("FEED_MAX_LIMIT must be positive"));
        }
        if self.feed.default_limit == 0 || self.feed.default_limit > self.feed.max_limit {
            return Err(anyhow!(
                "FEED_DEFAULT_LIMIT must be between 1 and FEED_MAX_LIMIT ({})",
                self.feed.max_limit
            ));
        }
        if self.feed.max_scan_batches == 0 {
            return Err(anyhow!("FEED_MAX_SCAN_BATCHES must be positive"));
        }
        if self.feed.evaluation_concurrency == 0 {
            return Err(anyhow!("FEED_EVALUATION_CONCURRENCY must be positive"));
        }
        self.scoring
            .validate()
            .context("Invalid scoring weights")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "APP_PORT",
        "FEED_DEFAULT_LIMIT",
        "FEED_MAX_LIMIT",
        "SCORING_TRENDING_WEIGHT",
        "SCORING_DECAY_HOURS",
    ];

    fn set_required() {
        std::env::set_var("DATABASE_URL", "postgres://test");
        std::env::set_var("JWT_SECRET", "test-secret-at-least-16-bytes");
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_default_values() {
        set_required();

        let config = Config::from_env().unwrap();

        assert_eq!(config.app.port, 8080);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.feed.default_limit, 20);
        assert_eq!(config.feed.max_limit, 100);
        assert_eq!(config.feed.max_scan_batches, 5);
        assert!((config.scoring.trending_weight - 0.7).abs() < f64::EPSILON);
        assert!((config.scoring.quality_weight - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    #[serial]
    fn test_overrides_are_applied() {
        set_required();
        std::env::set_var("FEED_MAX_LIMIT", "50");
        std::env::set_var("SCORING_TRENDING_WEIGHT", "0.5");

        let config = Config::from_env().unwrap();
        assert_eq!(config.feed.max_limit, 50);
        assert!((config.scoring.trending_weight - 0.5).abs() < f64::EPSILON);

        std::env::remove_var("FEED_MAX_LIMIT");
        std::env::remove_var("SCORING_TRENDING_WEIGHT");
    }

    #[test]
    #[serial]
    fn test_malformed_value_is_rejected() {
        set_required();
        std::env::set_var("APP_PORT", "not-a-port");

        assert!(Config::from_env().is_err());

        std::env::remove_var("APP_PORT");
    }

    #[test]
    #[serial]
    fn test_default_limit_above_max_is_rejected() {
        set_required();
        std::env::set_var("FEED_DEFAULT_LIMIT", "200");

        assert!(Config::from_env().is_err());

        std::env::remove_var("FEED_DEFAULT_LIMIT");
    }

    #[test]
    #[serial]
    fn test_negative_weight_is_rejected() {
        set_required();
        std::env::set_var("SCORING_DECAY_HOURS", "-1");

        assert!(Config::from_env().is_err());

        std::env::remove_var("SCORING_DECAY_HOURS");
    }
}
