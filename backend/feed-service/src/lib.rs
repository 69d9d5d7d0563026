pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

pub use services::{
    FeedAssembler, FeedCursor, FeedStores, ScoringEngine, ScoringWeights, Viewer,
    VisibilityEvaluator,
};
