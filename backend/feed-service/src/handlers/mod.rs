pub mod feed;
pub mod health;

pub use feed::{get_for_you_feed, get_network_feed, FeedHandlerState, FeedQueryParams};
pub use health::{liveness, readiness, HealthState};
