//! Feed domain services
//!
//! - visibility: per-viewer authorization rules
//! - connection_graph: accepted-connection lookups, failing closed
//! - scoring: trending and quality scores, page ordering
//! - cursor: opaque keyset pagination token
//! - feed_assembler: retrieval, filtering, ranking and pagination

pub mod connection_graph;
pub mod cursor;
pub mod feed_assembler;
pub mod scoring;
pub mod visibility;

pub use connection_graph::ConnectionGraph;
pub use cursor::FeedCursor;
pub use feed_assembler::{Clock, FeedAssembler, FeedStores};
pub use scoring::{rank_and_truncate, recency_order, ScoringEngine, ScoringWeights};
pub use visibility::{decide, Decision, Viewer, VisibilityEvaluator};
