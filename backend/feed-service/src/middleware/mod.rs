pub mod viewer_auth;

pub use viewer_auth::{ViewerAuth, ViewerId};
