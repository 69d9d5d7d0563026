mod memory;
mod postgres_repository;
mod r#trait;

pub use memory::{InMemoryStore, StoreKind};
pub use postgres_repository::PostgresRepository;
pub use r#trait::{ConnectionStore, ContentStore, HealthProbe, ModerationStore, ProfileStore};

#[cfg(test)]
pub use r#trait::{MockConnectionStore, MockContentStore, MockModerationStore, MockProfileStore};
