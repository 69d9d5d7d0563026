use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::ConnectionStatus;
use crate::repository::ConnectionStore;

/// Read-only view of accepted connections. Accepted edges are symmetric.
#[derive(Clone)]
pub struct ConnectionGraph {
    store: Arc<dyn ConnectionStore>,
    /// Upper bound on a single `are_connected` lookup
    timeout: Option<Duration>,
}

impl ConnectionGraph {
    pub fn new(store: Arc<dyn ConnectionStore>) -> Self {
        Self {
            store,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// True iff an accepted connection exists in either direction.
    ///
    /// Store failures fail closed: the pair is reported as not connected.
    pub async fn are_connected(&self, user_a: Uuid, user_b: Uuid) -> bool {
        if user_a == user_b {
            return false;
        }

        let lookup = self.check_either_direction(user_a, user_b);
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, lookup)
                .await
                .unwrap_or_else(|_| Err(anyhow!("connection lookup timed out after {:?}", limit))),
            None => lookup.await,
        };

        match result {
            Ok(connected) => connected,
            Err(e) => {
                warn!(
                    error = %e,
                    user_a = %user_a,
                    user_b = %user_b,
                    "Connection lookup failed, treating users as not connected"
                );
                false
            }
        }
    }

    async fn check_either_direction(&self, user_a: Uuid, user_b: Uuid) -> Result<bool> {
        if self.store.connection_status(user_a, user_b).await? == Some(ConnectionStatus::Accepted) {
            return Ok(true);
        }
        Ok(self.store.connection_status(user_b, user_a).await? == Some(ConnectionStatus::Accepted))
    }

    /// Ids of every user with an accepted connection to `user_id`,
    /// deduplicated and sorted. Errors propagate.
    pub async fn connection_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let mut ids = self.store.accepted_connection_ids(user_id).await?;
        ids.retain(|id| *id != user_id);
        ids.sort_unstable();
        ids.dedup();

        debug!(user_id = %user_id, connections = ids.len(), "Loaded connection ids");
        Ok(ids)
    }
}
