use actix_web::{web, HttpResponse};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::repository::HealthProbe;

pub struct HealthState {
    pub probe: Arc<dyn HealthProbe>,
}

pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Ready once the backing store answers.
pub async fn readiness(state: web::Data<HealthState>) -> HttpResponse {
    match state.probe.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({ "status": "ready" })),
        Err(e) => {
            warn!(error = %e, "Readiness probe failed");
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "unavailable",
                "error": "upstream_unavailable",
            }))
        }
    }
}
