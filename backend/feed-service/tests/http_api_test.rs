//! Integration tests: HTTP surface of the feed endpoints
//!
//! Coverage:
//! - bearer token resolves the viewer; missing or bad token yields 401
//! - response body shape (camelCase, nextCursor/hasMore)
//! - malformed cursor / limit yield 400
//! - store outage yields 503 with `retryable: true`
//! - readiness probe reflects store health

mod common;

use actix_web::{test, web, App};
use alumni_feed::config::AuthConfig;
use alumni_feed::handlers::{
    get_for_you_feed, get_network_feed, liveness, readiness, FeedHandlerState, HealthState,
};
use alumni_feed::middleware::ViewerAuth;
use alumni_feed::models::{FeedResponse, TrustLevel, Visibility};
use alumni_feed::repository::StoreKind;
use common::World;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

const SECRET: &str = "integration-test-secret-0123456789";

#[derive(Serialize)]
struct Claims {
    sub: String,
    exp: i64,
}

fn bearer(user_id: Uuid) -> (&'static str, String) {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: chrono::Utc::now().timestamp() + 600,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    ("Authorization", format!("Bearer {}", token))
}

fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: SECRET.to_string(),
        jwt_audience: None,
    }
}

macro_rules! feed_app {
    ($world:expr) => {{
        let feed_state = web::Data::new(FeedHandlerState {
            assembler: Arc::new($world.assembler()),
        });
        let health_state = web::Data::new(HealthState {
            probe: $world.store.clone(),
        });
        test::init_service(
            App::new()
                .app_data(feed_state)
                .app_data(health_state)
                .route("/api/v1/health/live", web::get().to(liveness))
                .route("/api/v1/health/ready", web::get().to(readiness))
                .service(
                    web::scope("/api/v1/feed")
                        .wrap(ViewerAuth::new(&auth_config()))
                        .service(get_network_feed)
                        .service(get_for_you_feed),
                ),
        )
        .await
    }};
}

#[actix_web::test]
async fn test_network_feed_returns_camel_case_page() {
    let world = World::new();
    let viewer = world.user(TrustLevel::VerifiedAlumni, vec![]);
    for i in 0..3 {
        world.post(&viewer, Visibility::Public, i);
    }
    let app = feed_app!(world);

    let req = test::TestRequest::get()
        .uri("/api/v1/feed/network?limit=2")
        .insert_header(bearer(viewer.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["hasMore"], Value::Bool(true));
    assert!(body["nextCursor"].is_string());
    assert!(body.get("error").is_none());

    let item = &body["items"][0];
    assert_eq!(item["authorId"], Value::String(viewer.id.to_string()));
    assert_eq!(item["visibility"], Value::String("public".to_string()));
    assert!(item["rankingScore"].is_number());
    assert!(item["metrics"]["likes"].is_number());
}

#[actix_web::test]
async fn test_cursor_round_trip_over_http() {
    let world = World::new();
    let viewer = world.user(TrustLevel::VerifiedAlumni, vec![]);
    for i in 0..5 {
        world.post(&viewer, Visibility::Public, i);
    }
    let app = feed_app!(world);

    let req = test::TestRequest::get()
        .uri("/api/v1/feed/for-you?limit=3")
        .insert_header(bearer(viewer.id))
        .to_request();
    let first: FeedResponse = test::call_and_read_body_json(&app, req).await;
    let cursor = first.next_cursor.clone().unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/feed/for-you?limit=3&cursor={}", cursor))
        .insert_header(bearer(viewer.id))
        .to_request();
    let second: FeedResponse = test::call_and_read_body_json(&app, req).await;

    assert_eq!(first.items.len(), 3);
    assert_eq!(second.items.len(), 2);
    assert!(!second.has_more);
    assert!(second.next_cursor.is_none());
    for item in &second.items {
        assert!(first.items.iter().all(|f| f.id != item.id));
    }
}

#[actix_web::test]
async fn test_missing_or_invalid_token_is_unauthorized() {
    let world = World::new();
    let app = feed_app!(world);

    let req = test::TestRequest::get()
        .uri("/api/v1/feed/network")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], Value::String("unauthenticated".to_string()));
    assert_eq!(body["items"], Value::Array(vec![]));

    let req = test::TestRequest::get()
        .uri("/api/v1/feed/for-you")
        .insert_header(("Authorization", "Bearer garbage"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn test_malformed_query_is_bad_request() {
    let world = World::new();
    let viewer = world.user(TrustLevel::VerifiedAlumni, vec![]);
    let app = feed_app!(world);

    for uri in [
        "/api/v1/feed/for-you?cursor=not-a-cursor",
        "/api/v1/feed/for-you?limit=abc",
    ] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(bearer(viewer.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400, "{}", uri);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], Value::String("bad_request".to_string()));
    }
}

#[actix_web::test]
async fn test_store_outage_is_retryable_503() {
    let world = World::new();
    let viewer = world.user(TrustLevel::VerifiedAlumni, vec![]);
    world.store.set_failing(StoreKind::Content, true);
    let app = feed_app!(world);

    let req = test::TestRequest::get()
        .uri("/api/v1/feed/for-you")
        .insert_header(bearer(viewer.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 503);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], Value::String("upstream_unavailable".to_string()));
    assert_eq!(body["retryable"], Value::Bool(true));
    assert_eq!(body["items"], Value::Array(vec![]));
    assert_eq!(body["hasMore"], Value::Bool(false));
}

#[actix_web::test]
async fn test_health_probes() {
    let world = World::new();
    let app = feed_app!(world);

    let req = test::TestRequest::get().uri("/api/v1/health/live").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::get().uri("/api/v1/health/ready").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    world.store.set_failing(StoreKind::Profiles, true);
    let req = test::TestRequest::get().uri("/api/v1/health/ready").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 503);
}
