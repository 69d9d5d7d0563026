//! Prometheus metrics for the feed service

use std::time::Duration;

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "alumni_feed_http_requests_total",
        "Total HTTP requests handled by the feed service",
        &["method", "path", "status"]
    )
    .expect("Failed to register alumni_feed_http_requests_total")
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "alumni_feed_http_request_duration_seconds",
        "HTTP request latency for the feed service",
        &["method", "path", "status"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register alumni_feed_http_request_duration_seconds")
});

static FEED_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "alumni_feed_requests_total",
        "Feed assembly requests by feed kind and outcome",
        &["kind", "outcome"]
    )
    .expect("Failed to register alumni_feed_requests_total")
});

static FEED_CANDIDATES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "alumni_feed_candidates_total",
        "Candidate posts consumed by feed assembly, split by visibility decision",
        &["kind", "decision"]
    )
    .expect("Failed to register alumni_feed_candidates_total")
});

static FEED_ASSEMBLY_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "alumni_feed_assembly_duration_seconds",
        "Time spent assembling one feed page",
        &["kind"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register alumni_feed_assembly_duration_seconds")
});

pub fn observe_http_request(method: &str, path: &str, status: u16, elapsed: Duration) {
    let status_label = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status_label])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path, &status_label])
        .observe(elapsed.as_secs_f64());
}

/// Record a finished feed request (`ok`, `unauthenticated`, `upstream_unavailable`, ...)
pub fn record_feed_request(kind: &str, outcome: &str, elapsed: Duration) {
    FEED_REQUESTS_TOTAL.with_label_values(&[kind, outcome]).inc();
    FEED_ASSEMBLY_DURATION_SECONDS
        .with_label_values(&[kind])
        .observe(elapsed.as_secs_f64());
}

pub fn record_candidates(kind: &str, visible: usize, filtered: usize) {
    FEED_CANDIDATES_TOTAL
        .with_label_values(&[kind, "visible"])
        .inc_by(visible as u64);
    FEED_CANDIDATES_TOTAL
        .with_label_values(&[kind, "filtered"])
        .inc_by(filtered as u64);
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
