use actix_web::{dev::Service, web, App, HttpServer};
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use alumni_feed::config::Config;
use alumni_feed::handlers::{
    get_for_you_feed, get_network_feed, liveness, readiness, FeedHandlerState, HealthState,
};
use alumni_feed::middleware::ViewerAuth;
use alumni_feed::repository::PostgresRepository;
use alumni_feed::services::{FeedAssembler, FeedStores, ScoringEngine};

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting alumni-feed-service v{}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.env);

    let pool = match alumni_feed::db::init_pool(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {:#}", e);
            eprintln!("ERROR: Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    let repository = Arc::new(PostgresRepository::new(pool));
    let assembler = FeedAssembler::new(
        FeedStores::from_repository(repository.clone()),
        ScoringEngine::new(config.scoring.clone()),
        config.feed.clone(),
    );

    let feed_state = web::Data::new(FeedHandlerState {
        assembler: Arc::new(assembler),
    });
    let health_state = web::Data::new(HealthState { probe: repository });
    let viewer_auth = ViewerAuth::new(&config.auth);

    let bind_addr = format!("{}:{}", config.app.host, config.app.port);
    info!("HTTP server listening on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(feed_state.clone())
            .app_data(health_state.clone())
            .route("/health", web::get().to(liveness))
            // Health endpoints for K8s probes
            .route("/api/v1/health/live", web::get().to(liveness))
            .route("/api/v1/health/ready", web::get().to(readiness))
            .route("/metrics", web::get().to(alumni_feed::metrics::serve_metrics))
            .wrap_fn(|req, srv| {
                let method = req.method().to_string();
                let path = req
                    .match_pattern()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| req.path().to_string());
                let start = Instant::now();

                let fut = srv.call(req);
                async move {
                    match fut.await {
                        Ok(res) => {
                            alumni_feed::metrics::observe_http_request(
                                &method,
                                &path,
                                res.status().as_u16(),
                                start.elapsed(),
                            );
                            Ok(res)
                        }
                        Err(err) => {
                            alumni_feed::metrics::observe_http_request(
                                &method,
                                &path,
                                500,
                                start.elapsed(),
                            );
                            Err(err)
                        }
                    }
                }
            })
            .service(
                web::scope("/api/v1/feed")
                    .wrap(viewer_auth.clone())
                    .service(get_network_feed)
                    .service(get_for_you_feed),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
