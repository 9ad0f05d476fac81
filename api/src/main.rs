//! Toonshelf API Server
//!
//! Paid-episode reading for a webtoon/manga shelf: point wallets, episode
//! purchases, ownership-gated content and auto-purchase on read.
//! Uses hexagonal (ports & adapters) architecture for clean separation of concerns.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use sea_orm::Database;
use serde::Serialize;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod adapters;
mod app;
mod auth;
mod config;
mod domain;
mod entity;
mod error;
mod handlers;

#[cfg(test)]
mod test_utils;


use adapters::{
    PostgresEpisodeRepository, PostgresOwnershipRepository, PostgresPurchaseRepository,
    PostgresUserRepository, RedisWindowStore, SystemClock,
};
use app::{
    AutoPurchaseService, OwnershipOracle, PointLedger, PurchaseService, RateLimiter,
    ReadingService,
};
use auth::RouteLimit;
use config::Config;

type Purchases = PurchaseService<
    PostgresUserRepository,
    PostgresEpisodeRepository,
    PostgresOwnershipRepository,
    PostgresPurchaseRepository,
>;
type AutoPurchases = AutoPurchaseService<
    PostgresUserRepository,
    PostgresEpisodeRepository,
    PostgresOwnershipRepository,
    PostgresPurchaseRepository,
>;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub point_ledger: Arc<PointLedger<PostgresUserRepository>>,
    pub reading_service: Arc<ReadingService<PostgresEpisodeRepository, PostgresOwnershipRepository>>,
    pub purchase_service: Arc<Purchases>,
    pub auto_purchase_service: Arc<AutoPurchases>,
    pub config: Config,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,toonshelf_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Toonshelf API...");

    let config = Config::from_env()?;

    // Connect to PostgreSQL
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Create adapters
    let user_repo = Arc::new(PostgresUserRepository::new(db.clone()));
    let episode_repo = Arc::new(PostgresEpisodeRepository::new(db.clone()));
    let ownership_repo = Arc::new(PostgresOwnershipRepository::new(db.clone()));
    let purchase_repo = Arc::new(PostgresPurchaseRepository::new(db));

    // Redis connects lazily; an outage only degrades rate limiting
    let window_store = Arc::new(
        RedisWindowStore::new(&config.redis_url, config.rate_limit_store_timeout_ms)
            .context("Invalid REDIS_URL")?,
    );
    let limiter = Arc::new(RateLimiter::new(
        window_store,
        Arc::new(SystemClock),
        config.rate_limit_failure_policy,
    ));

    // Create application services
    let oracle = Arc::new(OwnershipOracle::new(ownership_repo));
    let point_ledger = Arc::new(PointLedger::new(user_repo.clone()));
    let reading_service = Arc::new(ReadingService::new(episode_repo.clone(), oracle.clone()));
    let purchase_service = Arc::new(PurchaseService::new(
        episode_repo,
        oracle.clone(),
        point_ledger.clone(),
        purchase_repo,
    ));
    let auto_purchase_service = Arc::new(AutoPurchaseService::new(
        reading_service.clone(),
        oracle,
        point_ledger.clone(),
        purchase_service.clone(),
    ));

    let state = AppState {
        point_ledger,
        reading_service,
        purchase_service,
        auto_purchase_service,
        config: config.clone(),
    };

    // Coarse burst guard in front of everything: 5 req/sec sustained, burst of 20
    // Uses PeerIpKeyExtractor to get client IP from socket connection
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(5)
            .burst_size(20)
            .finish()
            .context("Failed to build governor config")?,
    );

    let purchase_limit = RouteLimit::new(limiter.clone(), config.purchase_rate_limit.clone());
    let content_limit = RouteLimit::new(limiter, config.content_rate_limit.clone());

    // Layers added last run first: the session must be resolved before the
    // rate limiter picks a per-user or per-IP key.

    // Purchases (anonymous callers get an `unauthenticated` outcome)
    let purchase_routes = Router::new()
        .route("/purchase/episode", post(handlers::purchase_episode))
        .route("/purchase/batch", post(handlers::purchase_batch))
        .layer(middleware::from_fn_with_state(
            purchase_limit,
            auth::rate_limit::<RedisWindowStore, SystemClock>,
        ))
        .layer(middleware::from_fn_with_state(
            user_repo.clone(),
            auth::optional_session::<PostgresUserRepository>,
        ));

    // Read path (optional auth)
    let read_routes = Router::new()
        .route("/episodes/content", get(handlers::get_content))
        .route(
            "/series/:series_uuid/episodes/:ep_no",
            get(handlers::get_episode),
        )
        .layer(middleware::from_fn_with_state(
            content_limit.clone(),
            auth::rate_limit::<RedisWindowStore, SystemClock>,
        ))
        .layer(middleware::from_fn_with_state(
            user_repo.clone(),
            auth::optional_session::<PostgresUserRepository>,
        ));

    // Protected routes
    let account_routes = Router::new()
        .route(
            "/series/:series_uuid/ownership",
            get(handlers::get_series_ownership).layer(middleware::from_fn_with_state(
                content_limit,
                auth::rate_limit::<RedisWindowStore, SystemClock>,
            )),
        )
        .route("/me/wallet", get(handlers::get_wallet))
        .route("/me/settings", put(handlers::update_settings))
        .layer(middleware::from_fn_with_state(
            user_repo,
            auth::require_session::<PostgresUserRepository>,
        ));

    // Build router
    let app = Router::new()
        // Health check (no auth)
        .route("/health", get(health))
        .merge(purchase_routes)
        .merge(read_routes)
        .merge(account_routes)
        // Middleware
        .layer(GovernorLayer {
            config: governor_config,
        })
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
