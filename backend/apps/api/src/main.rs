//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request handling errors are
//! `kernel::error::AppError`, rendered by the crates that own the routes.

mod config;
mod health;

use std::net::SocketAddr;
use std::sync::Arc;

use admission::AdmissionPipeline;
use auth::{PgUserRepository, auth_router};
use axum::{
    Router, http,
    http::{HeaderName, HeaderValue, Method, header},
};
use catalog::{PgProductRepository, catalog_router};
use platform::clock::SystemClock;
use platform::kv::{KeyValueStore, RedisStore};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ApiConfig;
use crate::health::{HealthState, health_router};

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env()?;

    // Initialize tracing
    let default_filter = if config.flags.debug {
        "api=debug,admission=debug,auth=debug,catalog=debug,tower_http=debug"
    } else {
        "api=info,admission=info,auth=info,catalog=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        env = %config.env,
        debug = config.flags.debug,
        cache = config.flags.cache_enabled,
        breach_check = config.flags.password_breach_check,
        "Configuration loaded"
    );
    if config.ephemeral_secret {
        tracing::warn!("SECRET_KEY not set; signing with a random key, tokens die with the process");
    }

    // Database connection
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect_with(config.database.clone())
        .await?;

    tracing::info!("Connected to database");

    if config.flags.run_migrations {
        sqlx::migrate!("../../../database/migrations")
            .run(&pool)
            .await?;

        tracing::info!("Migrations completed");
    }

    // Key-value store: unreachable at startup is not fatal
    let store = Arc::new(RedisStore::connect(&config.redis)?);
    match store.ping().await {
        Ok(()) => tracing::info!("Connected to key-value store"),
        Err(e) => tracing::warn!(
            error = %e,
            "Key-value store unreachable; limiter fails open, token issuance returns 503"
        ),
    }

    // Token secret validation happens here; a bad secret stops the server
    let pipeline = Arc::new(AdmissionPipeline::new(
        config.admission.clone(),
        store.clone(),
        Arc::new(SystemClock),
    )?);

    // CORS configuration
    let allowed_origins: Vec<http::HeaderValue> = config
        .frontend_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .merge(health_router(HealthState {
            pool: pool.clone(),
            store: store.clone(),
            env: config.env,
        }))
        .merge(auth_router(
            PgUserRepository::new(pool.clone()),
            pipeline.clone(),
            config.account.clone(),
        )?)
        .merge(catalog_router(
            PgProductRepository::new(pool.clone()),
            pipeline.clone(),
            config.catalog.clone(),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(
                    |req: &http::Request<axum::body::Body>| {
                        let request_id = req
                            .headers()
                            .get(&X_REQUEST_ID)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("");
                        tracing::info_span!(
                            "http.request",
                            method = %req.method(),
                            uri = %req.uri(),
                            request_id = %request_id,
                        )
                    },
                ))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
        )
        .layer(cors);

    // Start server
    tracing::info!("Listening on {}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
