//! Health Endpoints
//!
//! Unguarded: no token, no rate limit, no cache.
//! - `GET /` - name and version
//! - `GET /health` - database and key-value store reachability (503 if either is down)
//! - `GET /health/live` - process liveness, touches nothing external

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use platform::kv::KeyValueStore;
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;

use crate::config::AppEnv;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

pub struct HealthState<S> {
    pub pool: PgPool,
    pub store: Arc<S>,
    pub env: AppEnv,
}

impl<S> Clone for HealthState<S> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            store: self.store.clone(),
            env: self.env,
        }
    }
}

pub fn health_router<S>(state: HealthState<S>) -> Router
where
    S: KeyValueStore + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/health", get(health::<S>))
        .route("/health/live", get(live))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct Probe {
    healthy: bool,
    latency_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Probe {
    async fn run<F, E>(check: F) -> Self
    where
        F: Future<Output = Result<(), E>>,
        E: std::fmt::Display,
    {
        let started = Instant::now();
        let outcome = tokio::time::timeout(PROBE_TIMEOUT, check).await;
        let latency_ms = started.elapsed().as_millis();

        let error = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!("timed out after {}s", PROBE_TIMEOUT.as_secs())),
        };
        Self {
            healthy: error.is_none(),
            latency_ms,
            error,
        }
    }
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn live() -> impl IntoResponse {
    Json(json!({ "status": "alive" }))
}

async fn health<S>(State(state): State<HealthState<S>>) -> impl IntoResponse
where
    S: KeyValueStore + Send + Sync + 'static,
{
    let (database, cache) = tokio::join!(
        Probe::run(async {
            sqlx::query("SELECT 1")
                .execute(&state.pool)
                .await
                .map(|_| ())
        }),
        Probe::run(state.store.ping()),
    );

    let healthy = database.healthy && cache.healthy;
    if !healthy {
        tracing::warn!(
            database = database.healthy,
            cache = cache.healthy,
            "Health check failed"
        );
    }

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.env.to_string(),
        "checks": {
            "database": database,
            "cache": cache,
        },
    });
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use platform::kv::MemoryStore;
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        // Nothing listens on port 1
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://app:pw@127.0.0.1:1/shop")
            .unwrap();
        health_router(HealthState {
            pool,
            store: Arc::new(MemoryStore::new()),
            env: AppEnv::Testing,
        })
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_root_reports_version() {
        let (status, body) = get_json(app(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_unreachable_database_is_unhealthy() {
        let (status, body) = get_json(app(), "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["checks"]["database"]["healthy"], false);
        assert_eq!(body["checks"]["cache"]["healthy"], true);
        assert_eq!(body["environment"], "testing");
    }

    #[tokio::test]
    async fn test_liveness_needs_nothing() {
        let (status, body) = get_json(app(), "/health/live").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "alive");
    }
}
