//! # mcard-api — Axum API Service for Membership Card Issuance
//!
//! Exposes the credential registry over HTTP: public registration,
//! availability checks, and certificate download, plus admin listing,
//! approval, and deletion.
//!
//! ## API Surface
//!
//! | Method   | Path                         | Access | Operation          |
//! |----------|------------------------------|--------|--------------------|
//! | `GET`    | `/credentials`               | admin  | list               |
//! | `POST`   | `/credentials`               | public | register           |
//! | `GET`    | `/credentials/check?phone=`  | public | check availability |
//! | `GET`    | `/credentials/download?phone=` | public | retrieve certificate |
//! | `GET`    | `/credentials/:id`           | admin  | get                |
//! | `DELETE` | `/credentials/:id`           | admin  | delete             |
//! | `POST`   | `/credentials/:id/approve`   | admin  | approve            |
//! | `GET`    | `/health/liveness`, `/health/readiness` | public | health checks |
//! | `GET`    | `/metrics`                   | public | Prometheus scrape  |
//! | `GET`    | `/openapi.json`              | public | introspection      |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers; they delegate to `mcard-registry`.
//! - All errors map to structured HTTP responses via [`AppError`].

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};

use crate::auth::AuthConfig;
use crate::middleware::metrics::{ApiMetrics, PROMETHEUS_CONTENT_TYPE};

pub use error::AppError;
pub use state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health checks and `/metrics` are mounted outside the auth middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();

    let api = Router::new()
        .merge(routes::credentials::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(Extension(metrics.clone()))
        .layer(middleware::tracing_layer::layer())
        .layer(Extension(auth_config))
        .with_state(state.clone());

    let unauthenticated = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus_metrics))
        .layer(Extension(metrics))
        .with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics: Prometheus text exposition.
///
/// The credentials gauge is refreshed from the registry before gathering.
/// When the store is unreachable the previous values are served.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> Response {
    if let Some(registry) = &state.registry {
        match registry.list().await {
            Ok(records) => metrics.set_credentials(&records),
            Err(err) => tracing::warn!(error = %err, "credential gauge not refreshed"),
        }
    }

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode Prometheus metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness check: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check: 200 "ready" when the credential store is connected,
/// 503 otherwise.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.registry.is_none() {
        return (StatusCode::SERVICE_UNAVAILABLE, "credential store not connected");
    }
    (StatusCode::OK, "ready")
}
