//! # Admin Token Middleware
//!
//! Registration, availability checks, and certificate download are public.
//! Listing, inspecting, approving, and deleting credentials are admin
//! operations.
//!
//! When `AUTH_TOKEN` is configured, [`auth_middleware`] checks any
//! `Authorization: Bearer <token>` header in constant time and, on a match,
//! injects an [`AdminAccess`] marker into the request extensions. Admin
//! handlers take `AdminAccess` as an extractor, which rejects with 401
//! when the marker is absent. When no token is configured every request
//! is treated as admin.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

use crate::error::{AppError, ErrorBody, ErrorDetail};

// ── Secret token ────────────────────────────────────────────────────────────

/// A bearer token whose `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretToken(String);

impl SecretToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretToken([REDACTED])")
    }
}

/// Auth configuration injected into request extensions.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub token: Option<SecretToken>,
}

// ── Admin marker ────────────────────────────────────────────────────────────

/// Proof that the caller presented the admin token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminAccess;

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for AdminAccess {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminAccess>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("admin bearer token required".into()))
    }
}

// ── Token validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer tokens.
///
/// When lengths differ, performs a dummy comparison so timing does not
/// depend on where the mismatch is.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

// ── Middleware ──────────────────────────────────────────────────────────────

/// Validate an optional bearer token and mark admin requests.
///
/// A request without an `Authorization` header passes through unmarked, so
/// public routes keep working. A header that is present but wrong is
/// rejected immediately.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_default();

    let Some(expected) = config.token else {
        request.extensions_mut().insert(AdminAccess);
        return next.run(request).await;
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or_default().to_string());

    match auth_header {
        None => next.run(request).await,
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(provided) if constant_time_token_eq(provided, expected.expose()) => {
                request.extensions_mut().insert(AdminAccess);
                next.run(request).await
            }
            Some(_) => {
                tracing::warn!("authentication failed: invalid bearer token");
                unauthorized_response("invalid bearer token")
            }
            None => {
                tracing::warn!("authentication failed: non-Bearer authorization scheme");
                unauthorized_response("authorization header must use Bearer scheme")
            }
        },
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
