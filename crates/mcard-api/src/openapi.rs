//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the admin bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some("Admin token. Set via the AUTH_TOKEN env var."))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI spec for the credential issuance API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "mcard API",
        description = "Membership card issuance: registration, phone availability, admin approval with certificate generation, and certificate download.\n\nAdmin operations (list, get, approve, delete) require `Authorization: Bearer <token>` when `AUTH_TOKEN` is set."
    ),
    paths(
        crate::routes::credentials::list_credentials,
        crate::routes::credentials::register_credential,
        crate::routes::credentials::check_availability,
        crate::routes::credentials::approve_credential,
        crate::routes::credentials::get_credential,
        crate::routes::credentials::delete_credential,
        crate::routes::credentials::download_certificate,
    ),
    components(schemas(
        crate::routes::credentials::CredentialResponse,
        crate::routes::credentials::RegistrationForm,
        crate::routes::credentials::AvailabilityResponse,
        crate::routes::credentials::ApprovalResponse,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "credentials", description = "Credential issuance workflow"),
    )
)]
pub struct ApiDoc;

/// Router serving `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
