//! # Credential Routes
//!
//! - `GET    /credentials`: list all records (admin)
//! - `POST   /credentials`: register (multipart form)
//! - `GET    /credentials/check?phone=`: phone availability
//! - `GET    /credentials/download?phone=`: certificate PDF for an approved phone
//! - `GET    /credentials/:id`: single record (admin)
//! - `DELETE /credentials/:id`: delete a record (admin)
//! - `POST   /credentials/:id/approve`: approve and generate certificate (admin)
//!
//! An id that does not parse cannot name a record and yields 404.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use mcard_core::{CredentialId, CredentialRecord};
use mcard_registry::{Approval, Registry};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::AdminAccess;
use crate::error::AppError;
use crate::extractors::read_registration;
use crate::state::AppState;

/// Upload limit for the registration form, photo included.
pub const REGISTRATION_BODY_LIMIT: usize = 10 * 1024 * 1024;

const AVAILABLE_MESSAGE: &str = "Phone number available.";
const TAKEN_MESSAGE: &str = "This phone number is already registered.";
const APPROVED_MESSAGE: &str = "Approved successfully!";

/// RFC 5987 `attr-char` complement.
const FILENAME_STAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Build the credentials router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/credentials",
            get(list_credentials)
                .post(register_credential)
                .layer(DefaultBodyLimit::max(REGISTRATION_BODY_LIMIT)),
        )
        .route("/credentials/check", get(check_availability))
        .route("/credentials/download", get(download_certificate))
        .route(
            "/credentials/:id",
            get(get_credential).delete(delete_credential),
        )
        .route("/credentials/:id/approve", post(approve_credential))
}

// -- DTOs ---------------------------------------------------------------------

/// A credential record as returned by the API.
///
/// Keys are snake_case. Fields named in camelCase elsewhere map as
/// `nationalId` to `national_id`, `photoRef` to `photo_ref` and
/// `certificateRef` to `certificate_ref`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CredentialResponse {
    pub id: String,
    /// Short number printed on the certificate.
    pub membership_number: String,
    pub name: String,
    /// The record's `nationalId`.
    pub national_id: String,
    pub phone: String,
    pub address: String,
    /// `PENDING` or `APPROVED`.
    pub status: String,
    /// The record's `photoRef`: blob key of the uploaded photo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// The record's `certificateRef`, set once approved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

impl CredentialResponse {
    fn from_record(record: CredentialRecord, registry: &Registry) -> Self {
        Self {
            id: record.id.to_string(),
            membership_number: record.id.membership_number(),
            photo_url: record.photo_ref.as_deref().map(|k| registry.public_url(k)),
            certificate_url: record
                .certificate_ref
                .as_deref()
                .map(|k| registry.public_url(k)),
            name: record.name,
            national_id: record.national_id,
            phone: record.phone.into(),
            address: record.address,
            status: record.status.to_string(),
            photo_ref: record.photo_ref,
            certificate_ref: record.certificate_ref,
            created_at: record.created_at,
            approved_at: record.approved_at,
        }
    }
}

/// Multipart registration form.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct RegistrationForm {
    name: String,
    /// Also accepted as `nationalId` or `aadhar_number`.
    national_id: String,
    phone: String,
    address: String,
    #[schema(value_type = Option<String>, format = Binary)]
    photo: Option<Vec<u8>>,
}

/// `?phone=` query parameter.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PhoneQuery {
    /// Phone number as registered.
    pub phone: Option<String>,
}

/// Result of an availability check.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityResponse {
    pub available: bool,
    pub message: String,
}

/// Result of an approval.
///
/// Keys are snake_case: `certificateRef` is served as `certificate_ref`
/// and `notificationLink` as `notification_link`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApprovalResponse {
    pub message: String,
    /// `certificateRef`: blob key of the generated certificate.
    pub certificate_ref: String,
    /// Public URL of the generated certificate.
    pub certificate_url: String,
    /// `notificationLink`: prefilled messaging link to notify the member.
    pub notification_link: String,
    pub credential: CredentialResponse,
}

impl ApprovalResponse {
    fn from_approval(approval: Approval, registry: &Registry) -> Self {
        Self {
            message: APPROVED_MESSAGE.to_string(),
            certificate_ref: approval.certificate_ref,
            certificate_url: approval.certificate_url,
            notification_link: approval.notification_link,
            credential: CredentialResponse::from_record(approval.record, registry),
        }
    }
}

fn parse_id(raw: &str) -> Result<CredentialId, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("credential not found: {raw}")))
}

fn phone_param(query: Result<Query<PhoneQuery>, QueryRejection>) -> Result<String, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(query.phone.unwrap_or_default())
}

// -- Handlers -----------------------------------------------------------------

/// List all credential records in registration order.
#[utoipa::path(
    get,
    path = "/credentials",
    responses(
        (status = 200, description = "All credential records", body = Vec<CredentialResponse>),
        (status = 401, description = "Admin token required", body = crate::error::ErrorBody),
        (status = 503, description = "Credential store unavailable", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "credentials"
)]
pub(crate) async fn list_credentials(
    _admin: AdminAccess,
    State(state): State<AppState>,
) -> Result<Json<Vec<CredentialResponse>>, AppError> {
    let registry = state.registry()?;
    let records = registry.list().await?;
    Ok(Json(
        records
            .into_iter()
            .map(|r| CredentialResponse::from_record(r, registry))
            .collect(),
    ))
}

/// Register a new credential request.
#[utoipa::path(
    post,
    path = "/credentials",
    request_body(content = RegistrationForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Registered, pending approval", body = CredentialResponse),
        (status = 400, description = "Missing phone, unknown field, or phone already registered", body = crate::error::ErrorBody),
        (status = 503, description = "Credential store unavailable", body = crate::error::ErrorBody),
    ),
    tag = "credentials"
)]
pub(crate) async fn register_credential(
    State(state): State<AppState>,
    body: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<CredentialResponse>), AppError> {
    let registry = state.registry()?;
    let registration = read_registration(body).await?;
    let record = registry.register(registration).await?;
    Ok((
        StatusCode::CREATED,
        Json(CredentialResponse::from_record(record, registry)),
    ))
}

/// Check whether a phone number is free to register.
#[utoipa::path(
    get,
    path = "/credentials/check",
    params(PhoneQuery),
    responses(
        (status = 200, description = "Availability", body = AvailabilityResponse),
        (status = 400, description = "Missing phone", body = crate::error::ErrorBody),
        (status = 503, description = "Credential store unavailable", body = crate::error::ErrorBody),
    ),
    tag = "credentials"
)]
pub(crate) async fn check_availability(
    State(state): State<AppState>,
    query: Result<Query<PhoneQuery>, QueryRejection>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let registry = state.registry()?;
    let phone = phone_param(query)?;
    let available = registry.check_availability(&phone).await?;
    let message = if available {
        AVAILABLE_MESSAGE
    } else {
        TAKEN_MESSAGE
    };
    Ok(Json(AvailabilityResponse {
        available,
        message: message.to_string(),
    }))
}

/// Approve a credential and generate its certificate.
///
/// Approving an approved credential regenerates the certificate in place.
#[utoipa::path(
    post,
    path = "/credentials/{id}/approve",
    params(("id" = String, Path, description = "Credential id")),
    responses(
        (status = 200, description = "Approved", body = ApprovalResponse),
        (status = 401, description = "Admin token required", body = crate::error::ErrorBody),
        (status = 404, description = "Credential not found", body = crate::error::ErrorBody),
        (status = 503, description = "Credential store unavailable", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "credentials"
)]
pub(crate) async fn approve_credential(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApprovalResponse>, AppError> {
    let registry = state.registry()?;
    let id = parse_id(&id)?;
    let approval = registry.approve(id).await?;
    Ok(Json(ApprovalResponse::from_approval(approval, registry)))
}

/// Fetch a single credential record.
#[utoipa::path(
    get,
    path = "/credentials/{id}",
    params(("id" = String, Path, description = "Credential id")),
    responses(
        (status = 200, description = "Credential record", body = CredentialResponse),
        (status = 401, description = "Admin token required", body = crate::error::ErrorBody),
        (status = 404, description = "Credential not found", body = crate::error::ErrorBody),
        (status = 503, description = "Credential store unavailable", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "credentials"
)]
pub(crate) async fn get_credential(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CredentialResponse>, AppError> {
    let registry = state.registry()?;
    let record = registry.get(parse_id(&id)?).await?;
    Ok(Json(CredentialResponse::from_record(record, registry)))
}

/// Delete a credential record. Stored photo and certificate files remain.
#[utoipa::path(
    delete,
    path = "/credentials/{id}",
    params(("id" = String, Path, description = "Credential id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Admin token required", body = crate::error::ErrorBody),
        (status = 404, description = "Credential not found", body = crate::error::ErrorBody),
        (status = 503, description = "Credential store unavailable", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "credentials"
)]
pub(crate) async fn delete_credential(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let registry = state.registry()?;
    registry.delete(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Download the certificate of the approved credential registered under a phone.
///
/// Unknown and pending phones are indistinguishable.
#[utoipa::path(
    get,
    path = "/credentials/download",
    params(PhoneQuery),
    responses(
        (status = 200, description = "Certificate PDF", content_type = "application/pdf", body = Vec<u8>),
        (status = 400, description = "Missing phone", body = crate::error::ErrorBody),
        (status = 404, description = "No approved credential for this phone", body = crate::error::ErrorBody),
        (status = 503, description = "Credential store unavailable", body = crate::error::ErrorBody),
    ),
    tag = "credentials"
)]
pub(crate) async fn download_certificate(
    State(state): State<AppState>,
    query: Result<Query<PhoneQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let registry = state.registry()?;
    let phone = phone_param(query)?;
    let certificate = registry.retrieve(&phone).await?;

    let disposition = content_disposition(&certificate.filename)?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        certificate.bytes,
    )
        .into_response())
}

/// `attachment` disposition for `filename`.
///
/// Non-ASCII names get an ASCII fallback in `filename` and the exact name
/// in an RFC 5987 `filename*` parameter.
fn content_disposition(filename: &str) -> Result<HeaderValue, AppError> {
    let value = if filename.is_ascii() {
        format!("attachment; filename=\"{filename}\"")
    } else {
        let fallback: String = filename
            .chars()
            .map(|c| if c.is_ascii() { c } else { '_' })
            .collect();
        let encoded = utf8_percent_encode(filename, FILENAME_STAR);
        format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
    };
    HeaderValue::from_str(&value)
        .map_err(|e| AppError::Internal(format!("content-disposition for {filename:?}: {e}")))
}
