//! # Integration Tests for mcard-api
//!
//! Drives the full router with `oneshot` requests over in-memory stores:
//! health checks, the register → approve → download workflow, duplicate
//! and availability handling, admin token enforcement, 503 without a
//! credential store, and OpenAPI generation.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use mcard_api::auth::SecretToken;
use mcard_api::config::AppConfig;
use mcard_api::state::AppState;
use mcard_registry::{MemoryBlobStore, MemoryCredentialStore, Registry};

const BOUNDARY: &str = "mcard-test-boundary";

/// Helper: build the test app with auth disabled and in-memory stores.
fn test_app() -> axum::Router {
    mcard_api::app(AppState::new())
}

/// Helper: build the test app with auth enabled.
fn test_app_with_auth(token: &str) -> axum::Router {
    let config = AppConfig {
        auth_token: Some(SecretToken::new(token)),
        ..AppConfig::default()
    };
    let registry = Registry::new(
        Arc::new(MemoryCredentialStore::new()),
        Arc::new(MemoryBlobStore::new()),
    )
    .with_media_base_url(config.media_base_url());
    mcard_api::app(AppState::with_config(config, Some(registry)))
}

/// Helper: build the test app with no credential store.
fn test_app_without_store() -> axum::Router {
    mcard_api::app(AppState::with_config(AppConfig::default(), None))
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

async fn body_bytes(response: axum::http::Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

/// Helper: encode a multipart form of text fields and an optional photo.
fn multipart(fields: &[(&str, &str)], photo: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = photo {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"{filename}\"\r\n\
                 Content-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/credentials")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn register_request(fields: &[(&str, &str)]) -> Request<Body> {
    multipart_request(multipart(fields, None))
}

fn asha_form() -> Request<Body> {
    register_request(&[
        ("name", "Asha Rao"),
        ("national_id", "1234-5678-9012"),
        ("phone", "9000000001"),
        ("address", "12 MG Road, Bengaluru"),
    ])
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn with_bearer(mut req: Request<Body>, token: &str) -> Request<Body> {
    req.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    req
}

/// Register Asha Rao and return the new credential id.
async fn register_asha(app: &axum::Router) -> String {
    let response = app.clone().oneshot(asha_form()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    json["id"].as_str().unwrap().to_string()
}

// -- Health Checks ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_check() {
    let response = test_app().oneshot(get("/health/liveness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_check() {
    let response = test_app().oneshot(get("/health/readiness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

#[tokio::test]
async fn test_readiness_fails_without_store() {
    let response = test_app_without_store()
        .oneshot(get("/health/readiness"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// -- Registration -------------------------------------------------------------

#[tokio::test]
async fn test_register_returns_pending_record() {
    let response = test_app().oneshot(asha_form()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["name"], "Asha Rao");
    assert_eq!(json["phone"], "9000000001");
    assert_eq!(json["status"], "PENDING");
    assert!(json.get("certificate_ref").is_none());
    assert_eq!(json["membership_number"].as_str().unwrap().len(), 8);
}

#[tokio::test]
async fn test_register_accepts_national_id_aliases() {
    let app = test_app();
    for (field, phone) in [("nationalId", "9000000002"), ("aadhar_number", "9000000003")] {
        let response = app
            .clone()
            .oneshot(register_request(&[
                ("name", "Ravi"),
                (field, "4321"),
                ("phone", phone),
                ("address", "Pune"),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["national_id"], "4321");
    }
}

#[tokio::test]
async fn test_register_stores_photo() {
    let response = test_app()
        .oneshot(multipart_request(multipart(
            &[("name", "Asha Rao"), ("phone", "9000000001")],
            Some(("My Photo.JPG", &b"\xff\xd8\xff\xe0jpeg"[..])),
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["photo_ref"], "licenses/photos/My_Photo.jpg");
    assert_eq!(
        json["photo_url"],
        "http://localhost:8080/media/licenses/photos/My_Photo.jpg"
    );
}

#[tokio::test]
async fn test_register_without_phone_is_400() {
    let response = test_app()
        .oneshot(register_request(&[("name", "Asha Rao")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_register_rejects_unknown_field() {
    let response = test_app()
        .oneshot(register_request(&[
            ("phone", "9000000001"),
            ("status", "APPROVED"),
        ]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("status"));
}

#[tokio::test]
async fn test_register_requires_multipart() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/credentials")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"phone":"9000000001"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_duplicate_phone_is_400() {
    let app = test_app();
    register_asha(&app).await;
    let response = app.oneshot(asha_form()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "DUPLICATE_PHONE");
    assert_eq!(
        json["error"]["message"],
        "This phone number is already registered."
    );
}

// -- Availability -------------------------------------------------------------

#[tokio::test]
async fn test_check_availability() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(get("/credentials/check?phone=9000000001"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["available"], true);
    assert_eq!(json["message"], "Phone number available.");

    register_asha(&app).await;
    let json = body_json(
        app.oneshot(get("/credentials/check?phone=9000000001"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(json["available"], false);
    assert_eq!(json["message"], "This phone number is already registered.");
}

#[tokio::test]
async fn test_check_without_phone_is_400() {
    let response = test_app().oneshot(get("/credentials/check")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// -- Approval and Download ----------------------------------------------------

#[tokio::test]
async fn test_approve_then_download() {
    let app = test_app();
    let id = register_asha(&app).await;

    let response = app
        .clone()
        .oneshot(post(&format!("/credentials/{id}/approve")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Approved successfully!");
    assert_eq!(
        json["certificate_ref"],
        "licenses/generated/NEHRU_MLA_Asha_Rao.pdf"
    );
    assert_eq!(
        json["certificate_url"],
        "http://localhost:8080/media/licenses/generated/NEHRU_MLA_Asha_Rao.pdf"
    );
    assert!(json["notification_link"]
        .as_str()
        .unwrap()
        .starts_with("https://wa.me/919000000001?text="));
    assert_eq!(json["credential"]["status"], "APPROVED");

    let response = app
        .oneshot(get("/credentials/download?phone=9000000001"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/pdf"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"NEHRU_MLA_Asha_Rao.pdf\""
    );
    let pdf = body_bytes(response).await;
    assert!(pdf.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_download_pending_is_404() {
    let app = test_app();
    register_asha(&app).await;
    let pending = app
        .clone()
        .oneshot(get("/credentials/download?phone=9000000001"))
        .await
        .unwrap();
    let unknown = app
        .oneshot(get("/credentials/download?phone=9999999999"))
        .await
        .unwrap();
    assert_eq!(pending.status(), StatusCode::NOT_FOUND);
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(pending).await, body_string(unknown).await);
}

#[tokio::test]
async fn test_download_without_phone_is_400() {
    let response = test_app()
        .oneshot(get("/credentials/download"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reapprove_keeps_certificate_ref() {
    let app = test_app();
    let id = register_asha(&app).await;
    let first = body_json(
        app.clone()
            .oneshot(post(&format!("/credentials/{id}/approve")))
            .await
            .unwrap(),
    )
    .await;
    let second = body_json(
        app.oneshot(post(&format!("/credentials/{id}/approve")))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(first["certificate_ref"], second["certificate_ref"]);
}

#[tokio::test]
async fn test_approve_unknown_or_malformed_id_is_404() {
    let app = test_app();
    let unknown = app
        .clone()
        .oneshot(post(
            "/credentials/6f1c2a9e-3b4d-4c5e-8f70-123456789abc/approve",
        ))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let malformed = app
        .oneshot(post("/credentials/not-a-uuid/approve"))
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(malformed).await["error"]["code"], "NOT_FOUND");
}

// -- Admin Record Management --------------------------------------------------

#[tokio::test]
async fn test_list_get_and_delete() {
    let app = test_app();
    let id = register_asha(&app).await;

    let list = body_json(app.clone().oneshot(get("/credentials")).await.unwrap()).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], id.as_str());

    let response = app
        .clone()
        .oneshot(get(&format!("/credentials/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "Asha Rao");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/credentials/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(get(&format!("/credentials/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The phone is free again.
    let json = body_json(
        app.oneshot(get("/credentials/check?phone=9000000001"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(json["available"], true);
}

#[tokio::test]
async fn test_delete_unknown_is_404() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/credentials/6f1c2a9e-3b4d-4c5e-8f70-123456789abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn test_admin_routes_require_token() {
    let app = test_app_with_auth("s3cret");
    let id = register_asha(&app).await;

    let response = app.clone().oneshot(get("/credentials")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(post(&format!("/credentials/{id}/approve")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(with_bearer(
            post(&format!("/credentials/{id}/approve")),
            "s3cret",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(with_bearer(get("/credentials"), "wrong"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_routes_open_with_auth_enabled() {
    let app = test_app_with_auth("s3cret");
    let response = app
        .clone()
        .oneshot(get("/credentials/check?phone=9000000001"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.oneshot(get("/health/liveness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Store Unavailable ----------------------------------------------------------

#[tokio::test]
async fn test_credential_routes_return_503_without_store() {
    let app = test_app_without_store();
    for request in [
        get("/credentials"),
        get("/credentials/check?phone=9000000001"),
        get("/credentials/download?phone=9000000001"),
        post("/credentials/6f1c2a9e-3b4d-4c5e-8f70-123456789abc/approve"),
        asha_form(),
    ] {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "SERVICE_UNAVAILABLE");
    }
}

// -- Introspection ------------------------------------------------------------

#[tokio::test]
async fn test_openapi_spec() {
    let response = test_app().oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/credentials/{id}/approve"].is_object());
}

#[tokio::test]
async fn test_metrics_count_requests() {
    let app = test_app();
    app.clone()
        .oneshot(register_request(&[("name", "Asha Rao"), ("phone", "9000000001")]))
        .await
        .unwrap();
    app.clone()
        .oneshot(get("/credentials/check?phone=1"))
        .await
        .unwrap();
    app.clone()
        .oneshot(get("/credentials/nope"))
        .await
        .unwrap();

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; version=0.0.4; charset=utf-8"
    );
    let text = body_string(response).await;
    assert!(text.contains(
        r#"mcard_http_requests_total{method="GET",path="/credentials/check",status="200"} 1"#
    ));
    assert!(text.contains(
        r#"mcard_http_errors_total{method="GET",path="/credentials/:id",status="404"} 1"#
    ));
    assert!(text.contains("mcard_http_request_duration_seconds_count"));
    assert!(text.contains(r#"mcard_credentials_total{status="PENDING"} 1"#));
    assert!(text.contains(r#"mcard_credentials_total{status="APPROVED"} 0"#));
}
