//! # Request Extraction Helpers
//!
//! Maps axum extractor rejections to [`AppError`] and turns the
//! multipart registration form into a [`Registration`].

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::Multipart;
use mcard_core::ValidationError;
use mcard_registry::{PhotoUpload, Registration};

use crate::error::AppError;

/// Accepted spellings of the national ID field.
const NATIONAL_ID_FIELDS: [&str; 3] = ["national_id", "nationalId", "aadhar_number"];

fn multipart_error(err: MultipartError) -> AppError {
    AppError::BadRequest(err.body_text())
}

async fn text(field: Field<'_>) -> Result<String, AppError> {
    field.text().await.map_err(multipart_error)
}

/// Read a multipart registration form.
///
/// Text fields: `name`, `national_id` (also `nationalId` or
/// `aadhar_number`), `phone`, `address`. File field: `photo`. Any other
/// field is rejected. Missing text fields are left empty; the registry
/// decides which are required.
pub async fn read_registration(
    body: Result<Multipart, MultipartRejection>,
) -> Result<Registration, AppError> {
    let mut multipart = body.map_err(|err| AppError::BadRequest(err.body_text()))?;
    let mut form = Registration::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "name" => form.name = text(field).await?,
            "phone" => form.phone = text(field).await?,
            "address" => form.address = text(field).await?,
            n if NATIONAL_ID_FIELDS.contains(&n) => form.national_id = text(field).await?,
            "photo" => {
                let filename = field.file_name().unwrap_or("photo").to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.photo = Some(PhotoUpload {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            _ => return Err(ValidationError::UnknownField(name).into()),
        }
    }

    Ok(form)
}
