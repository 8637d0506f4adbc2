//! Credential persistence over the `credentials` table.
//!
//! Phone uniqueness is enforced by the `credentials_phone_key` constraint;
//! a violating insert surfaces as [`StoreError::DuplicatePhone`].

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use mcard_core::{CredentialId, CredentialRecord, CredentialStatus, NewCredential, Phone};
use mcard_registry::{CredentialStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

const COLUMNS: &str = "id, name, national_id, phone, address, photo_ref, status, \
                       certificate_ref, created_at, approved_at";

/// [`CredentialStore`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn insert(&self, new: NewCredential) -> Result<CredentialRecord, StoreError> {
        // Postgres keeps microseconds; truncate so the returned record
        // matches what a later read yields.
        let record =
            CredentialRecord::pending(CredentialId::new(), new, Utc::now().trunc_subsecs(6));

        let result = sqlx::query(
            "INSERT INTO credentials (id, name, national_id, phone, address, photo_ref, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(record.id.as_uuid())
        .bind(&record.name)
        .bind(&record.national_id)
        .bind(record.phone.as_str())
        .bind(&record.address)
        .bind(&record.photo_ref)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(record),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::DuplicatePhone(record.phone.to_string()))
            }
            Err(e) => Err(unavailable(e)),
        }
    }

    async fn get(&self, id: CredentialId) -> Result<Option<CredentialRecord>, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {COLUMNS} FROM credentials WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.map(CredentialRow::into_record).transpose()
    }

    async fn find_by_phone(&self, phone: &Phone) -> Result<Option<CredentialRecord>, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {COLUMNS} FROM credentials WHERE phone = $1"
        ))
        .bind(phone.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.map(CredentialRow::into_record).transpose()
    }

    async fn list(&self) -> Result<Vec<CredentialRecord>, StoreError> {
        let rows = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {COLUMNS} FROM credentials ORDER BY seq"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.into_iter().map(CredentialRow::into_record).collect()
    }

    async fn mark_approved(
        &self,
        id: CredentialId,
        certificate_ref: &str,
        at: DateTime<Utc>,
    ) -> Result<CredentialRecord, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "UPDATE credentials
             SET status = $1, certificate_ref = $2, approved_at = $3
             WHERE id = $4
             RETURNING {COLUMNS}"
        ))
        .bind(CredentialStatus::Approved.as_str())
        .bind(certificate_ref)
        .bind(at)
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.ok_or(StoreError::NotFound(id))?.into_record()
    }

    async fn delete(&self, id: CredentialId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM credentials WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(result.rows_affected() > 0)
    }
}

/// Internal row type for SQLx mapping.
#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    name: String,
    national_id: String,
    phone: String,
    address: String,
    photo_ref: Option<String>,
    status: String,
    certificate_ref: Option<String>,
    created_at: DateTime<Utc>,
    approved_at: Option<DateTime<Utc>>,
}

impl CredentialRow {
    fn into_record(self) -> Result<CredentialRecord, StoreError> {
        let status = CredentialStatus::parse(&self.status).ok_or_else(|| {
            StoreError::Corrupt(format!("credential {}: unknown status {:?}", self.id, self.status))
        })?;
        let phone = Phone::new(&self.phone)
            .map_err(|e| StoreError::Corrupt(format!("credential {}: {e}", self.id)))?;

        let record = CredentialRecord {
            id: CredentialId::from_uuid(self.id),
            name: self.name,
            national_id: self.national_id,
            phone,
            address: self.address,
            photo_ref: self.photo_ref,
            status,
            certificate_ref: self.certificate_ref,
            created_at: self.created_at,
            approved_at: self.approved_at,
        };
        if !record.is_consistent() {
            return Err(StoreError::Corrupt(format!(
                "credential {}: status and certificate reference disagree",
                record.id
            )));
        }
        Ok(record)
    }
}
