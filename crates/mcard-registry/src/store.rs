//! # Document Store Contract
//!
//! [`CredentialStore`] is the persistence boundary for credential records.
//! Implementations must make [`CredentialStore::insert`] atomic with
//! respect to phone uniqueness: of any number of concurrent inserts with
//! the same phone, exactly one succeeds and the rest fail with
//! [`StoreError::DuplicatePhone`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mcard_core::{CredentialId, CredentialRecord, NewCredential, Phone};
use parking_lot::RwLock;

use crate::error::StoreError;

/// Persistence for credential records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a new `Pending` record, assigning its id and creation time.
    async fn insert(&self, new: NewCredential) -> Result<CredentialRecord, StoreError>;

    /// Fetch a record by id.
    async fn get(&self, id: CredentialId) -> Result<Option<CredentialRecord>, StoreError>;

    /// Fetch the record registered under `phone`, if any.
    async fn find_by_phone(&self, phone: &Phone) -> Result<Option<CredentialRecord>, StoreError>;

    /// All records in insertion order.
    async fn list(&self) -> Result<Vec<CredentialRecord>, StoreError>;

    /// Set the record `Approved` with the given certificate reference.
    ///
    /// Fails with [`StoreError::NotFound`] if the record no longer exists.
    async fn mark_approved(
        &self,
        id: CredentialId,
        certificate_ref: &str,
        at: DateTime<Utc>,
    ) -> Result<CredentialRecord, StoreError>;

    /// Remove a record. Returns `false` if it did not exist.
    async fn delete(&self, id: CredentialId) -> Result<bool, StoreError>;
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<CredentialId, CredentialRecord>,
    by_phone: HashMap<Phone, CredentialId>,
    order: Vec<CredentialId>,
}

/// Thread-safe in-memory credential store.
///
/// All state sits behind one `parking_lot::RwLock`, so the phone check and
/// the insert happen under the same write guard. The lock is never held
/// across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn insert(&self, new: NewCredential) -> Result<CredentialRecord, StoreError> {
        let mut inner = self.inner.write();
        if inner.by_phone.contains_key(&new.phone) {
            return Err(StoreError::DuplicatePhone(new.phone.to_string()));
        }
        let record = CredentialRecord::pending(CredentialId::new(), new, Utc::now());
        inner.by_phone.insert(record.phone.clone(), record.id);
        inner.order.push(record.id);
        inner.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: CredentialId) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.inner.read().records.get(&id).cloned())
    }

    async fn find_by_phone(&self, phone: &Phone) -> Result<Option<CredentialRecord>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .by_phone
            .get(phone)
            .and_then(|id| inner.records.get(id))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<CredentialRecord>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id))
            .cloned()
            .collect())
    }

    async fn mark_approved(
        &self,
        id: CredentialId,
        certificate_ref: &str,
        at: DateTime<Utc>,
    ) -> Result<CredentialRecord, StoreError> {
        let mut inner = self.inner.write();
        let record = inner.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.approve(certificate_ref, at);
        Ok(record.clone())
    }

    async fn delete(&self, id: CredentialId) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();
        let Some(record) = inner.records.remove(&id) else {
            return Ok(false);
        };
        inner.by_phone.remove(&record.phone);
        inner.order.retain(|x| *x != id);
        Ok(true)
    }
}
