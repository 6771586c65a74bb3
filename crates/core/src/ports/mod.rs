use async_trait::async_trait;
use thiserror::Error;

use crate::domain::movement::{MovementId, MovementRequest};
use crate::domain::notification::{Notification, NotificationId};
use crate::domain::personnel::{Personnel, PersonnelId, PersonnelRole};
use crate::errors::WorkflowError;

pub mod memory;

pub use memory::{InMemoryMovementStore, InMemoryNotificationOutbox, InMemoryPersonnelDirectory};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<StoreError> for WorkflowError {
    fn from(value: StoreError) -> Self {
        WorkflowError::Persistence(value.to_string())
    }
}

/// Read-only view of the staff directory.
///
/// Lookups that match nothing return `Ok(None)`; errors are reserved for backend failures.
#[async_trait]
pub trait PersonnelDirectory: Send + Sync {
    async fn find_active_by_role_and_service(
        &self,
        role: PersonnelRole,
        service: &str,
    ) -> Result<Option<Personnel>, StoreError>;

    async fn get_by_id(&self, id: &PersonnelId) -> Result<Option<Personnel>, StoreError>;
}

/// Movement persistence with optimistic concurrency.
#[async_trait]
pub trait MovementStore: Send + Sync {
    async fn get(&self, id: &MovementId) -> Result<Option<MovementRequest>, StoreError>;

    /// Writes `request` only if the stored version equals `expected_version`, where `0` means
    /// "must not exist yet". Returns `false` when the condition does not hold, in which case
    /// nothing was written.
    async fn put_if_version_matches(
        &self,
        request: &MovementRequest,
        expected_version: u32,
    ) -> Result<bool, StoreError>;

    async fn query_by_requester(
        &self,
        requester_id: &PersonnelId,
    ) -> Result<Vec<MovementRequest>, StoreError>;

    async fn query_all(&self) -> Result<Vec<MovementRequest>, StoreError>;
}

#[async_trait]
pub trait NotificationOutbox: Send + Sync {
    async fn enqueue(&self, notification: Notification) -> Result<(), StoreError>;

    async fn list_for_recipient(
        &self,
        recipient_id: &PersonnelId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, StoreError>;

    /// Returns `false` when no notification with that id belongs to `recipient_id`.
    async fn mark_read(
        &self,
        id: &NotificationId,
        recipient_id: &PersonnelId,
    ) -> Result<bool, StoreError>;
}
