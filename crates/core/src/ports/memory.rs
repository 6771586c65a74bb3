use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::domain::movement::{MovementId, MovementRequest};
use crate::domain::notification::{Notification, NotificationId};
use crate::domain::personnel::{Personnel, PersonnelId, PersonnelRole};

use super::{MovementStore, NotificationOutbox, PersonnelDirectory, StoreError};

#[derive(Default)]
pub struct InMemoryPersonnelDirectory {
    personnel: RwLock<HashMap<String, Personnel>>,
}

impl InMemoryPersonnelDirectory {
    pub fn with_personnel(personnel: Vec<Personnel>) -> Self {
        Self {
            personnel: RwLock::new(
                personnel.into_iter().map(|person| (person.id.0.clone(), person)).collect(),
            ),
        }
    }
}

#[async_trait::async_trait]
impl PersonnelDirectory for InMemoryPersonnelDirectory {
    async fn find_active_by_role_and_service(
        &self,
        role: PersonnelRole,
        service: &str,
    ) -> Result<Option<Personnel>, StoreError> {
        let personnel = self.personnel.read().await;
        Ok(personnel
            .values()
            .filter(|person| person.active && person.role == role && person.belongs_to(service))
            .min_by(|left, right| left.id.cmp(&right.id))
            .cloned())
    }

    async fn get_by_id(&self, id: &PersonnelId) -> Result<Option<Personnel>, StoreError> {
        let personnel = self.personnel.read().await;
        Ok(personnel.get(&id.0).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryMovementStore {
    movements: RwLock<HashMap<String, MovementRequest>>,
}

#[async_trait::async_trait]
impl MovementStore for InMemoryMovementStore {
    async fn get(&self, id: &MovementId) -> Result<Option<MovementRequest>, StoreError> {
        let movements = self.movements.read().await;
        Ok(movements.get(&id.0).cloned())
    }

    async fn put_if_version_matches(
        &self,
        request: &MovementRequest,
        expected_version: u32,
    ) -> Result<bool, StoreError> {
        let mut movements = self.movements.write().await;
        let current_version = movements.get(&request.id.0).map(|stored| stored.version).unwrap_or(0);
        if current_version != expected_version {
            return Ok(false);
        }

        movements.insert(request.id.0.clone(), request.clone());
        Ok(true)
    }

    async fn query_by_requester(
        &self,
        requester_id: &PersonnelId,
    ) -> Result<Vec<MovementRequest>, StoreError> {
        let movements = self.movements.read().await;
        Ok(movements
            .values()
            .filter(|movement| &movement.requester_id == requester_id)
            .cloned()
            .collect())
    }

    async fn query_all(&self) -> Result<Vec<MovementRequest>, StoreError> {
        let movements = self.movements.read().await;
        Ok(movements.values().cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryNotificationOutbox {
    notifications: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationOutbox {
    pub async fn all(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }
}

#[async_trait::async_trait]
impl NotificationOutbox for InMemoryNotificationOutbox {
    async fn enqueue(&self, notification: Notification) -> Result<(), StoreError> {
        let mut notifications = self.notifications.write().await;
        notifications.push(notification);
        Ok(())
    }

    async fn list_for_recipient(
        &self,
        recipient_id: &PersonnelId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, StoreError> {
        let notifications = self.notifications.read().await;
        let mut matching: Vec<Notification> = notifications
            .iter()
            .filter(|notification| &notification.recipient_id == recipient_id)
            .filter(|notification| !unread_only || !notification.read)
            .cloned()
            .collect();
        matching.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(matching)
    }

    async fn mark_read(
        &self,
        id: &NotificationId,
        recipient_id: &PersonnelId,
    ) -> Result<bool, StoreError> {
        let mut notifications = self.notifications.write().await;
        let Some(notification) = notifications
            .iter_mut()
            .find(|notification| &notification.id == id && &notification.recipient_id == recipient_id)
        else {
            return Ok(false);
        };
        notification.read = true;
        Ok(true)
    }
}
