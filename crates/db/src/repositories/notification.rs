use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use staffmove_core::domain::movement::MovementId;
use staffmove_core::domain::notification::{Notification, NotificationId, NotificationKind};
use staffmove_core::domain::personnel::PersonnelId;
use staffmove_core::ports::{NotificationOutbox, StoreError};

use super::{decode_error, parse_timestamp, unknown_value, RepositoryError};
use crate::DbPool;

#[derive(Clone)]
pub struct SqlNotificationOutbox {
    pool: DbPool,
}

impl SqlNotificationOutbox {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, notification: &Notification) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO movement_notification
                 (id, recipient_id, kind, title, message, movement_id, read, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&notification.id.0)
        .bind(&notification.recipient_id.0)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.movement_id.0)
        .bind(notification.read)
        .bind(notification.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(
        &self,
        recipient_id: &PersonnelId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, recipient_id, kind, title, message, movement_id, read, created_at
             FROM movement_notification
             WHERE recipient_id = ? AND (? = 0 OR read = 0)
             ORDER BY created_at DESC, id DESC",
        )
        .bind(&recipient_id.0)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_notification).collect()
    }

    async fn set_read(
        &self,
        id: &NotificationId,
        recipient_id: &PersonnelId,
    ) -> Result<bool, RepositoryError> {
        let affected = sqlx::query(
            "UPDATE movement_notification SET read = 1 WHERE id = ? AND recipient_id = ?",
        )
        .bind(&id.0)
        .bind(&recipient_id.0)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected > 0)
    }
}

#[async_trait::async_trait]
impl NotificationOutbox for SqlNotificationOutbox {
    async fn enqueue(&self, notification: Notification) -> Result<(), StoreError> {
        Ok(self.insert(&notification).await?)
    }

    async fn list_for_recipient(
        &self,
        recipient_id: &PersonnelId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, StoreError> {
        Ok(self.list(recipient_id, unread_only).await?)
    }

    async fn mark_read(
        &self,
        id: &NotificationId,
        recipient_id: &PersonnelId,
    ) -> Result<bool, StoreError> {
        Ok(self.set_read(id, recipient_id).await?)
    }
}

fn row_to_notification(row: &SqliteRow) -> Result<Notification, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| decode_error("id", e))?;
    let recipient_id: String =
        row.try_get("recipient_id").map_err(|e| decode_error("recipient_id", e))?;
    let kind: String = row.try_get("kind").map_err(|e| decode_error("kind", e))?;
    let title: String = row.try_get("title").map_err(|e| decode_error("title", e))?;
    let message: String = row.try_get("message").map_err(|e| decode_error("message", e))?;
    let movement_id: String =
        row.try_get("movement_id").map_err(|e| decode_error("movement_id", e))?;
    let read: bool = row.try_get("read").map_err(|e| decode_error("read", e))?;
    let created_at: String = row.try_get("created_at").map_err(|e| decode_error("created_at", e))?;

    Ok(Notification {
        id: NotificationId(id),
        recipient_id: PersonnelId(recipient_id),
        kind: NotificationKind::parse(&kind).ok_or_else(|| unknown_value("kind", &kind))?,
        title,
        message,
        movement_id: MovementId(movement_id),
        read,
        created_at: parse_timestamp("created_at", created_at)?,
    })
}
