use staffmove_core::{NotificationId, PersonnelId, WorkflowError};

use super::{execute, CommandResult};

pub fn list(recipient: String, unread_only: bool) -> CommandResult {
    execute("notifications", |service| async move {
        let notifications = service.notifications_for(&PersonnelId(recipient), unread_only).await?;
        let unread = notifications.iter().filter(|notification| !notification.read).count();
        let message = format!("{} notification(s), {unread} unread", notifications.len());
        Ok::<_, WorkflowError>((message, notifications))
    })
}

pub fn mark_read(notification_id: String, recipient: String) -> CommandResult {
    execute("mark-read", |service| async move {
        let id = NotificationId(notification_id);
        service.mark_notification_read(&id, &PersonnelId(recipient)).await?;
        let message = format!("notification {} marked as read", id.0);
        Ok::<_, WorkflowError>((message, serde_json::json!({ "id": id.0 })))
    })
}
