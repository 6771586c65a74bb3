use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::movement::{MovementId, MovementRequest, MovementStatus};
use crate::domain::personnel::PersonnelId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ValidationRequest,
    StatusUpdated,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationRequest => "validation_request",
            Self::StatusUpdated => "status_updated",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "validation_request" => Some(Self::ValidationRequest),
            "status_updated" => Some(Self::StatusUpdated),
            _ => None,
        }
    }
}

/// Outbox record telling someone a movement needs them or has changed. Delivery (mail,
/// push) happens elsewhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: PersonnelId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub movement_id: MovementId,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn validation_request(
        recipient_id: PersonnelId,
        request: &MovementRequest,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId(Uuid::new_v4().to_string()),
            recipient_id,
            kind: NotificationKind::ValidationRequest,
            title: "Nouvelle demande à valider".to_string(),
            message: format!(
                "{} ({}) du {} au {} attend votre validation.",
                request.title,
                request.movement_type.as_str(),
                request.start_date,
                request.end_date
            ),
            movement_id: request.id.clone(),
            read: false,
            created_at: now,
        }
    }

    pub fn status_updated(
        recipient_id: PersonnelId,
        request: &MovementRequest,
        now: DateTime<Utc>,
    ) -> Self {
        let outcome = match request.status {
            MovementStatus::Approved => "a été approuvée",
            MovementStatus::Rejected => "a été rejetée",
            MovementStatus::Cancelled => "a été annulée",
            MovementStatus::Pending(_) => "est en cours de validation",
            MovementStatus::Draft => "est en brouillon",
        };

        Self {
            id: NotificationId(Uuid::new_v4().to_string()),
            recipient_id,
            kind: NotificationKind::StatusUpdated,
            title: "Statut de demande mis à jour".to_string(),
            message: format!("Votre demande « {} » {outcome}.", request.title),
            movement_id: request.id.clone(),
            read: false,
            created_at: now,
        }
    }

    /// Tells the validator whose step was open that the requester withdrew the movement.
    pub fn withdrawn(
        recipient_id: PersonnelId,
        request: &MovementRequest,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId(Uuid::new_v4().to_string()),
            recipient_id,
            kind: NotificationKind::StatusUpdated,
            title: "Demande annulée".to_string(),
            message: format!(
                "La demande « {} » en attente de votre validation a été annulée par le demandeur.",
                request.title
            ),
            movement_id: request.id.clone(),
            read: false,
            created_at: now,
        }
    }
}
