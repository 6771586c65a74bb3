use serde::{Deserialize, Serialize};

use crate::domain::movement::{MovementRequest, MovementStatus};
use crate::domain::notification::Notification;
use crate::domain::personnel::PersonnelId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approve" | "approved" => Some(Self::Approve),
            "reject" | "rejected" => Some(Self::Reject),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlowEvent {
    Submitted,
    StepApproved { order: u32 },
    StepRejected { order: u32 },
    Cancelled,
}

impl FlowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submitted => "movement.submitted",
            Self::StepApproved { .. } => "movement.step_approved",
            Self::StepRejected { .. } => "movement.step_rejected",
            Self::Cancelled => "movement.cancelled",
        }
    }
}

/// Result of one state-machine step, computed in memory before anything is written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: MovementStatus,
    pub to: MovementStatus,
    pub event: FlowEvent,
    pub actor: PersonnelId,
    pub request: MovementRequest,
    pub notifications: Vec<Notification>,
}
