use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::movement::{MovementId, MovementStatus, MovementType, ValidatorRole};
use crate::domain::personnel::PersonnelId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationFailure {
    BlankField { field: String },
    DateRange { start_date: NaiveDate, end_date: NaiveDate },
    MissingDestination { movement_type: MovementType },
    NegativeBudget { budget_estimate: Decimal },
    InvalidValue { field: String, value: String },
    UnknownRequester { requester_id: PersonnelId },
    MalformedChain { reason: String },
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField { field } => write!(f, "`{field}` must not be blank"),
            Self::DateRange { start_date, end_date } => {
                write!(f, "start date {start_date} is after end date {end_date}")
            }
            Self::MissingDestination { movement_type } => {
                write!(f, "a destination is required for `{}` movements", movement_type.as_str())
            }
            Self::NegativeBudget { budget_estimate } => {
                write!(f, "budget estimate {budget_estimate} must not be negative")
            }
            Self::InvalidValue { field, value } => write!(f, "invalid value `{value}` for `{field}`"),
            Self::UnknownRequester { requester_id } => {
                write!(f, "requester `{requester_id}` is not an active member of staff")
            }
            Self::MalformedChain { reason } => write!(f, "malformed validation chain: {reason}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoValidatorReason {
    NotFound,
    SelfApproval,
}

impl std::fmt::Display for NoValidatorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => f.write_str("no active holder in the directory"),
            Self::SelfApproval => f.write_str("the only holder is the requester"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("validation failed: {0}")]
    Validation(ValidationFailure),
    #[error("movement `{movement_id}` is {status}; cannot {operation}")]
    InvalidState { movement_id: MovementId, status: MovementStatus, operation: &'static str },
    #[error("`{actor}` may not {operation} movement `{movement_id}`: {reason}")]
    Authorization {
        movement_id: MovementId,
        actor: PersonnelId,
        operation: &'static str,
        reason: String,
    },
    #[error("no `{role}` validator for service `{service}`: {reason}")]
    NoValidator { role: ValidatorRole, service: String, reason: NoValidatorReason },
    #[error("movement `{movement_id}` changed since version {expected_version}; re-read and retry")]
    ConcurrentModification { movement_id: MovementId, expected_version: u32 },
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: &'static str, timeout_ms: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    InvalidState,
    Authorization,
    NoValidator,
    ConcurrentModification,
    NotFound,
    Persistence,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::InvalidState => "invalid_state",
            Self::Authorization => "authorization",
            Self::NoValidator => "no_validator",
            Self::ConcurrentModification => "concurrent_modification",
            Self::NotFound => "not_found",
            Self::Persistence => "persistence",
            Self::Timeout => "timeout",
        }
    }
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Authorization { .. } => ErrorKind::Authorization,
            Self::NoValidator { .. } => ErrorKind::NoValidator,
            Self::ConcurrentModification { .. } => ErrorKind::ConcurrentModification,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Only optimistic-concurrency conflicts and collaborator hiccups are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::ConcurrentModification | ErrorKind::Timeout)
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. } => correlation_id,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Forbidden { .. } => "You are not allowed to perform this action.",
            Self::Conflict { .. } => {
                "The movement changed in the meantime. Reload it and try again."
            }
            Self::NotFound { .. } => "The requested movement could not be found.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
        }
    }
}

impl From<WorkflowError> for InterfaceError {
    fn from(value: WorkflowError) -> Self {
        let correlation_id = "unassigned".to_owned();
        let message = value.to_string();
        match value {
            WorkflowError::Validation(_) | WorkflowError::NoValidator { .. } => {
                Self::BadRequest { message, correlation_id }
            }
            WorkflowError::Authorization { .. } => Self::Forbidden { message, correlation_id },
            WorkflowError::InvalidState { .. } | WorkflowError::ConcurrentModification { .. } => {
                Self::Conflict { message, correlation_id }
            }
            WorkflowError::NotFound { .. } => Self::NotFound { message, correlation_id },
            WorkflowError::Persistence(_) | WorkflowError::Timeout { .. } => {
                Self::ServiceUnavailable { message, correlation_id }
            }
        }
    }
}
