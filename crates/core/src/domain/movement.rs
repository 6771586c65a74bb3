use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::personnel::PersonnelId;
use crate::errors::{ValidationFailure, WorkflowError};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MovementId(pub String);

impl MovementId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for MovementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationId(pub String);

impl ValidationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Leave,
    SickLeave,
    MaternityLeave,
    Mission,
    Training,
    Transfer,
    Delegation,
    Other,
}

impl MovementType {
    pub const ALL: [MovementType; 8] = [
        Self::Leave,
        Self::SickLeave,
        Self::MaternityLeave,
        Self::Mission,
        Self::Training,
        Self::Transfer,
        Self::Delegation,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leave => "leave",
            Self::SickLeave => "sick_leave",
            Self::MaternityLeave => "maternity_leave",
            Self::Mission => "mission",
            Self::Training => "training",
            Self::Transfer => "transfer",
            Self::Delegation => "delegation",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "leave" => Some(Self::Leave),
            "sick_leave" => Some(Self::SickLeave),
            "maternity_leave" => Some(Self::MaternityLeave),
            "mission" => Some(Self::Mission),
            "training" => Some(Self::Training),
            "transfer" => Some(Self::Transfer),
            "delegation" => Some(Self::Delegation),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Movements that take the person away from their post carry a destination and an
    /// administrative cost, which is also what pulls HR into the chain.
    pub fn requires_destination(&self) -> bool {
        matches!(self, Self::Mission | Self::Training | Self::Transfer | Self::Delegation)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    Draft,
    /// Awaiting the decision of the validation at this order.
    Pending(u32),
    Approved,
    Rejected,
    Cancelled,
}

impl MovementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending(_) => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn pending_order(&self) -> Option<u32> {
        match self {
            Self::Pending(order) => Some(*order),
            _ => None,
        }
    }

    pub fn parse(value: &str, pending_order: Option<u32>) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "pending" => pending_order.filter(|order| *order >= 1).map(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Cancelled)
    }
}

impl std::fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending(order) => write!(f, "pending({order})"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorRole {
    ServiceChief,
    Hr,
    Admin,
}

impl ValidatorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServiceChief => "service_chief",
            Self::Hr => "hr",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "service_chief" => Some(Self::ServiceChief),
            "hr" => Some(Self::Hr),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValidatorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// One approval step. Membership and `order` are fixed when the chain is built; only the
/// decision fields change afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub id: ValidationId,
    pub validator_id: PersonnelId,
    pub validator_role: ValidatorRole,
    pub status: ValidationStatus,
    pub comment: Option<String>,
    pub validated_at: Option<DateTime<Utc>>,
    pub order: u32,
}

impl Validation {
    pub fn pending(validator_id: PersonnelId, validator_role: ValidatorRole, order: u32) -> Self {
        Self {
            id: ValidationId::generate(),
            validator_id,
            validator_role,
            status: ValidationStatus::Pending,
            comment: None,
            validated_at: None,
            order,
        }
    }
}

/// Caller-supplied fields for a new request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub requester_id: PersonnelId,
    pub movement_type: MovementType,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub destination: Option<String>,
    pub urgency: Urgency,
    pub budget_estimate: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub id: MovementId,
    pub requester_id: PersonnelId,
    pub movement_type: MovementType,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub destination: Option<String>,
    pub urgency: Urgency,
    pub budget_estimate: Option<Decimal>,
    pub status: MovementStatus,
    pub validations: Vec<Validation>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MovementRequest {
    pub fn create(
        id: MovementId,
        input: NewMovement,
        now: DateTime<Utc>,
    ) -> Result<Self, WorkflowError> {
        let title = required_text("title", &input.title)?;
        let description = required_text("description", &input.description)?;

        if input.start_date > input.end_date {
            return Err(WorkflowError::Validation(ValidationFailure::DateRange {
                start_date: input.start_date,
                end_date: input.end_date,
            }));
        }

        let destination = input
            .destination
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        if input.movement_type.requires_destination() && destination.is_none() {
            return Err(WorkflowError::Validation(ValidationFailure::MissingDestination {
                movement_type: input.movement_type,
            }));
        }

        if let Some(budget) = input.budget_estimate {
            if budget < Decimal::ZERO {
                return Err(WorkflowError::Validation(ValidationFailure::NegativeBudget {
                    budget_estimate: budget,
                }));
            }
        }

        Ok(Self {
            id,
            requester_id: input.requester_id,
            movement_type: input.movement_type,
            title,
            description,
            start_date: input.start_date,
            end_date: input.end_date,
            destination,
            urgency: input.urgency,
            budget_estimate: input.budget_estimate,
            status: MovementStatus::Draft,
            validations: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The single step currently open for a decision: the lowest-order pending entry whose
    /// predecessors are all approved. `None` for drafts, terminal requests and frozen chains.
    pub fn actionable_validation(&self) -> Option<&Validation> {
        if !matches!(self.status, MovementStatus::Pending(_)) {
            return None;
        }
        first_open_step(&self.validations)
    }

    pub fn is_awaiting(&self, validator_id: &PersonnelId) -> bool {
        self.actionable_validation().is_some_and(|step| &step.validator_id == validator_id)
    }

    /// Status implied by the chain alone. Drafts and cancellations are not chain outcomes and
    /// are returned unchanged.
    pub fn derived_status(&self) -> MovementStatus {
        match self.status {
            MovementStatus::Draft | MovementStatus::Cancelled => self.status,
            _ => status_from_chain(&self.validations),
        }
    }

    /// Freezes `chain` onto a draft and opens its first step.
    pub fn submit(
        &mut self,
        chain: Vec<Validation>,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if self.status != MovementStatus::Draft {
            return Err(WorkflowError::InvalidState {
                movement_id: self.id.clone(),
                status: self.status,
                operation: "submit",
            });
        }
        check_chain(&self.requester_id, &chain)?;

        self.validations = chain;
        self.status = status_from_chain(&self.validations);
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, by: &PersonnelId, now: DateTime<Utc>) -> Result<(), WorkflowError> {
        if by != &self.requester_id {
            return Err(WorkflowError::Authorization {
                movement_id: self.id.clone(),
                actor: by.clone(),
                operation: "cancel",
                reason: "only the requester may cancel a movement".to_string(),
            });
        }
        if self.status.is_terminal() {
            return Err(WorkflowError::InvalidState {
                movement_id: self.id.clone(),
                status: self.status,
                operation: "cancel",
            });
        }

        self.status = MovementStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    /// Calendar days covered by the movement, both ends included.
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

pub(crate) fn first_open_step(chain: &[Validation]) -> Option<&Validation> {
    for step in chain {
        match step.status {
            ValidationStatus::Approved => continue,
            ValidationStatus::Pending => return Some(step),
            ValidationStatus::Rejected => return None,
        }
    }
    None
}

pub(crate) fn status_from_chain(chain: &[Validation]) -> MovementStatus {
    if chain.iter().any(|step| step.status == ValidationStatus::Rejected) {
        return MovementStatus::Rejected;
    }
    match first_open_step(chain) {
        Some(step) => MovementStatus::Pending(step.order),
        None => MovementStatus::Approved,
    }
}

fn check_chain(requester_id: &PersonnelId, chain: &[Validation]) -> Result<(), WorkflowError> {
    if chain.is_empty() {
        return Err(malformed_chain("chain is empty"));
    }
    for (index, step) in chain.iter().enumerate() {
        if usize::try_from(step.order).ok() != Some(index + 1) {
            return Err(malformed_chain("orders must run 1..N without gaps"));
        }
        if step.status != ValidationStatus::Pending || step.validated_at.is_some() {
            return Err(malformed_chain("new chains must start fully pending"));
        }
        if &step.validator_id == requester_id {
            return Err(malformed_chain("requester cannot validate their own movement"));
        }
    }
    Ok(())
}

fn malformed_chain(reason: &str) -> WorkflowError {
    WorkflowError::Validation(ValidationFailure::MalformedChain { reason: reason.to_string() })
}

fn required_text(field: &'static str, value: &str) -> Result<String, WorkflowError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WorkflowError::Validation(ValidationFailure::BlankField {
            field: field.to_string(),
        }));
    }
    Ok(trimmed.to_string())
}
