pub mod approvals;
pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod ports;
pub mod queries;
pub mod service;

pub use approvals::{ChainPolicy, ValidationChainBuilder};
pub use audit::{AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::movement::{
    MovementId, MovementRequest, MovementStatus, MovementType, NewMovement, Urgency, Validation,
    ValidationStatus, ValidatorRole,
};
pub use domain::notification::{Notification, NotificationId, NotificationKind};
pub use domain::personnel::{Personnel, PersonnelId, PersonnelRole};
pub use errors::{ErrorKind, InterfaceError, ValidationFailure, WorkflowError};
pub use flows::{ApprovalEngine, Decision, FlowEvent, TransitionOutcome};
pub use ports::{MovementStore, NotificationOutbox, PersonnelDirectory, StoreError};
pub use queries::MovementSummary;
pub use service::MovementService;
