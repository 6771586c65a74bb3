pub mod engine;
pub mod states;

pub use engine::ApprovalEngine;
pub use states::{Decision, FlowEvent, TransitionOutcome};
