use chrono::{DateTime, Utc};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::movement::{
    status_from_chain, MovementRequest, MovementStatus, Validation, ValidationStatus,
};
use crate::domain::notification::Notification;
use crate::domain::personnel::PersonnelId;
use crate::errors::WorkflowError;
use crate::flows::states::{Decision, FlowEvent, TransitionOutcome};

/// Pure approval state machine. Every method works on a copy of the request and hands back
/// the complete next state, so callers can persist it with a single conditional write.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApprovalEngine;

impl ApprovalEngine {
    pub fn submit(
        &self,
        request: &MovementRequest,
        chain: Vec<Validation>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let mut next = request.clone();
        next.submit(chain, now)?;

        let notifications = next
            .actionable_validation()
            .map(|step| Notification::validation_request(step.validator_id.clone(), &next, now))
            .into_iter()
            .collect();

        Ok(TransitionOutcome {
            from: request.status,
            to: next.status,
            event: FlowEvent::Submitted,
            actor: request.requester_id.clone(),
            request: next,
            notifications,
        })
    }

    pub fn decide(
        &self,
        request: &MovementRequest,
        validator_id: &PersonnelId,
        decision: Decision,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        if !matches!(request.status, MovementStatus::Pending(_)) {
            return Err(WorkflowError::InvalidState {
                movement_id: request.id.clone(),
                status: request.status,
                operation: "decide",
            });
        }

        let Some(open_step) = request.actionable_validation() else {
            return Err(WorkflowError::InvalidState {
                movement_id: request.id.clone(),
                status: request.status,
                operation: "decide",
            });
        };

        if &open_step.validator_id != validator_id {
            return Err(WorkflowError::Authorization {
                movement_id: request.id.clone(),
                actor: validator_id.clone(),
                operation: "decide",
                reason: format!("step {} is assigned to another validator", open_step.order),
            });
        }

        let order = open_step.order;
        let mut next = request.clone();
        let Some(step) = next.validations.iter_mut().find(|step| step.order == order) else {
            return Err(WorkflowError::InvalidState {
                movement_id: request.id.clone(),
                status: request.status,
                operation: "decide",
            });
        };
        step.status = match decision {
            Decision::Approve => ValidationStatus::Approved,
            Decision::Reject => ValidationStatus::Rejected,
        };
        step.comment = comment.map(|text| text.trim().to_string()).filter(|text| !text.is_empty());
        step.validated_at = Some(now);

        next.status = status_from_chain(&next.validations);
        next.updated_at = now;

        let event = match decision {
            Decision::Approve => FlowEvent::StepApproved { order },
            Decision::Reject => FlowEvent::StepRejected { order },
        };

        let notifications = match next.actionable_validation() {
            Some(following) => vec![Notification::validation_request(
                following.validator_id.clone(),
                &next,
                now,
            )],
            None => vec![Notification::status_updated(next.requester_id.clone(), &next, now)],
        };

        Ok(TransitionOutcome {
            from: request.status,
            to: next.status,
            event,
            actor: validator_id.clone(),
            request: next,
            notifications,
        })
    }

    pub fn cancel(
        &self,
        request: &MovementRequest,
        by: &PersonnelId,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let open_validator = request.actionable_validation().map(|step| step.validator_id.clone());

        let mut next = request.clone();
        next.cancel(by, now)?;

        let notifications = open_validator
            .map(|validator_id| Notification::withdrawn(validator_id, &next, now))
            .into_iter()
            .collect();

        Ok(TransitionOutcome {
            from: request.status,
            to: next.status,
            event: FlowEvent::Cancelled,
            actor: by.clone(),
            request: next,
            notifications,
        })
    }

    /// Emits one audit event describing `result`, whichever way it went.
    pub fn audit<S>(
        &self,
        result: &Result<TransitionOutcome, WorkflowError>,
        operation: &'static str,
        sink: &S,
        context: &AuditContext,
    ) where
        S: AuditSink + ?Sized,
    {
        let category = match operation {
            "submit" => AuditCategory::Submission,
            "cancel" => AuditCategory::Cancellation,
            _ => AuditCategory::Decision,
        };

        let event = match result {
            Ok(outcome) => {
                AuditEvent::new(context, outcome.event.name(), category, AuditOutcome::Success)
                    .with_metadata("from", outcome.from.to_string())
                    .with_metadata("to", outcome.to.to_string())
                    .with_metadata("version", outcome.request.version.to_string())
            }
            Err(error) => AuditEvent::new(
                context,
                format!("movement.{operation}_refused"),
                category,
                AuditOutcome::Rejected,
            )
            .with_metadata("error_kind", error.kind().as_str())
            .with_metadata("error", error.to_string()),
        };
        sink.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use crate::audit::{AuditContext, AuditOutcome, InMemoryAuditSink};
    use crate::domain::movement::{
        MovementId, MovementRequest, MovementStatus, MovementType, NewMovement, Urgency,
        Validation, ValidationStatus, ValidatorRole,
    };
    use crate::domain::notification::NotificationKind;
    use crate::domain::personnel::PersonnelId;
    use crate::errors::WorkflowError;
    use crate::flows::states::{Decision, FlowEvent};

    use super::ApprovalEngine;

    fn pid(value: &str) -> PersonnelId {
        PersonnelId(value.to_string())
    }

    fn submitted(movement_type: MovementType, validators: &[(&str, ValidatorRole)]) -> MovementRequest {
        let now = Utc.with_ymd_and_hms(2024, 2, 28, 8, 0, 0).single().expect("timestamp");
        let draft = MovementRequest::create(
            MovementId("m-2".to_string()),
            NewMovement {
                requester_id: pid("p-4"),
                movement_type,
                title: "Mission Antananarivo".to_string(),
                description: "Séminaire technologies médicales".to_string(),
                start_date: NaiveDate::from_ymd_opt(2024, 4, 10).expect("date"),
                end_date: NaiveDate::from_ymd_opt(2024, 4, 12).expect("date"),
                destination: Some("Antananarivo".to_string()),
                urgency: Urgency::High,
                budget_estimate: None,
            },
            now,
        )
        .expect("draft");

        let chain = validators
            .iter()
            .zip(1u32..)
            .map(|((validator, role), order)| Validation::pending(pid(validator), *role, order))
            .collect();
        ApprovalEngine.submit(&draft, chain, now).expect("submit").request
    }

    fn two_step() -> MovementRequest {
        submitted(
            MovementType::Mission,
            &[("p-3", ValidatorRole::ServiceChief), ("p-2", ValidatorRole::Hr)],
        )
    }

    #[test]
    fn submit_notifies_the_first_validator() {
        let now = Utc::now();
        let draft = {
            let mut request = two_step();
            request.status = MovementStatus::Draft;
            request.validations.clear();
            request
        };
        let outcome = ApprovalEngine
            .submit(
                &draft,
                vec![Validation::pending(pid("p-3"), ValidatorRole::ServiceChief, 1)],
                now,
            )
            .expect("submit");

        assert_eq!(outcome.from, MovementStatus::Draft);
        assert_eq!(outcome.to, MovementStatus::Pending(1));
        assert_eq!(outcome.notifications.len(), 1);
        assert_eq!(outcome.notifications[0].recipient_id, pid("p-3"));
        assert_eq!(outcome.notifications[0].kind, NotificationKind::ValidationRequest);
    }

    #[test]
    fn approval_advances_to_the_next_order() {
        let request = two_step();
        let now = request.updated_at + Duration::hours(2);

        let outcome = ApprovalEngine
            .decide(&request, &pid("p-3"), Decision::Approve, Some(" ok ".to_string()), now)
            .expect("chief approves");

        assert_eq!(outcome.event, FlowEvent::StepApproved { order: 1 });
        assert_eq!(outcome.to, MovementStatus::Pending(2));
        assert_eq!(outcome.request.validations[0].comment.as_deref(), Some("ok"));
        assert_eq!(outcome.request.validations[0].validated_at, Some(now));
        assert_eq!(outcome.request.updated_at, now);
        assert_eq!(outcome.notifications[0].recipient_id, pid("p-2"));
        // input untouched
        assert_eq!(request.status, MovementStatus::Pending(1));
    }

    #[test]
    fn validator_cannot_preempt_a_later_step() {
        let request = two_step();

        let error = ApprovalEngine
            .decide(&request, &pid("p-2"), Decision::Approve, None, Utc::now())
            .expect_err("hr is not actionable yet");

        assert!(matches!(error, WorkflowError::Authorization { operation: "decide", .. }));
    }

    #[test]
    fn rejection_freezes_the_rest_of_the_chain() {
        let request = two_step();
        let rejected = ApprovalEngine
            .decide(&request, &pid("p-3"), Decision::Reject, Some("non".to_string()), Utc::now())
            .expect("chief rejects")
            .request;

        assert_eq!(rejected.status, MovementStatus::Rejected);
        assert_eq!(rejected.validations[1].status, ValidationStatus::Pending);
        assert!(rejected.validations[1].validated_at.is_none());

        for actor in ["p-2", "p-3", "p-4"] {
            let error = ApprovalEngine
                .decide(&rejected, &pid(actor), Decision::Approve, None, Utc::now())
                .expect_err("chain is frozen");
            assert!(matches!(error, WorkflowError::InvalidState { .. }));
        }
    }

    #[test]
    fn approving_the_last_step_is_terminal_and_notifies_requester() {
        let request = submitted(MovementType::Leave, &[("p-3", ValidatorRole::ServiceChief)]);

        let outcome = ApprovalEngine
            .decide(&request, &pid("p-3"), Decision::Approve, None, Utc::now())
            .expect("approve");

        assert_eq!(outcome.to, MovementStatus::Approved);
        assert_eq!(outcome.notifications[0].recipient_id, pid("p-4"));
        assert_eq!(outcome.notifications[0].kind, NotificationKind::StatusUpdated);

        let again = ApprovalEngine.decide(
            &outcome.request,
            &pid("p-3"),
            Decision::Approve,
            None,
            Utc::now(),
        );
        assert!(matches!(again, Err(WorkflowError::InvalidState { .. })));
    }

    #[test]
    fn drafts_cannot_be_decided() {
        let mut request = two_step();
        request.status = MovementStatus::Draft;
        request.validations.clear();

        let error = ApprovalEngine
            .decide(&request, &pid("p-3"), Decision::Approve, None, Utc::now())
            .expect_err("draft");
        assert!(matches!(error, WorkflowError::InvalidState { .. }));
    }

    #[test]
    fn cancel_notifies_the_waiting_validator() {
        let request = two_step();
        let outcome = ApprovalEngine.cancel(&request, &pid("p-4"), Utc::now()).expect("cancel");

        assert_eq!(outcome.to, MovementStatus::Cancelled);
        assert_eq!(outcome.notifications.len(), 1);
        assert_eq!(outcome.notifications[0].recipient_id, pid("p-3"));
    }

    #[test]
    fn cancelling_a_draft_notifies_nobody() {
        let mut request = two_step();
        request.status = MovementStatus::Draft;
        request.validations.clear();

        let outcome = ApprovalEngine.cancel(&request, &pid("p-4"), Utc::now()).expect("cancel");
        assert_eq!(outcome.from, MovementStatus::Draft);
        assert_eq!(outcome.to, MovementStatus::Cancelled);
        assert!(outcome.notifications.is_empty());
    }

    #[test]
    fn audit_records_refusals_with_error_kind() {
        let sink = InMemoryAuditSink::default();
        let request = two_step();
        let context = AuditContext::new(Some(request.id.clone()), "req-7", "p-9");

        let result = ApprovalEngine.decide(&request, &pid("p-9"), Decision::Approve, None, Utc::now());
        ApprovalEngine.audit(&result, "decide", &sink, &context);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "movement.decide_refused");
        assert_eq!(events[0].outcome, AuditOutcome::Rejected);
        assert_eq!(events[0].metadata.get("error_kind").map(String::as_str), Some("authorization"));
    }
}
