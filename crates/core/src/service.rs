use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::approvals::ValidationChainBuilder;
use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink};
use crate::config::WorkflowConfig;
use crate::domain::movement::{MovementId, MovementRequest, NewMovement};
use crate::domain::notification::{Notification, NotificationId};
use crate::domain::personnel::{Personnel, PersonnelId};
use crate::errors::{ValidationFailure, WorkflowError};
use crate::flows::{ApprovalEngine, Decision, TransitionOutcome};
use crate::ports::{MovementStore, NotificationOutbox, PersonnelDirectory};
use crate::queries::{self, MovementSummary};

/// A transition computed against a specific stored version, ready to be written.
struct Prepared {
    outcome: TransitionOutcome,
    expected_version: u32,
}

/// Entry point for every movement operation.
///
/// Each mutation reads the current record, computes the next state with [`ApprovalEngine`],
/// and writes it back with a single conditional put. Nothing is retried here; a lost race
/// surfaces as [`WorkflowError::ConcurrentModification`].
pub struct MovementService<D: ?Sized, S: ?Sized, N: ?Sized> {
    directory: Arc<D>,
    store: Arc<S>,
    outbox: Arc<N>,
    builder: ValidationChainBuilder,
    engine: ApprovalEngine,
    io_timeout: Duration,
    audit: Arc<dyn AuditSink>,
}

impl<D, S, N> MovementService<D, S, N>
where
    D: PersonnelDirectory + ?Sized,
    S: MovementStore + ?Sized,
    N: NotificationOutbox + ?Sized,
{
    pub fn new(directory: Arc<D>, store: Arc<S>, outbox: Arc<N>, workflow: &WorkflowConfig) -> Self {
        Self {
            directory,
            store,
            outbox,
            builder: ValidationChainBuilder::new(workflow.hr_service.clone()),
            engine: ApprovalEngine,
            io_timeout: workflow.io_timeout(),
            audit: Arc::new(TracingAuditSink),
        }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub async fn create_draft(&self, input: NewMovement) -> Result<MovementRequest, WorkflowError> {
        let context = self.context(None, &input.requester_id);
        let result = self.insert_draft(input).await;

        let event = match &result {
            Ok(request) => AuditEvent::new(
                &AuditContext { movement_id: Some(request.id.clone()), ..context.clone() },
                "movement.created",
                AuditCategory::Creation,
                AuditOutcome::Success,
            )
            .with_metadata("movement_type", request.movement_type.as_str()),
            Err(error) => AuditEvent::new(
                &context,
                "movement.create_refused",
                AuditCategory::Creation,
                AuditOutcome::Rejected,
            )
            .with_metadata("error_kind", error.kind().as_str())
            .with_metadata("error", error.to_string()),
        };
        self.audit.emit(event);

        result
    }

    /// Creates the draft and submits it straight away. If submission fails the draft stays
    /// stored so the requester can retry once the directory is fixed.
    pub async fn create_and_submit(
        &self,
        input: NewMovement,
    ) -> Result<MovementRequest, WorkflowError> {
        let requester_id = input.requester_id.clone();
        let draft = self.create_draft(input).await?;
        self.submit(&draft.id, &requester_id).await
    }

    pub async fn submit(
        &self,
        movement_id: &MovementId,
        actor: &PersonnelId,
    ) -> Result<MovementRequest, WorkflowError> {
        let context = self.context(Some(movement_id.clone()), actor);
        let prepared = self.prepare_submit(movement_id, actor).await;
        self.apply(&context, "submit", prepared).await
    }

    /// Records `validator_id`'s decision on whatever version is current.
    pub async fn decide(
        &self,
        movement_id: &MovementId,
        validator_id: &PersonnelId,
        decision: Decision,
        comment: Option<String>,
    ) -> Result<MovementRequest, WorkflowError> {
        let context = self.context(Some(movement_id.clone()), validator_id);
        let prepared = self.prepare_decide(movement_id, None, validator_id, decision, comment).await;
        self.apply(&context, "decide", prepared).await
    }

    /// Like [`Self::decide`], but refuses unless the stored version is still the one the caller
    /// looked at before deciding.
    pub async fn decide_at_version(
        &self,
        movement_id: &MovementId,
        expected_version: u32,
        validator_id: &PersonnelId,
        decision: Decision,
        comment: Option<String>,
    ) -> Result<MovementRequest, WorkflowError> {
        let context = self.context(Some(movement_id.clone()), validator_id);
        let prepared = self
            .prepare_decide(movement_id, Some(expected_version), validator_id, decision, comment)
            .await;
        self.apply(&context, "decide", prepared).await
    }

    pub async fn cancel(
        &self,
        movement_id: &MovementId,
        by: &PersonnelId,
    ) -> Result<MovementRequest, WorkflowError> {
        let context = self.context(Some(movement_id.clone()), by);
        let prepared = self.prepare_cancel(movement_id, by).await;
        self.apply(&context, "cancel", prepared).await
    }

    pub async fn get(&self, movement_id: &MovementId) -> Result<MovementRequest, WorkflowError> {
        self.load(movement_id).await
    }

    pub async fn list_by_requester(
        &self,
        requester_id: &PersonnelId,
    ) -> Result<Vec<MovementRequest>, WorkflowError> {
        let requests =
            self.within("store.query_by_requester", self.store.query_by_requester(requester_id)).await?;
        Ok(queries::list_by_requester(requests, requester_id))
    }

    pub async fn list_pending_for(
        &self,
        validator_id: &PersonnelId,
    ) -> Result<Vec<MovementRequest>, WorkflowError> {
        let requests = self.within("store.query_all", self.store.query_all()).await?;
        Ok(queries::list_pending_for(requests, validator_id))
    }

    /// Dashboard figures for one person: their own movements plus what waits on them.
    pub async fn summary_for(
        &self,
        personnel_id: &PersonnelId,
    ) -> Result<MovementSummary, WorkflowError> {
        let requests = self.within("store.query_all", self.store.query_all()).await?;
        let own: Vec<MovementRequest> = requests
            .iter()
            .filter(|request| &request.requester_id == personnel_id)
            .cloned()
            .collect();

        let mut summary = queries::summarize(&own);
        summary.awaiting_decision = queries::list_pending_for(requests, personnel_id).len();
        Ok(summary)
    }

    pub async fn notifications_for(
        &self,
        recipient_id: &PersonnelId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, WorkflowError> {
        self.within(
            "outbox.list_for_recipient",
            self.outbox.list_for_recipient(recipient_id, unread_only),
        )
        .await
    }

    pub async fn mark_notification_read(
        &self,
        notification_id: &NotificationId,
        recipient_id: &PersonnelId,
    ) -> Result<(), WorkflowError> {
        let updated = self
            .within("outbox.mark_read", self.outbox.mark_read(notification_id, recipient_id))
            .await?;
        if !updated {
            return Err(WorkflowError::NotFound {
                entity: "notification",
                id: notification_id.0.clone(),
            });
        }
        Ok(())
    }

    async fn insert_draft(&self, input: NewMovement) -> Result<MovementRequest, WorkflowError> {
        self.active_requester(&input.requester_id).await?;

        let mut request = MovementRequest::create(MovementId::generate(), input, Utc::now())?;
        request.version = 1;

        let inserted =
            self.within("store.put", self.store.put_if_version_matches(&request, 0)).await?;
        if !inserted {
            return Err(WorkflowError::ConcurrentModification {
                movement_id: request.id,
                expected_version: 0,
            });
        }

        tracing::info!(
            event_name = "movement.created",
            movement_id = %request.id,
            requester_id = %request.requester_id,
            movement_type = request.movement_type.as_str(),
            "movement draft stored"
        );
        Ok(request)
    }

    async fn prepare_submit(
        &self,
        movement_id: &MovementId,
        actor: &PersonnelId,
    ) -> Result<Prepared, WorkflowError> {
        let current = self.load(movement_id).await?;
        if &current.requester_id != actor {
            return Err(WorkflowError::Authorization {
                movement_id: current.id.clone(),
                actor: actor.clone(),
                operation: "submit",
                reason: "only the requester may submit a movement".to_string(),
            });
        }

        let requester = self.active_requester(&current.requester_id).await?;
        let chain = self
            .within(
                "directory.build_chain",
                self.builder.build(self.directory.as_ref(), &requester, current.movement_type),
            )
            .await?;

        let outcome = self.engine.submit(&current, chain, Utc::now())?;
        Ok(Prepared { outcome, expected_version: current.version })
    }

    async fn prepare_decide(
        &self,
        movement_id: &MovementId,
        expected_version: Option<u32>,
        validator_id: &PersonnelId,
        decision: Decision,
        comment: Option<String>,
    ) -> Result<Prepared, WorkflowError> {
        let current = self.load(movement_id).await?;
        if let Some(expected_version) = expected_version {
            if current.version != expected_version {
                return Err(WorkflowError::ConcurrentModification {
                    movement_id: current.id.clone(),
                    expected_version,
                });
            }
        }

        let outcome = self.engine.decide(&current, validator_id, decision, comment, Utc::now())?;
        Ok(Prepared { outcome, expected_version: current.version })
    }

    async fn prepare_cancel(
        &self,
        movement_id: &MovementId,
        by: &PersonnelId,
    ) -> Result<Prepared, WorkflowError> {
        let current = self.load(movement_id).await?;
        let outcome = self.engine.cancel(&current, by, Utc::now())?;
        Ok(Prepared { outcome, expected_version: current.version })
    }

    /// Writes a prepared transition, audits the result either way, then queues notifications.
    async fn apply(
        &self,
        context: &AuditContext,
        operation: &'static str,
        prepared: Result<Prepared, WorkflowError>,
    ) -> Result<MovementRequest, WorkflowError> {
        let committed = match prepared {
            Ok(prepared) => self.commit(prepared).await,
            Err(error) => Err(error),
        };
        self.engine.audit(&committed, operation, self.audit.as_ref(), context);

        let outcome = match committed {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::debug!(
                    event_name = "movement.transition_refused",
                    correlation_id = %context.correlation_id,
                    operation,
                    error_kind = error.kind().as_str(),
                    "{error}"
                );
                return Err(error);
            }
        };

        tracing::info!(
            event_name = outcome.event.name(),
            correlation_id = %context.correlation_id,
            movement_id = %outcome.request.id,
            actor = %outcome.actor,
            from = %outcome.from,
            to = %outcome.to,
            version = outcome.request.version,
            "movement transition committed"
        );

        self.deliver(&outcome.notifications, context).await;
        Ok(outcome.request)
    }

    async fn commit(&self, prepared: Prepared) -> Result<TransitionOutcome, WorkflowError> {
        let Prepared { mut outcome, expected_version } = prepared;
        outcome.request.version = expected_version + 1;

        let written = self
            .within("store.put", self.store.put_if_version_matches(&outcome.request, expected_version))
            .await?;
        if !written {
            return Err(WorkflowError::ConcurrentModification {
                movement_id: outcome.request.id.clone(),
                expected_version,
            });
        }
        Ok(outcome)
    }

    /// The transition is already committed at this point, so outbox failures are logged and
    /// swallowed rather than reported as a failed operation.
    async fn deliver(&self, notifications: &[Notification], context: &AuditContext) {
        for notification in notifications {
            let queued =
                self.within("outbox.enqueue", self.outbox.enqueue(notification.clone())).await;
            if let Err(error) = queued {
                tracing::warn!(
                    event_name = "notification.enqueue_failed",
                    correlation_id = %context.correlation_id,
                    movement_id = %notification.movement_id,
                    recipient_id = %notification.recipient_id,
                    error = %error,
                    "notification could not be queued"
                );
            }
        }
    }

    async fn load(&self, movement_id: &MovementId) -> Result<MovementRequest, WorkflowError> {
        self.within("store.get", self.store.get(movement_id))
            .await?
            .ok_or_else(|| WorkflowError::NotFound { entity: "movement", id: movement_id.0.clone() })
    }

    async fn active_requester(&self, requester_id: &PersonnelId) -> Result<Personnel, WorkflowError> {
        let person = self.within("directory.get_by_id", self.directory.get_by_id(requester_id)).await?;
        match person {
            Some(person) if person.active => Ok(person),
            _ => Err(WorkflowError::Validation(ValidationFailure::UnknownRequester {
                requester_id: requester_id.clone(),
            })),
        }
    }

    async fn within<T, E, F>(&self, operation: &'static str, future: F) -> Result<T, WorkflowError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<WorkflowError>,
    {
        match tokio::time::timeout(self.io_timeout, future).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(WorkflowError::Timeout {
                operation,
                timeout_ms: u64::try_from(self.io_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    fn context(&self, movement_id: Option<MovementId>, actor: &PersonnelId) -> AuditContext {
        AuditContext::new(movement_id, Uuid::new_v4().to_string(), actor.0.clone())
    }
}
