use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::movement::{MovementRequest, MovementType};
use crate::domain::personnel::PersonnelId;

/// A requester's own movements, newest first. Ties on `created_at` fall back to id descending
/// so the order is stable across stores.
pub fn list_by_requester(
    requests: Vec<MovementRequest>,
    requester_id: &PersonnelId,
) -> Vec<MovementRequest> {
    let mut mine: Vec<MovementRequest> =
        requests.into_iter().filter(|request| &request.requester_id == requester_id).collect();
    mine.sort_by(|left, right| {
        right.created_at.cmp(&left.created_at).then_with(|| right.id.cmp(&left.id))
    });
    mine
}

/// Movements whose open step belongs to `validator_id`, oldest first.
///
/// Goes through [`MovementRequest::is_awaiting`], the same rule `decide` checks, so everything
/// listed here can be decided by that validator and nothing else can.
pub fn list_pending_for(
    requests: Vec<MovementRequest>,
    validator_id: &PersonnelId,
) -> Vec<MovementRequest> {
    let mut waiting: Vec<MovementRequest> =
        requests.into_iter().filter(|request| request.is_awaiting(validator_id)).collect();
    waiting.sort_by(|left, right| {
        left.created_at.cmp(&right.created_at).then_with(|| left.id.cmp(&right.id))
    });
    waiting
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementSummary {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    /// Movements currently waiting on the person the summary was built for.
    pub awaiting_decision: usize,
    pub total_days: i64,
}

pub fn summarize(requests: &[MovementRequest]) -> MovementSummary {
    let mut summary = MovementSummary {
        by_status: ["draft", "pending", "approved", "rejected", "cancelled"]
            .into_iter()
            .map(|status| (status.to_string(), 0))
            .collect(),
        by_type: MovementType::ALL
            .into_iter()
            .map(|movement_type| (movement_type.as_str().to_string(), 0))
            .collect(),
        ..MovementSummary::default()
    };

    for request in requests {
        summary.total += 1;
        *summary.by_status.entry(request.status.as_str().to_string()).or_default() += 1;
        *summary.by_type.entry(request.movement_type.as_str().to_string()).or_default() += 1;
        summary.total_days += request.duration_days();
    }

    summary
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use proptest::prelude::*;

    use crate::domain::movement::{
        MovementId, MovementRequest, MovementStatus, MovementType, NewMovement, Urgency,
        Validation, ValidationStatus, ValidatorRole,
    };
    use crate::domain::personnel::PersonnelId;
    use crate::flows::{ApprovalEngine, Decision};

    use super::{list_by_requester, list_pending_for, summarize};

    fn pid(value: &str) -> PersonnelId {
        PersonnelId(value.to_string())
    }

    fn request(id: &str, requester: &str, minutes: i64) -> MovementRequest {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).single().expect("timestamp")
            + Duration::minutes(minutes);
        let day = NaiveDate::from_ymd_opt(2024, 2, 5).expect("date");
        MovementRequest::create(
            MovementId(id.to_string()),
            NewMovement {
                requester_id: pid(requester),
                movement_type: MovementType::Leave,
                title: format!("Demande {id}"),
                description: "Congé".to_string(),
                start_date: day,
                end_date: day + Duration::days(2),
                destination: None,
                urgency: Urgency::Medium,
                budget_estimate: None,
            },
            created_at,
        )
        .expect("draft")
    }

    fn pending_with(mut draft: MovementRequest, validators: &[&str]) -> MovementRequest {
        let chain = validators
            .iter()
            .zip(1u32..)
            .map(|(validator, order)| {
                Validation::pending(pid(validator), ValidatorRole::ServiceChief, order)
            })
            .collect();
        let now = draft.created_at;
        draft.submit(chain, now).expect("submit");
        draft
    }

    #[test]
    fn requester_list_is_newest_first_with_id_tiebreak() {
        let requests = vec![
            request("m-a", "p-4", 0),
            request("m-b", "p-4", 10),
            request("m-c", "p-4", 10),
            request("m-d", "p-5", 20),
        ];

        let ids: Vec<String> =
            list_by_requester(requests, &pid("p-4")).into_iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec!["m-c", "m-b", "m-a"]);
    }

    #[test]
    fn pending_list_only_contains_open_steps_oldest_first() {
        let first = pending_with(request("m-1", "p-4", 30), &["p-3", "p-2"]);
        let second = pending_with(request("m-2", "p-5", 5), &["p-3"]);
        let mut advanced = pending_with(request("m-3", "p-6", 1), &["p-3", "p-2"]);
        advanced.validations[0].status = ValidationStatus::Approved;
        advanced.status = MovementStatus::Pending(2);
        let draft = request("m-4", "p-7", 0);

        let requests = vec![first, second, advanced, draft];
        let for_chief: Vec<String> =
            list_pending_for(requests.clone(), &pid("p-3")).into_iter().map(|r| r.id.0).collect();
        let for_hr: Vec<String> =
            list_pending_for(requests, &pid("p-2")).into_iter().map(|r| r.id.0).collect();

        assert_eq!(for_chief, vec!["m-2", "m-1"]);
        assert_eq!(for_hr, vec!["m-3"]);
    }

    #[test]
    fn summary_counts_every_status_and_type() {
        let draft = request("m-1", "p-4", 0);
        let pending = pending_with(request("m-2", "p-4", 1), &["p-3"]);
        let mut cancelled = pending_with(request("m-3", "p-4", 2), &["p-3"]);
        cancelled.cancel(&pid("p-4"), Utc::now()).expect("cancel");

        let summary = summarize(&[draft, pending, cancelled]);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_status.get("draft"), Some(&1));
        assert_eq!(summary.by_status.get("pending"), Some(&1));
        assert_eq!(summary.by_status.get("cancelled"), Some(&1));
        assert_eq!(summary.by_status.get("approved"), Some(&0));
        assert_eq!(summary.by_type.get("leave"), Some(&3));
        assert_eq!(summary.by_type.get("mission"), Some(&0));
        assert_eq!(summary.total_days, 9);
    }

    #[derive(Clone, Copy, Debug)]
    enum Step {
        Approve,
        Reject,
        Cancel,
    }

    fn arb_step() -> impl Strategy<Value = Step> {
        prop_oneof![Just(Step::Approve), Just(Step::Approve), Just(Step::Reject), Just(Step::Cancel)]
    }

    fn arb_request() -> impl Strategy<Value = (usize, Vec<Step>)> {
        (1usize..=3, prop::collection::vec(arb_step(), 0..4))
    }

    proptest! {
        /// Whatever history a request has been through, a validator sees it in their pending
        /// list exactly when `decide` would accept their decision.
        #[test]
        fn pending_list_agrees_with_decide(
            histories in prop::collection::vec(arb_request(), 1..6),
            candidate_index in 0usize..5,
        ) {
            let validators = ["p-1", "p-2", "p-3"];
            let engine = ApprovalEngine;
            let mut requests = Vec::new();

            for (index, (chain_len, steps)) in histories.into_iter().enumerate() {
                let mut current = pending_with(
                    request(&format!("m-{index}"), "p-9", index as i64),
                    &validators[..chain_len],
                );
                for step in steps {
                    let now = current.updated_at + Duration::minutes(1);
                    let next = match (step, current.actionable_validation()) {
                        (Step::Cancel, _) => engine.cancel(&current, &pid("p-9"), now),
                        (_, None) => continue,
                        (Step::Approve, Some(open)) => {
                            let validator = open.validator_id.clone();
                            engine.decide(&current, &validator, Decision::Approve, None, now)
                        }
                        (Step::Reject, Some(open)) => {
                            let validator = open.validator_id.clone();
                            engine.decide(&current, &validator, Decision::Reject, None, now)
                        }
                    };
                    if let Ok(outcome) = next {
                        current = outcome.request;
                    }
                }
                requests.push(current);
            }

            let candidate = validators.get(candidate_index).map(|id| pid(id)).unwrap_or_else(|| pid("p-9"));
            let listed: Vec<MovementId> = list_pending_for(requests.clone(), &candidate)
                .into_iter()
                .map(|request| request.id)
                .collect();

            for request in &requests {
                let accepted = engine
                    .decide(request, &candidate, Decision::Approve, None, Utc::now())
                    .is_ok();
                prop_assert_eq!(listed.contains(&request.id), accepted);
            }
        }
    }
}
