use std::str::FromStr;

use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;

use staffmove_core::{
    Decision, MovementId, MovementRequest, MovementType, NewMovement, PersonnelId, Urgency,
    ValidationFailure, WorkflowError,
};

use super::{execute, CommandResult};

#[derive(Debug, Clone, Args)]
pub struct CreateArgs {
    #[arg(long, help = "Personnel id of the requester")]
    pub requester: String,
    #[arg(
        long = "type",
        help = "leave, sick_leave, maternity_leave, mission, training, transfer, delegation, other"
    )]
    pub movement_type: String,
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: String,
    #[arg(long, help = "First day, YYYY-MM-DD")]
    pub start: String,
    #[arg(long, help = "Last day, YYYY-MM-DD")]
    pub end: String,
    #[arg(long)]
    pub destination: Option<String>,
    #[arg(long, default_value = "medium")]
    pub urgency: String,
    #[arg(long, help = "Estimated cost, decimal")]
    pub budget: Option<String>,
    #[arg(long, help = "Submit immediately instead of leaving a draft")]
    pub submit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecisionArg {
    Approve,
    Reject,
}

impl From<DecisionArg> for Decision {
    fn from(value: DecisionArg) -> Self {
        match value {
            DecisionArg::Approve => Decision::Approve,
            DecisionArg::Reject => Decision::Reject,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct DecideArgs {
    pub movement_id: String,
    #[arg(long, help = "Personnel id of the deciding validator")]
    pub validator: String,
    #[arg(long, value_enum)]
    pub decision: DecisionArg,
    #[arg(long)]
    pub comment: Option<String>,
    #[arg(long, help = "Refuse unless the movement is still at this version")]
    pub expected_version: Option<u32>,
}

pub fn create(args: CreateArgs) -> CommandResult {
    let command = "create";
    let input = match parse_new_movement(&args) {
        Ok(input) => input,
        Err(failure) => {
            return CommandResult::workflow_failure(command, &WorkflowError::Validation(failure))
        }
    };

    execute(command, |service| async move {
        let request = if args.submit {
            service.create_and_submit(input).await?
        } else {
            service.create_draft(input).await?
        };
        Ok::<_, WorkflowError>((status_line(&request), request))
    })
}

pub fn submit(movement_id: String, actor: String) -> CommandResult {
    execute("submit", |service| async move {
        let request = service.submit(&MovementId(movement_id), &PersonnelId(actor)).await?;
        Ok::<_, WorkflowError>((status_line(&request), request))
    })
}

pub fn decide(args: DecideArgs) -> CommandResult {
    execute("decide", |service| async move {
        let movement_id = MovementId(args.movement_id);
        let validator = PersonnelId(args.validator);
        let decision = Decision::from(args.decision);

        let request = match args.expected_version {
            Some(version) => {
                service
                    .decide_at_version(&movement_id, version, &validator, decision, args.comment)
                    .await?
            }
            None => service.decide(&movement_id, &validator, decision, args.comment).await?,
        };
        Ok::<_, WorkflowError>((status_line(&request), request))
    })
}

pub fn cancel(movement_id: String, actor: String) -> CommandResult {
    execute("cancel", |service| async move {
        let request = service.cancel(&MovementId(movement_id), &PersonnelId(actor)).await?;
        Ok::<_, WorkflowError>((status_line(&request), request))
    })
}

pub fn show(movement_id: String) -> CommandResult {
    execute("show", |service| async move {
        let request = service.get(&MovementId(movement_id)).await?;
        let message = format!("movement {} (version {})", request.id, request.version);
        Ok::<_, WorkflowError>((message, request))
    })
}

pub fn mine(requester: String) -> CommandResult {
    execute("mine", |service| async move {
        let requests = service.list_by_requester(&PersonnelId(requester)).await?;
        Ok::<_, WorkflowError>((format!("{} movement(s)", requests.len()), requests))
    })
}

pub fn pending(validator: String) -> CommandResult {
    execute("pending", |service| async move {
        let requests = service.list_pending_for(&PersonnelId(validator)).await?;
        let message = format!("{} movement(s) awaiting a decision", requests.len());
        Ok::<_, WorkflowError>((message, requests))
    })
}

pub fn stats(personnel: String) -> CommandResult {
    execute("stats", |service| async move {
        let summary = service.summary_for(&PersonnelId(personnel)).await?;
        let message = format!(
            "{} movement(s), {} awaiting decision",
            summary.total, summary.awaiting_decision
        );
        Ok::<_, WorkflowError>((message, summary))
    })
}

fn status_line(request: &MovementRequest) -> String {
    format!("movement {} is {}", request.id, request.status)
}

fn parse_new_movement(args: &CreateArgs) -> Result<NewMovement, ValidationFailure> {
    let movement_type = MovementType::parse(&args.movement_type)
        .ok_or_else(|| invalid("type", &args.movement_type))?;
    let urgency = Urgency::parse(&args.urgency).ok_or_else(|| invalid("urgency", &args.urgency))?;
    let budget_estimate = args
        .budget
        .as_deref()
        .map(|raw| Decimal::from_str(raw.trim()).map_err(|_| invalid("budget", raw)))
        .transpose()?;

    Ok(NewMovement {
        requester_id: PersonnelId(args.requester.clone()),
        movement_type,
        title: args.title.clone(),
        description: args.description.clone(),
        start_date: parse_day("start", &args.start)?,
        end_date: parse_day("end", &args.end)?,
        destination: args.destination.clone(),
        urgency,
        budget_estimate,
    })
}

fn parse_day(field: &str, value: &str) -> Result<NaiveDate, ValidationFailure> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| invalid(field, value))
}

fn invalid(field: &str, value: &str) -> ValidationFailure {
    ValidationFailure::InvalidValue { field: field.to_string(), value: value.to_string() }
}

#[cfg(test)]
mod tests {
    use staffmove_core::{MovementType, ValidationFailure};

    use super::{parse_new_movement, CreateArgs};

    fn args() -> CreateArgs {
        CreateArgs {
            requester: "p-4".to_string(),
            movement_type: "mission".to_string(),
            title: "Mission".to_string(),
            description: "Audit".to_string(),
            start: "2024-02-10".to_string(),
            end: "2024-02-12".to_string(),
            destination: Some("Toliara".to_string()),
            urgency: "HIGH".to_string(),
            budget: Some("150000.50".to_string()),
            submit: false,
        }
    }

    #[test]
    fn parses_well_formed_arguments() {
        let input = parse_new_movement(&args()).expect("parses");
        assert_eq!(input.movement_type, MovementType::Mission);
        let budget = input.budget_estimate.map(|value| value.to_string());
        assert_eq!(budget.as_deref(), Some("150000.50"));
    }

    #[test]
    fn malformed_values_name_the_field() {
        let mut bad_date = args();
        bad_date.end = "12/02/2024".to_string();
        assert_eq!(
            parse_new_movement(&bad_date).expect_err("bad date"),
            ValidationFailure::InvalidValue {
                field: "end".to_string(),
                value: "12/02/2024".to_string()
            }
        );

        let mut bad_type = args();
        bad_type.movement_type = "vacances".to_string();
        assert!(matches!(
            parse_new_movement(&bad_type),
            Err(ValidationFailure::InvalidValue { field, .. }) if field == "type"
        ));
    }
}
