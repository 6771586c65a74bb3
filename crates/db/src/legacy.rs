//! Reads movement and staff documents written by the earlier French-language tooling and
//! turns them into the canonical model. Nothing outside this module sees the legacy shape.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use staffmove_core::domain::movement::{
    MovementId, MovementRequest, MovementStatus, MovementType, NewMovement, Urgency, Validation,
    ValidationStatus, ValidatorRole,
};
use staffmove_core::domain::personnel::{Personnel, PersonnelId, PersonnelRole};
use staffmove_core::errors::WorkflowError;
use staffmove_core::ports::{MovementStore, StoreError};

/// Legacy movements never recorded a destination.
pub const UNKNOWN_DESTINATION: &str = "non renseignée";

#[derive(Debug, Error)]
pub enum LegacyMappingError {
    #[error("unknown value `{value}` for legacy field `{field}`")]
    UnknownValue { field: &'static str, value: String },
    #[error("invalid date `{value}` in legacy field `{field}`")]
    InvalidDate { field: &'static str, value: String },
    #[error("no validator recorded for `{step}` and no fallback configured")]
    MissingValidator { step: &'static str },
    #[error("legacy chain is not sequential: {0}")]
    InvalidChain(String),
    #[error("legacy status `{statut}` contradicts its validations (they imply `{derived}`)")]
    InconsistentStatus { statut: String, derived: String },
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct LegacyExport {
    #[serde(default)]
    pub personnel: Vec<LegacyPersonnel>,
    #[serde(default)]
    pub movements: Vec<LegacyMovement>,
}

impl LegacyExport {
    /// Accepts either the full export object or a bare array of movements.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        match serde_json::from_str::<Vec<LegacyMovement>>(raw) {
            Ok(movements) => Ok(Self { personnel: Vec::new(), movements }),
            Err(_) => serde_json::from_str(raw),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LegacyPersonnel {
    pub id: String,
    pub nom: String,
    #[serde(default)]
    pub prenoms: String,
    pub service: String,
    #[serde(default = "default_active")]
    pub actif: bool,
    #[serde(default)]
    pub role: Option<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LegacyStep {
    #[serde(default)]
    pub valide_par: Option<String>,
    #[serde(default)]
    pub date_validation: Option<String>,
    #[serde(default)]
    pub commentaire: Option<String>,
    pub statut: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LegacyMovement {
    #[serde(default)]
    pub id: Option<String>,
    pub personnel_id: String,
    #[serde(rename = "type")]
    pub movement_type: String,
    pub date_debut: String,
    pub date_fin: String,
    pub motif: String,
    #[serde(default)]
    pub justification: String,
    pub statut: String,
    #[serde(default)]
    pub date_demande: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub validation_hierarchie: Option<LegacyStep>,
    #[serde(default)]
    pub validation_rh: Option<LegacyStep>,
}

/// Who to put on a step when the legacy document left `valide_par` empty, which it always
/// does for steps nobody has decided yet.
#[derive(Clone, Debug, Default)]
pub struct LegacyValidators {
    pub service_chief: Option<PersonnelId>,
    pub hr: Option<PersonnelId>,
}

pub fn map_movement_type(value: &str) -> Result<MovementType, LegacyMappingError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "conge" => Ok(MovementType::Leave),
        "mission" => Ok(MovementType::Mission),
        "formation" => Ok(MovementType::Training),
        "repos_maladie" | "convalescence" | "hospitalise" => Ok(MovementType::SickLeave),
        "permission_absence" | "autorisation_absence" => Ok(MovementType::Other),
        other => MovementType::parse(other)
            .ok_or_else(|| LegacyMappingError::UnknownValue { field: "type", value: value.to_string() }),
    }
}

pub fn map_personnel(legacy: LegacyPersonnel) -> Result<Personnel, LegacyMappingError> {
    let role = match legacy.role.as_deref().map(str::trim) {
        None | Some("") | Some("personnel") => PersonnelRole::Employee,
        Some("chef_service") => PersonnelRole::ServiceChief,
        Some("rh") => PersonnelRole::Hr,
        Some("admin") => PersonnelRole::Admin,
        Some(other) => {
            return Err(LegacyMappingError::UnknownValue { field: "role", value: other.to_string() })
        }
    };
    let name = format!("{} {}", legacy.prenoms.trim(), legacy.nom.trim()).trim().to_string();

    Ok(Personnel {
        id: PersonnelId(legacy.id),
        name,
        role,
        service: legacy.service.trim().to_string(),
        active: legacy.actif,
    })
}

/// Maps one legacy movement. The result has version 0 and is ready for an insert.
pub fn map_movement(
    legacy: LegacyMovement,
    validators: &LegacyValidators,
    now: DateTime<Utc>,
) -> Result<MovementRequest, LegacyMappingError> {
    let movement_type = map_movement_type(&legacy.movement_type)?;
    let created_at = match legacy.date_demande.as_deref() {
        Some(value) => parse_instant("date_demande", value)?,
        None => now,
    };
    let description = if legacy.justification.trim().is_empty() {
        legacy.motif.clone()
    } else {
        legacy.justification.clone()
    };
    let destination = legacy.destination.clone().or_else(|| {
        movement_type.requires_destination().then(|| UNKNOWN_DESTINATION.to_string())
    });

    let mut request = MovementRequest::create(
        legacy.id.clone().map(MovementId).unwrap_or_else(MovementId::generate),
        NewMovement {
            requester_id: PersonnelId(legacy.personnel_id.clone()),
            movement_type,
            title: legacy.motif.clone(),
            description,
            start_date: parse_day("date_debut", &legacy.date_debut)?,
            end_date: parse_day("date_fin", &legacy.date_fin)?,
            destination,
            urgency: Urgency::Medium,
            budget_estimate: None,
        },
        created_at,
    )?;

    let statut = legacy.statut.trim().to_ascii_lowercase();
    if statut == "brouillon" {
        return Ok(request);
    }

    let chain = map_chain(&legacy, movement_type, validators, created_at)?;
    let latest = chain.iter().filter_map(|step| step.validated_at).max();

    request.validations = chain;
    request.status = MovementStatus::Pending(1);
    request.status = request.derived_status();
    request.updated_at = latest.unwrap_or(created_at);

    let consistent = match statut.as_str() {
        "soumise" | "en_cours" => matches!(request.status, MovementStatus::Pending(_)),
        "approuvee" => request.status == MovementStatus::Approved,
        "rejetee" => request.status == MovementStatus::Rejected,
        _ => {
            return Err(LegacyMappingError::UnknownValue { field: "statut", value: legacy.statut })
        }
    };
    if !consistent {
        return Err(LegacyMappingError::InconsistentStatus {
            statut: legacy.statut,
            derived: request.status.to_string(),
        });
    }

    Ok(request)
}

fn map_chain(
    legacy: &LegacyMovement,
    movement_type: MovementType,
    validators: &LegacyValidators,
    created_at: DateTime<Utc>,
) -> Result<Vec<Validation>, LegacyMappingError> {
    let pending = LegacyStep {
        valide_par: None,
        date_validation: None,
        commentaire: None,
        statut: "en_attente".to_string(),
    };

    let hierarchy = legacy.validation_hierarchie.clone().unwrap_or_else(|| pending.clone());
    let mut steps = vec![(
        "validation_hierarchie",
        ValidatorRole::ServiceChief,
        hierarchy,
        validators.service_chief.as_ref(),
    )];

    // The old forms always carried an HR block; keep it when the type needs HR or when
    // somebody actually decided on it.
    let hr = legacy.validation_rh.clone();
    let hr_decided =
        hr.as_ref().is_some_and(|step| step.statut.trim().to_ascii_lowercase() != "en_attente");
    if movement_type.requires_destination() || hr_decided {
        steps.push((
            "validation_rh",
            ValidatorRole::Hr,
            hr.unwrap_or(pending),
            validators.hr.as_ref(),
        ));
    }

    let mut chain = Vec::with_capacity(steps.len());
    let mut open = false;
    for ((field, role, step, fallback), order) in steps.into_iter().zip(1u32..) {
        let status = match step.statut.trim().to_ascii_lowercase().as_str() {
            "en_attente" => ValidationStatus::Pending,
            "approuve" => ValidationStatus::Approved,
            "rejete" => ValidationStatus::Rejected,
            _ => return Err(LegacyMappingError::UnknownValue { field, value: step.statut }),
        };
        if open && status != ValidationStatus::Pending {
            return Err(LegacyMappingError::InvalidChain(format!(
                "`{field}` was decided after an earlier step stayed open or was rejected"
            )));
        }
        open |= status != ValidationStatus::Approved;

        let validator_id = step
            .valide_par
            .filter(|value| !value.trim().is_empty())
            .map(PersonnelId)
            .or_else(|| fallback.cloned())
            .ok_or(LegacyMappingError::MissingValidator { step: field })?;
        if validator_id == PersonnelId(legacy.personnel_id.clone()) {
            return Err(LegacyMappingError::InvalidChain(format!(
                "`{field}` is assigned to the requester"
            )));
        }

        let validated_at = match (status, step.date_validation.as_deref()) {
            (ValidationStatus::Pending, _) => None,
            (_, Some(value)) => Some(parse_instant("date_validation", value)?),
            (_, None) => Some(created_at),
        };

        let mut validation = Validation::pending(validator_id, role, order);
        validation.status = status;
        validation.comment =
            step.commentaire.map(|text| text.trim().to_string()).filter(|text| !text.is_empty());
        validation.validated_at = validated_at;
        chain.push(validation);
    }

    Ok(chain)
}

fn parse_day(field: &'static str, value: &str) -> Result<NaiveDate, LegacyMappingError> {
    let trimmed = value.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| LegacyMappingError::InvalidDate { field, value: value.to_string() })
}

fn parse_instant(field: &'static str, value: &str) -> Result<DateTime<Utc>, LegacyMappingError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value.trim()) {
        return Ok(instant.with_timezone(&Utc));
    }
    parse_day(field, value)?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or(LegacyMappingError::InvalidDate { field, value: value.to_string() })
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: Vec<String>,
    pub skipped_existing: Vec<String>,
    pub rejected: Vec<ImportRejection>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImportRejection {
    pub index: usize,
    pub reason: String,
}

/// Maps and inserts every movement. Documents that fail to map are reported, not fatal;
/// ids already present in the store are left alone.
pub async fn import_movements<S>(
    store: &S,
    movements: Vec<LegacyMovement>,
    validators: &LegacyValidators,
    now: DateTime<Utc>,
) -> Result<ImportReport, StoreError>
where
    S: MovementStore + ?Sized,
{
    let mut report = ImportReport::default();

    for (index, legacy) in movements.into_iter().enumerate() {
        let mut request = match map_movement(legacy, validators, now) {
            Ok(request) => request,
            Err(error) => {
                tracing::warn!(
                    event_name = "legacy.movement_rejected",
                    index,
                    error = %error,
                    "legacy movement could not be mapped"
                );
                report.rejected.push(ImportRejection { index, reason: error.to_string() });
                continue;
            }
        };

        request.version = 1;
        if store.put_if_version_matches(&request, 0).await? {
            report.imported.push(request.id.0);
        } else {
            report.skipped_existing.push(request.id.0);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use staffmove_core::domain::movement::{
        MovementStatus, MovementType, ValidationStatus, ValidatorRole,
    };
    use staffmove_core::domain::personnel::{PersonnelId, PersonnelRole};
    use staffmove_core::ports::{InMemoryMovementStore, MovementStore};

    use super::{
        import_movements, map_movement, map_personnel, LegacyMappingError, LegacyMovement,
        LegacyPersonnel, LegacyValidators, UNKNOWN_DESTINATION,
    };

    fn validators() -> LegacyValidators {
        LegacyValidators {
            service_chief: Some(PersonnelId("p-3".to_string())),
            hr: Some(PersonnelId("p-2".to_string())),
        }
    }

    fn parse(json: &str) -> LegacyMovement {
        serde_json::from_str(json).expect("legacy document")
    }

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("timestamp")
    }

    #[test]
    fn approved_leave_maps_to_a_single_approved_step() {
        let legacy = parse(
            r#"{
                "id": "mv-12",
                "personnel_id": "p-4",
                "type": "conge",
                "date_debut": "2024-01-15",
                "date_fin": "2024-01-29",
                "motif": "Congé annuel",
                "justification": "Congé annuel planifié",
                "statut": "approuvee",
                "date_demande": "2024-01-05T08:00:00Z",
                "validation_hierarchie": {
                    "valide_par": "p-3",
                    "date_validation": "2024-01-06T09:30:00Z",
                    "commentaire": "Bon congé",
                    "statut": "approuve"
                },
                "validation_rh": { "statut": "en_attente" }
            }"#,
        );

        let request = map_movement(legacy, &validators(), now()).expect("maps");

        assert_eq!(request.id.0, "mv-12");
        assert_eq!(request.movement_type, MovementType::Leave);
        assert_eq!(request.status, MovementStatus::Approved);
        assert_eq!(request.validations.len(), 1);
        assert_eq!(request.validations[0].comment.as_deref(), Some("Bon congé"));
        assert_eq!(request.version, 0);
        assert_eq!(
            request.updated_at,
            Utc.with_ymd_and_hms(2024, 1, 6, 9, 30, 0).single().expect("timestamp")
        );
    }

    #[test]
    fn submitted_mission_gets_fallback_validators_and_placeholder_destination() {
        let legacy = parse(
            r#"{
                "personnel_id": "p-4",
                "type": "mission",
                "date_debut": "2024-02-10",
                "date_fin": "2024-02-12",
                "motif": "Mission Antananarivo",
                "justification": "",
                "statut": "soumise",
                "validation_hierarchie": { "statut": "en_attente" },
                "validation_rh": { "statut": "en_attente" }
            }"#,
        );

        let request = map_movement(legacy, &validators(), now()).expect("maps");

        assert_eq!(request.status, MovementStatus::Pending(1));
        assert_eq!(request.description, "Mission Antananarivo");
        assert_eq!(request.destination.as_deref(), Some(UNKNOWN_DESTINATION));
        let roles: Vec<ValidatorRole> =
            request.validations.iter().map(|step| step.validator_role).collect();
        assert_eq!(roles, vec![ValidatorRole::ServiceChief, ValidatorRole::Hr]);
        assert_eq!(request.validations[1].validator_id, PersonnelId("p-2".to_string()));
        assert_eq!(request.created_at, now());
    }

    #[test]
    fn rejected_by_hr_keeps_the_chief_approval() {
        let legacy = parse(
            r#"{
                "personnel_id": "p-4",
                "type": "formation",
                "date_debut": "2024-03-01",
                "date_fin": "2024-03-05",
                "motif": "Formation",
                "justification": "Certification",
                "statut": "rejetee",
                "validation_hierarchie": { "valide_par": "p-3", "statut": "approuve" },
                "validation_rh": {
                    "valide_par": "p-2",
                    "statut": "rejete",
                    "commentaire": "budget insuffisant"
                }
            }"#,
        );

        let request = map_movement(legacy, &LegacyValidators::default(), now()).expect("maps");

        assert_eq!(request.status, MovementStatus::Rejected);
        assert_eq!(request.validations[0].status, ValidationStatus::Approved);
        assert_eq!(request.validations[1].status, ValidationStatus::Rejected);
        assert_eq!(request.validations[1].validated_at, Some(request.created_at));
    }

    #[test]
    fn contradictory_documents_are_refused() {
        let approved_but_open = parse(
            r#"{
                "personnel_id": "p-4", "type": "conge",
                "date_debut": "2024-01-15", "date_fin": "2024-01-16",
                "motif": "Congé", "statut": "approuvee",
                "validation_hierarchie": { "statut": "en_attente" }
            }"#,
        );
        assert!(matches!(
            map_movement(approved_but_open, &validators(), now()),
            Err(LegacyMappingError::InconsistentStatus { .. })
        ));

        let hr_before_chief = parse(
            r#"{
                "personnel_id": "p-4", "type": "mission",
                "date_debut": "2024-01-15", "date_fin": "2024-01-16",
                "motif": "Mission", "statut": "en_cours",
                "validation_hierarchie": { "statut": "en_attente" },
                "validation_rh": { "valide_par": "p-2", "statut": "approuve" }
            }"#,
        );
        assert!(matches!(
            map_movement(hr_before_chief, &validators(), now()),
            Err(LegacyMappingError::InvalidChain(_))
        ));

        let unknown_type = parse(
            r#"{
                "personnel_id": "p-4", "type": "teletravail",
                "date_debut": "2024-01-15", "date_fin": "2024-01-16",
                "motif": "x", "statut": "brouillon"
            }"#,
        );
        assert!(matches!(
            map_movement(unknown_type, &validators(), now()),
            Err(LegacyMappingError::UnknownValue { field: "type", .. })
        ));
    }

    #[test]
    fn pending_step_without_any_validator_is_reported() {
        let legacy = parse(
            r#"{
                "personnel_id": "p-4", "type": "conge",
                "date_debut": "2024-01-15", "date_fin": "2024-01-16",
                "motif": "Congé", "statut": "soumise"
            }"#,
        );

        assert!(matches!(
            map_movement(legacy, &LegacyValidators::default(), now()),
            Err(LegacyMappingError::MissingValidator { step: "validation_hierarchie" })
        ));
    }

    #[test]
    fn personnel_roles_are_translated() {
        let person = map_personnel(LegacyPersonnel {
            id: "p-3".to_string(),
            nom: "RAKOTO".to_string(),
            prenoms: "Jean".to_string(),
            service: " Service Médical ".to_string(),
            actif: true,
            role: Some("chef_service".to_string()),
        })
        .expect("maps");

        assert_eq!(person.role, PersonnelRole::ServiceChief);
        assert_eq!(person.name, "Jean RAKOTO");
        assert_eq!(person.service, "Service Médical");
    }

    #[tokio::test]
    async fn import_reports_each_document() {
        let store = InMemoryMovementStore::default();
        let good = parse(
            r#"{
                "id": "mv-1", "personnel_id": "p-4", "type": "conge",
                "date_debut": "2024-01-15", "date_fin": "2024-01-16",
                "motif": "Congé", "statut": "brouillon"
            }"#,
        );
        let bad = parse(
            r#"{
                "id": "mv-2", "personnel_id": "p-4", "type": "conge",
                "date_debut": "2024-01-20", "date_fin": "2024-01-16",
                "motif": "Congé", "statut": "brouillon"
            }"#,
        );

        let report = import_movements(&store, vec![good.clone(), bad, good], &validators(), now())
            .await
            .expect("import");

        assert_eq!(report.imported, vec!["mv-1".to_string()]);
        assert_eq!(report.skipped_existing, vec!["mv-1".to_string()]);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].index, 1);

        let stored = store.query_all().await.expect("query");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, MovementStatus::Draft);
        assert_eq!(stored[0].version, 1);
    }
}
