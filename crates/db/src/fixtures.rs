use chrono::{NaiveDate, TimeZone, Utc};

use staffmove_core::domain::movement::{
    MovementId, MovementRequest, MovementType, NewMovement, Urgency, Validation, ValidatorRole,
};
use staffmove_core::domain::personnel::{Personnel, PersonnelId, PersonnelRole};

use crate::connection::DbPool;
use crate::repositories::{RepositoryError, SqlMovementStore, SqlPersonnelDirectory};

const SEED_PERSONNEL: &[SeedPerson] = &[
    SeedPerson { id: "p-1", name: "Hanta Andriamanana", role: "admin", service: "Direction" },
    SeedPerson { id: "p-2", name: "Lova Rasoanaivo", role: "hr", service: "Ressources Humaines" },
    SeedPerson { id: "p-3", name: "Jean Rakoto", role: "service_chief", service: "Service Médical" },
    SeedPerson { id: "p-4", name: "Mialy Randria", role: "employee", service: "Service Médical" },
    SeedPerson { id: "p-5", name: "Tiana Rabe", role: "employee", service: "Pharmacie" },
    SeedPerson { id: "p-6", name: "Fara Ravelo", role: "service_chief", service: "Pharmacie" },
];

const SEED_MOVEMENT_IDS: &[&str] = &["mv-demo-draft", "mv-demo-mission"];

/// Deterministic staff directory plus two movements: a draft leave and a mission waiting on
/// its service chief.
pub struct DemoDataset;

impl DemoDataset {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let directory = SqlPersonnelDirectory::new(pool.clone());
        for seed in SEED_PERSONNEL {
            directory.upsert(&seed.to_personnel()?).await?;
        }

        let store = SqlMovementStore::new(pool.clone());
        let mut movements_seeded = Vec::new();
        for mut movement in demo_movements()? {
            movement.version = 1;
            if store.write(&movement, 0).await? {
                movements_seeded.push(movement.id.0);
            }
        }

        Ok(SeedResult { personnel_seeded: SEED_PERSONNEL.len(), movements_seeded })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for seed in SEED_PERSONNEL {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM personnel WHERE id = ?1 AND role = ?2 AND active = 1)",
            )
            .bind(seed.id)
            .bind(seed.role)
            .fetch_one(pool)
            .await?;
            checks.push((seed.id, present == 1));
        }

        let draft: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM movement_request WHERE id = 'mv-demo-draft' AND status = 'draft')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("mv-demo-draft", draft == 1));

        let mission: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM movement_request WHERE id = 'mv-demo-mission' AND status = 'pending' AND pending_order = 1)",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("mv-demo-mission", mission == 1));

        let steps: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM movement_validation WHERE request_id = 'mv-demo-mission'",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("mv-demo-mission chain", steps == 2));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        for id in SEED_MOVEMENT_IDS {
            sqlx::query("DELETE FROM movement_notification WHERE movement_id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM movement_request WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        for seed in SEED_PERSONNEL {
            sqlx::query("DELETE FROM personnel WHERE id = ?1").bind(seed.id).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedPerson {
    id: &'static str,
    name: &'static str,
    role: &'static str,
    service: &'static str,
}

impl SeedPerson {
    fn to_personnel(self) -> Result<Personnel, RepositoryError> {
        let role = PersonnelRole::parse(self.role)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown seed role `{}`", self.role)))?;
        Ok(Personnel::new(self.id, self.name, role, self.service))
    }
}

fn demo_movements() -> Result<Vec<MovementRequest>, RepositoryError> {
    let created_at = Utc
        .with_ymd_and_hms(2024, 5, 2, 8, 0, 0)
        .single()
        .ok_or_else(|| RepositoryError::Decode("invalid seed timestamp".to_string()))?;
    let day = |y: i32, m: u32, d: u32| {
        NaiveDate::from_ymd_opt(y, m, d)
            .ok_or_else(|| RepositoryError::Decode(format!("invalid seed date {y}-{m}-{d}")))
    };
    let invalid = |error: staffmove_core::errors::WorkflowError| {
        RepositoryError::Decode(format!("seed movement rejected: {error}"))
    };

    let draft = MovementRequest::create(
        MovementId("mv-demo-draft".to_string()),
        NewMovement {
            requester_id: PersonnelId("p-4".to_string()),
            movement_type: MovementType::Leave,
            title: "Congé annuel".to_string(),
            description: "Deux semaines de congé annuel".to_string(),
            start_date: day(2024, 7, 1)?,
            end_date: day(2024, 7, 14)?,
            destination: None,
            urgency: Urgency::Low,
            budget_estimate: None,
        },
        created_at,
    )
    .map_err(invalid)?;

    let mut mission = MovementRequest::create(
        MovementId("mv-demo-mission".to_string()),
        NewMovement {
            requester_id: PersonnelId("p-5".to_string()),
            movement_type: MovementType::Mission,
            title: "Inventaire dépôt régional".to_string(),
            description: "Contrôle annuel des stocks du dépôt".to_string(),
            start_date: day(2024, 6, 10)?,
            end_date: day(2024, 6, 12)?,
            destination: Some("Toamasina".to_string()),
            urgency: Urgency::Medium,
            budget_estimate: None,
        },
        created_at,
    )
    .map_err(invalid)?;
    mission
        .submit(
            vec![
                Validation::pending(PersonnelId("p-6".to_string()), ValidatorRole::ServiceChief, 1),
                Validation::pending(PersonnelId("p-2".to_string()), ValidatorRole::Hr, 2),
            ],
            created_at,
        )
        .map_err(invalid)?;

    Ok(vec![draft, mission])
}

#[derive(Debug)]
pub struct SeedResult {
    pub personnel_seeded: usize,
    pub movements_seeded: Vec<String>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
