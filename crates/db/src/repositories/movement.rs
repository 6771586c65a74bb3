use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use staffmove_core::domain::movement::{
    MovementId, MovementRequest, MovementStatus, MovementType, Urgency, Validation, ValidationId,
    ValidationStatus, ValidatorRole,
};
use staffmove_core::domain::personnel::PersonnelId;
use staffmove_core::ports::{MovementStore, StoreError};

use super::{
    decode_error, parse_date, parse_optional_timestamp, parse_timestamp, parse_u32, unknown_value,
    RepositoryError,
};
use crate::DbPool;

const REQUEST_COLUMNS: &str = "id, requester_id, movement_type, title, description, start_date,
    end_date, destination, urgency, budget_estimate, status, pending_order, version, created_at,
    updated_at";

const VALIDATION_COLUMNS: &str =
    "id, request_id, validator_id, validator_role, status, comment, validated_at, step_order";

/// SQLite-backed [`MovementStore`]. A request and its chain are written in one transaction,
/// guarded by the version column.
#[derive(Clone)]
pub struct SqlMovementStore {
    pool: DbPool,
}

impl SqlMovementStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find(&self, id: &MovementId) -> Result<Option<MovementRequest>, RepositoryError> {
        // One read transaction so the row and its chain come from the same snapshot.
        let mut tx = self.pool.begin().await?;
        let row =
            sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM movement_request WHERE id = ?"))
                .bind(&id.0)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let validation_rows = sqlx::query(&format!(
            "SELECT {VALIDATION_COLUMNS} FROM movement_validation
             WHERE request_id = ? ORDER BY step_order ASC"
        ))
        .bind(&id.0)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let validations =
            validation_rows.iter().map(row_to_validation).collect::<Result<Vec<_>, _>>()?;
        Ok(Some(row_to_request(&row, validations)?))
    }

    async fn list(
        &self,
        requester_id: Option<&PersonnelId>,
    ) -> Result<Vec<MovementRequest>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let (request_rows, validation_rows) = match requester_id {
            Some(requester_id) => {
                let requests = sqlx::query(&format!(
                    "SELECT {REQUEST_COLUMNS} FROM movement_request WHERE requester_id = ?"
                ))
                .bind(&requester_id.0)
                .fetch_all(&mut *tx)
                .await?;
                let validations = sqlx::query(
                    "SELECT v.id, v.request_id, v.validator_id, v.validator_role, v.status,
                            v.comment, v.validated_at, v.step_order
                     FROM movement_validation v
                     JOIN movement_request r ON r.id = v.request_id
                     WHERE r.requester_id = ?
                     ORDER BY v.request_id, v.step_order ASC",
                )
                .bind(&requester_id.0)
                .fetch_all(&mut *tx)
                .await?;
                (requests, validations)
            }
            None => {
                let requests =
                    sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM movement_request"))
                        .fetch_all(&mut *tx)
                        .await?;
                let validations = sqlx::query(&format!(
                    "SELECT {VALIDATION_COLUMNS} FROM movement_validation
                     ORDER BY request_id, step_order ASC"
                ))
                .fetch_all(&mut *tx)
                .await?;
                (requests, validations)
            }
        };
        tx.commit().await?;

        let mut chains: HashMap<String, Vec<Validation>> = HashMap::new();
        for row in &validation_rows {
            let request_id: String =
                row.try_get("request_id").map_err(|e| decode_error("request_id", e))?;
            chains.entry(request_id).or_default().push(row_to_validation(row)?);
        }

        request_rows
            .iter()
            .map(|row| {
                let id: String = row.try_get("id").map_err(|e| decode_error("id", e))?;
                row_to_request(row, chains.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    pub(crate) async fn write(
        &self,
        request: &MovementRequest,
        expected_version: u32,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let budget = request.budget_estimate.map(|budget| budget.to_string());
        let affected = if expected_version == 0 {
            sqlx::query(
                "INSERT INTO movement_request (id, requester_id, movement_type, title, description,
                     start_date, end_date, destination, urgency, budget_estimate, status,
                     pending_order, version, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO NOTHING",
            )
            .bind(&request.id.0)
            .bind(&request.requester_id.0)
            .bind(request.movement_type.as_str())
            .bind(&request.title)
            .bind(&request.description)
            .bind(request.start_date.to_string())
            .bind(request.end_date.to_string())
            .bind(&request.destination)
            .bind(request.urgency.as_str())
            .bind(&budget)
            .bind(request.status.as_str())
            .bind(request.status.pending_order().map(i64::from))
            .bind(i64::from(request.version))
            .bind(request.created_at.to_rfc3339())
            .bind(request.updated_at.to_rfc3339())
            .execute(&mut *tx)
            .await?
            .rows_affected()
        } else {
            sqlx::query(
                "UPDATE movement_request SET
                     movement_type = ?, title = ?, description = ?, start_date = ?, end_date = ?,
                     destination = ?, urgency = ?, budget_estimate = ?, status = ?,
                     pending_order = ?, version = ?, updated_at = ?
                 WHERE id = ? AND version = ?",
            )
            .bind(request.movement_type.as_str())
            .bind(&request.title)
            .bind(&request.description)
            .bind(request.start_date.to_string())
            .bind(request.end_date.to_string())
            .bind(&request.destination)
            .bind(request.urgency.as_str())
            .bind(&budget)
            .bind(request.status.as_str())
            .bind(request.status.pending_order().map(i64::from))
            .bind(i64::from(request.version))
            .bind(request.updated_at.to_rfc3339())
            .bind(&request.id.0)
            .bind(i64::from(expected_version))
            .execute(&mut *tx)
            .await?
            .rows_affected()
        };

        if affected == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM movement_validation WHERE request_id = ?")
            .bind(&request.id.0)
            .execute(&mut *tx)
            .await?;

        for step in &request.validations {
            sqlx::query(
                "INSERT INTO movement_validation (id, request_id, validator_id, validator_role,
                     status, comment, validated_at, step_order)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&step.id.0)
            .bind(&request.id.0)
            .bind(&step.validator_id.0)
            .bind(step.validator_role.as_str())
            .bind(step.status.as_str())
            .bind(&step.comment)
            .bind(step.validated_at.map(|at| at.to_rfc3339()))
            .bind(i64::from(step.order))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait::async_trait]
impl MovementStore for SqlMovementStore {
    async fn get(&self, id: &MovementId) -> Result<Option<MovementRequest>, StoreError> {
        Ok(self.find(id).await?)
    }

    async fn put_if_version_matches(
        &self,
        request: &MovementRequest,
        expected_version: u32,
    ) -> Result<bool, StoreError> {
        Ok(self.write(request, expected_version).await?)
    }

    async fn query_by_requester(
        &self,
        requester_id: &PersonnelId,
    ) -> Result<Vec<MovementRequest>, StoreError> {
        Ok(self.list(Some(requester_id)).await?)
    }

    async fn query_all(&self) -> Result<Vec<MovementRequest>, StoreError> {
        Ok(self.list(None).await?)
    }
}

fn row_to_request(
    row: &SqliteRow,
    validations: Vec<Validation>,
) -> Result<MovementRequest, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| decode_error("id", e))?;
    let requester_id: String =
        row.try_get("requester_id").map_err(|e| decode_error("requester_id", e))?;
    let movement_type: String =
        row.try_get("movement_type").map_err(|e| decode_error("movement_type", e))?;
    let title: String = row.try_get("title").map_err(|e| decode_error("title", e))?;
    let description: String =
        row.try_get("description").map_err(|e| decode_error("description", e))?;
    let start_date: String = row.try_get("start_date").map_err(|e| decode_error("start_date", e))?;
    let end_date: String = row.try_get("end_date").map_err(|e| decode_error("end_date", e))?;
    let destination: Option<String> =
        row.try_get("destination").map_err(|e| decode_error("destination", e))?;
    let urgency: String = row.try_get("urgency").map_err(|e| decode_error("urgency", e))?;
    let budget_estimate: Option<String> =
        row.try_get("budget_estimate").map_err(|e| decode_error("budget_estimate", e))?;
    let status: String = row.try_get("status").map_err(|e| decode_error("status", e))?;
    let pending_order: Option<i64> =
        row.try_get("pending_order").map_err(|e| decode_error("pending_order", e))?;
    let version: i64 = row.try_get("version").map_err(|e| decode_error("version", e))?;
    let created_at: String = row.try_get("created_at").map_err(|e| decode_error("created_at", e))?;
    let updated_at: String = row.try_get("updated_at").map_err(|e| decode_error("updated_at", e))?;

    let pending_order =
        pending_order.map(|order| parse_u32("pending_order", order)).transpose()?;
    let budget_estimate = budget_estimate
        .map(|value| {
            Decimal::from_str(&value).map_err(|_| unknown_value("budget_estimate", &value))
        })
        .transpose()?;

    Ok(MovementRequest {
        id: MovementId(id),
        requester_id: PersonnelId(requester_id),
        movement_type: MovementType::parse(&movement_type)
            .ok_or_else(|| unknown_value("movement_type", &movement_type))?,
        title,
        description,
        start_date: parse_date("start_date", start_date)?,
        end_date: parse_date("end_date", end_date)?,
        destination,
        urgency: Urgency::parse(&urgency).ok_or_else(|| unknown_value("urgency", &urgency))?,
        budget_estimate,
        status: MovementStatus::parse(&status, pending_order)
            .ok_or_else(|| unknown_value("status", &status))?,
        validations,
        version: parse_u32("version", version)?,
        created_at: parse_timestamp("created_at", created_at)?,
        updated_at: parse_timestamp("updated_at", updated_at)?,
    })
}

fn row_to_validation(row: &SqliteRow) -> Result<Validation, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| decode_error("id", e))?;
    let validator_id: String =
        row.try_get("validator_id").map_err(|e| decode_error("validator_id", e))?;
    let validator_role: String =
        row.try_get("validator_role").map_err(|e| decode_error("validator_role", e))?;
    let status: String = row.try_get("status").map_err(|e| decode_error("status", e))?;
    let comment: Option<String> = row.try_get("comment").map_err(|e| decode_error("comment", e))?;
    let validated_at: Option<String> =
        row.try_get("validated_at").map_err(|e| decode_error("validated_at", e))?;
    let step_order: i64 = row.try_get("step_order").map_err(|e| decode_error("step_order", e))?;

    Ok(Validation {
        id: ValidationId(id),
        validator_id: PersonnelId(validator_id),
        validator_role: ValidatorRole::parse(&validator_role)
            .ok_or_else(|| unknown_value("validator_role", &validator_role))?,
        status: ValidationStatus::parse(&status).ok_or_else(|| unknown_value("status", &status))?,
        comment,
        validated_at: parse_optional_timestamp("validated_at", validated_at)?,
        order: parse_u32("step_order", step_order)?,
    })
}
