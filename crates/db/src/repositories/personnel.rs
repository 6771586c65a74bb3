use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use staffmove_core::domain::personnel::{Personnel, PersonnelId, PersonnelRole};
use staffmove_core::ports::{PersonnelDirectory, StoreError};

use super::{decode_error, unknown_value, RepositoryError};
use crate::DbPool;

#[derive(Clone)]
pub struct SqlPersonnelDirectory {
    pool: DbPool,
}

impl SqlPersonnelDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, person: &Personnel) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO personnel (id, name, role, service, active)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 role = excluded.role,
                 service = excluded.service,
                 active = excluded.active",
        )
        .bind(&person.id.0)
        .bind(&person.name)
        .bind(person.role.as_str())
        .bind(&person.service)
        .bind(person.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<Personnel>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, role, service, active FROM personnel ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_personnel).collect()
    }

    async fn find_active(
        &self,
        role: PersonnelRole,
        service: &str,
    ) -> Result<Option<Personnel>, RepositoryError> {
        // Lowest id wins when a service has several holders of the same role.
        let row = sqlx::query(
            "SELECT id, name, role, service, active FROM personnel
             WHERE active = 1 AND role = ? AND LOWER(TRIM(service)) = LOWER(TRIM(?))
             ORDER BY id ASC
             LIMIT 1",
        )
        .bind(role.as_str())
        .bind(service)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_personnel).transpose()
    }

    async fn find_by_id(&self, id: &PersonnelId) -> Result<Option<Personnel>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, role, service, active FROM personnel WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_personnel).transpose()
    }
}

#[async_trait::async_trait]
impl PersonnelDirectory for SqlPersonnelDirectory {
    async fn find_active_by_role_and_service(
        &self,
        role: PersonnelRole,
        service: &str,
    ) -> Result<Option<Personnel>, StoreError> {
        Ok(self.find_active(role, service).await?)
    }

    async fn get_by_id(&self, id: &PersonnelId) -> Result<Option<Personnel>, StoreError> {
        Ok(self.find_by_id(id).await?)
    }
}

fn row_to_personnel(row: &SqliteRow) -> Result<Personnel, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| decode_error("id", e))?;
    let name: String = row.try_get("name").map_err(|e| decode_error("name", e))?;
    let role: String = row.try_get("role").map_err(|e| decode_error("role", e))?;
    let service: String = row.try_get("service").map_err(|e| decode_error("service", e))?;
    let active: bool = row.try_get("active").map_err(|e| decode_error("active", e))?;

    Ok(Personnel {
        id: PersonnelId(id),
        name,
        role: PersonnelRole::parse(&role).ok_or_else(|| unknown_value("role", &role))?,
        service,
        active,
    })
}

#[cfg(test)]
mod tests {
    use staffmove_core::domain::personnel::{Personnel, PersonnelId, PersonnelRole};
    use staffmove_core::ports::PersonnelDirectory;

    use super::SqlPersonnelDirectory;
    use crate::{connect_with_settings, migrations::run_pending};

    #[tokio::test]
    async fn lookup_ignores_inactive_and_matches_service_loosely() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrations");
        let directory = SqlPersonnelDirectory::new(pool);

        for person in [
            Personnel::new("p-1", "Ancien chef", PersonnelRole::ServiceChief, "Pharmacie").inactive(),
            Personnel::new("p-7", "Chef pharmacie", PersonnelRole::ServiceChief, "Pharmacie"),
            Personnel::new("p-9", "Adjoint", PersonnelRole::ServiceChief, "pharmacie "),
        ] {
            directory.upsert(&person).await.expect("upsert");
        }

        let found = directory
            .find_active_by_role_and_service(PersonnelRole::ServiceChief, " PHARMACIE")
            .await
            .expect("lookup")
            .expect("active chief");
        assert_eq!(found.id, PersonnelId("p-7".to_string()));

        let retired = directory.get_by_id(&PersonnelId("p-1".to_string())).await.expect("get");
        assert_eq!(retired.map(|person| person.active), Some(false));
        assert_eq!(directory.list_all().await.expect("list").len(), 3);
    }
}
