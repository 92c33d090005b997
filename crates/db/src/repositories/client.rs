use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use correduria_core::domain::client::{AdvisorId, Client, ClientId};

use super::{ClientRepository, RepositoryError};
use crate::DbPool;

pub struct SqlClientRepository {
    pool: DbPool,
}

impl SqlClientRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_client(row: &SqliteRow) -> Result<Client, RepositoryError> {
    Ok(Client {
        id: ClientId(row.try_get("id")?),
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        birth_date: row.try_get("birth_date")?,
        advisor_id: row.try_get::<Option<String>, _>("advisor_id")?.map(AdvisorId),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ClientRepository for SqlClientRepository {
    async fn insert(&self, client: &Client) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO client (id, full_name, email, phone, birth_date, advisor_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&client.id.0)
        .bind(&client.full_name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(client.birth_date)
        .bind(client.advisor_id.as_ref().map(|id| id.0.clone()))
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, client: &Client) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE client
             SET full_name = ?2, email = ?3, phone = ?4, birth_date = ?5, advisor_id = ?6, updated_at = ?7
             WHERE id = ?1",
        )
        .bind(&client.id.0)
        .bind(&client.full_name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(client.birth_date)
        .bind(client.advisor_id.as_ref().map(|id| id.0.clone()))
        .bind(client.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("client {}", client.id.0)));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &ClientId) -> Result<Option<Client>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM client WHERE id = ?1")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_client).transpose()
    }

    async fn list(&self) -> Result<Vec<Client>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM client ORDER BY full_name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_client).collect()
    }

    async fn list_birthdays_on(&self, today: NaiveDate) -> Result<Vec<Client>, RepositoryError> {
        // Month/day matching (incl. the Feb-29 rule) lives on the domain
        // type; the query only narrows to clients with a birth date.
        let rows = sqlx::query("SELECT * FROM client WHERE birth_date IS NOT NULL")
            .fetch_all(&self.pool)
            .await?;

        let clients: Vec<Client> =
            rows.iter().map(row_to_client).collect::<Result<_, _>>()?;
        Ok(clients.into_iter().filter(|client| client.birthday_on(today)).collect())
    }

    async fn delete(&self, id: &ClientId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM client WHERE id = ?1")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("client {}", id.0)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use correduria_core::domain::client::{Client, ClientId};
    use correduria_core::domain::policy::{Policy, PolicyId, PolicyStatus};

    use super::SqlClientRepository;
    use crate::repositories::{ClientRepository, PolicyRepository, SqlPolicyRepository};
    use crate::{connect_with_settings, migrations};

    async fn pool() -> crate::DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        pool
    }

    fn client(id: &str, birth_date: Option<&str>) -> Client {
        Client {
            id: ClientId(id.to_string()),
            full_name: format!("Cliente {id}"),
            email: Some(format!("{id}@example.com")),
            phone: None,
            birth_date: birth_date.map(|d| d.parse().expect("valid date")),
            advisor_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let pool = pool().await;
        let repo = SqlClientRepository::new(pool.clone());

        repo.insert(&client("cli-1", Some("1985-03-12"))).await.expect("insert");

        let found = repo
            .find_by_id(&ClientId("cli-1".to_string()))
            .await
            .expect("query")
            .expect("client exists");
        assert_eq!(found.full_name, "Cliente cli-1");
        assert_eq!(found.birth_date, Some(NaiveDate::from_ymd_opt(1985, 3, 12).expect("date")));

        pool.close().await;
    }

    #[tokio::test]
    async fn birthday_listing_filters_by_month_and_day() {
        let pool = pool().await;
        let repo = SqlClientRepository::new(pool.clone());

        repo.insert(&client("cli-1", Some("1985-08-07"))).await.expect("insert");
        repo.insert(&client("cli-2", Some("1990-08-08"))).await.expect("insert");
        repo.insert(&client("cli-3", None)).await.expect("insert");

        let today = NaiveDate::from_ymd_opt(2026, 8, 7).expect("date");
        let celebrants = repo.list_birthdays_on(today).await.expect("list");

        assert_eq!(celebrants.len(), 1);
        assert_eq!(celebrants[0].id.0, "cli-1");

        pool.close().await;
    }

    #[tokio::test]
    async fn bulk_delete_is_per_row_and_survives_one_failure() {
        let pool = pool().await;
        let clients = SqlClientRepository::new(pool.clone());
        let policies = SqlPolicyRepository::new(pool.clone());

        for id in ["cli-1", "cli-2", "cli-3"] {
            clients.insert(&client(id, None)).await.expect("insert");
        }

        // cli-2 has a policy, so its delete hits the foreign key.
        policies
            .insert(&Policy {
                id: PolicyId("pol-1".to_string()),
                client_id: ClientId("cli-2".to_string()),
                insurer: "Mapfre".to_string(),
                product: "Auto Plus".to_string(),
                policy_number: "POL-1".to_string(),
                annual_premium: Decimal::new(100_000, 2),
                frequency: None,
                start_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("date"),
                end_date: NaiveDate::from_ymd_opt(2027, 1, 1).expect("date"),
                status: PolicyStatus::Activa,
            })
            .await
            .expect("insert policy");

        let ids: Vec<ClientId> =
            ["cli-1", "cli-2", "cli-3"].iter().map(|id| ClientId(id.to_string())).collect();
        let outcomes = clients.delete_many(&ids).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].deleted);
        assert!(!outcomes[1].deleted, "client with a policy must fail the FK check");
        assert!(outcomes[1].error.is_some());
        assert!(outcomes[2].deleted, "rows after the failing one still go through");

        let remaining = clients.list().await.expect("list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id.0, "cli-2");

        pool.close().await;
    }
}
