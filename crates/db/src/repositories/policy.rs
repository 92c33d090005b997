use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use correduria_core::domain::client::ClientId;
use correduria_core::domain::policy::{PaymentFrequency, Policy, PolicyId, PolicyStatus};

use super::{decode_decimal, PolicyRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPolicyRepository {
    pool: DbPool,
}

impl SqlPolicyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_policy(row: &SqliteRow) -> Result<Policy, RepositoryError> {
    let premium: String = row.try_get("annual_premium")?;
    let frequency: Option<String> = row.try_get("frequency")?;
    let status: String = row.try_get("status")?;

    Ok(Policy {
        id: PolicyId(row.try_get("id")?),
        client_id: ClientId(row.try_get("client_id")?),
        insurer: row.try_get("insurer")?,
        product: row.try_get("product")?,
        policy_number: row.try_get("policy_number")?,
        annual_premium: decode_decimal(&premium, "annual_premium")?,
        frequency: frequency
            .map(|raw| raw.parse::<PaymentFrequency>().map_err(RepositoryError::Decode))
            .transpose()?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        status: status.parse::<PolicyStatus>().map_err(RepositoryError::Decode)?,
    })
}

#[async_trait]
impl PolicyRepository for SqlPolicyRepository {
    async fn insert(&self, policy: &Policy) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO policy (id, client_id, insurer, product, policy_number, annual_premium, frequency, start_date, end_date, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&policy.id.0)
        .bind(&policy.client_id.0)
        .bind(&policy.insurer)
        .bind(&policy.product)
        .bind(&policy.policy_number)
        .bind(policy.annual_premium.to_string())
        .bind(policy.frequency.map(|frequency| frequency.as_str()))
        .bind(policy.start_date)
        .bind(policy.end_date)
        .bind(policy.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &PolicyId) -> Result<Option<Policy>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM policy WHERE id = ?1")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_policy).transpose()
    }

    async fn list_by_client(&self, client_id: &ClientId) -> Result<Vec<Policy>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM policy WHERE client_id = ?1 ORDER BY end_date")
            .bind(&client_id.0)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_policy).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use correduria_core::domain::client::{Client, ClientId};
    use correduria_core::domain::policy::{PaymentFrequency, Policy, PolicyId, PolicyStatus};

    use super::SqlPolicyRepository;
    use crate::repositories::{ClientRepository, PolicyRepository, SqlClientRepository};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn premium_and_frequency_round_trip() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let clients = SqlClientRepository::new(pool.clone());
        clients
            .insert(&Client {
                id: ClientId("cli-1".to_string()),
                full_name: "Pedro Gómez".to_string(),
                email: None,
                phone: None,
                birth_date: None,
                advisor_id: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .expect("insert client");

        let policies = SqlPolicyRepository::new(pool.clone());
        policies
            .insert(&Policy {
                id: PolicyId("pol-1".to_string()),
                client_id: ClientId("cli-1".to_string()),
                insurer: "Sura".to_string(),
                product: "Hogar".to_string(),
                policy_number: "POL-2026-0007".to_string(),
                annual_premium: Decimal::new(184_750, 2),
                frequency: Some(PaymentFrequency::Trimestral),
                start_date: NaiveDate::from_ymd_opt(2026, 2, 1).expect("date"),
                end_date: NaiveDate::from_ymd_opt(2027, 2, 1).expect("date"),
                status: PolicyStatus::Activa,
            })
            .await
            .expect("insert policy");

        let found = policies
            .find_by_id(&PolicyId("pol-1".to_string()))
            .await
            .expect("query")
            .expect("policy exists");
        assert_eq!(found.annual_premium, Decimal::new(184_750, 2));
        assert_eq!(found.frequency, Some(PaymentFrequency::Trimestral));
        assert_eq!(found.installment_amount(), Decimal::new(461_875, 3));

        pool.close().await;
    }
}
