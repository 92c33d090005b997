use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use correduria_core::domain::policy::PolicyId;
use correduria_core::domain::renewal::{RenewalConfig, RenewalConfigId, RenewalStatus};

use super::{decode_decimal, RenewalRepository, RepositoryError};
use crate::DbPool;

pub struct SqlRenewalRepository {
    pool: DbPool,
}

impl SqlRenewalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_config(row: &SqliteRow) -> Result<RenewalConfig, RepositoryError> {
    let current: String = row.try_get("current_premium")?;
    let proposed: String = row.try_get("proposed_premium")?;
    let status: String = row.try_get("status")?;

    Ok(RenewalConfig {
        id: RenewalConfigId(row.try_get("id")?),
        policy_id: PolicyId(row.try_get("policy_id")?),
        renewal_date: row.try_get("renewal_date")?,
        current_premium: decode_decimal(&current, "current_premium")?,
        proposed_premium: decode_decimal(&proposed, "proposed_premium")?,
        scheduled_send_date: row.try_get("scheduled_send_date")?,
        status: status.parse::<RenewalStatus>().map_err(RepositoryError::Decode)?,
        notes: row.try_get("notes")?,
        sent_at: row.try_get("sent_at")?,
        failed_at: row.try_get("failed_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl RenewalRepository for SqlRenewalRepository {
    async fn upsert(&self, config: &RenewalConfig) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO renewal_config
                 (id, policy_id, renewal_date, current_premium, proposed_premium,
                  scheduled_send_date, status, notes, sent_at, failed_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, NULL, ?9, ?9)
             ON CONFLICT (policy_id, renewal_date) DO UPDATE SET
                 current_premium = excluded.current_premium,
                 proposed_premium = excluded.proposed_premium,
                 scheduled_send_date = excluded.scheduled_send_date,
                 status = 'programada',
                 notes = excluded.notes,
                 sent_at = NULL,
                 failed_at = NULL,
                 updated_at = excluded.updated_at",
        )
        .bind(&config.id.0)
        .bind(&config.policy_id.0)
        .bind(config.renewal_date)
        .bind(config.current_premium.to_string())
        .bind(config.proposed_premium.to_string())
        .bind(config.scheduled_send_date)
        .bind(config.status.as_str())
        .bind(&config.notes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &RenewalConfigId,
    ) -> Result<Option<RenewalConfig>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM renewal_config WHERE id = ?1")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_config).transpose()
    }

    async fn list(&self) -> Result<Vec<RenewalConfig>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM renewal_config ORDER BY scheduled_send_date")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_config).collect()
    }

    async fn list_due_on(&self, date: NaiveDate) -> Result<Vec<RenewalConfig>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM renewal_config
             WHERE scheduled_send_date = ?1 AND status = 'programada' AND sent_at IS NULL
             ORDER BY created_at",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_config).collect()
    }

    async fn mark_sent(
        &self,
        id: &RenewalConfigId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE renewal_config
             SET status = 'enviada', sent_at = ?2, updated_at = ?2
             WHERE id = ?1 AND status = 'programada'",
        )
        .bind(&id.0)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "renewal {} is not in programada state",
                id.0
            )));
        }

        Ok(())
    }

    async fn mark_error(
        &self,
        id: &RenewalConfigId,
        note: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE renewal_config
             SET status = 'error', notes = ?2, failed_at = ?3, updated_at = ?3
             WHERE id = ?1 AND status = 'programada'",
        )
        .bind(&id.0)
        .bind(note)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "renewal {} is not in programada state",
                id.0
            )));
        }

        Ok(())
    }

    async fn reopen(&self, id: &RenewalConfigId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE renewal_config
             SET status = 'programada', sent_at = NULL, failed_at = NULL, updated_at = ?2
             WHERE id = ?1 AND status IN ('enviada', 'error')",
        )
        .bind(&id.0)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "renewal {} cannot be reopened from its current state",
                id.0
            )));
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
    use correduria_core::domain::renewal::{
        scheduled_send_date, RenewalConfig, RenewalConfigId, RenewalStatus,
    };

    use super::SqlRenewalRepository;
    use crate::repositories::{
        ClientRepository, PolicyRepository, RenewalRepository, SqlClientRepository,
        SqlPolicyRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn seeded_pool() -> crate::DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let clients = SqlClientRepository::new(pool.clone());
        clients
            .insert(&Client {
                id: ClientId("cli-1".to_string()),
                full_name: "Laura Méndez".to_string(),
                email: Some("laura@example.com".to_string()),
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
                insurer: "Mapfre".to_string(),
                product: "Auto Plus".to_string(),
                policy_number: "POL-1".to_string(),
                annual_premium: Decimal::new(100_000, 2),
                frequency: None,
                start_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("date"),
                end_date: NaiveDate::from_ymd_opt(2026, 9, 6).expect("date"),
                status: PolicyStatus::Activa,
            })
            .await
            .expect("insert policy");

        pool
    }

    fn config(id: &str, renewal_date: NaiveDate) -> RenewalConfig {
        RenewalConfig {
            id: RenewalConfigId(id.to_string()),
            policy_id: PolicyId("pol-1".to_string()),
            renewal_date,
            current_premium: Decimal::new(100_000, 2),
            proposed_premium: Decimal::new(110_000, 2),
            scheduled_send_date: scheduled_send_date(renewal_date),
            status: RenewalStatus::Programada,
            notes: None,
            sent_at: None,
            failed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn due_selection_filters_by_date_status_and_sent_flag() {
        let pool = seeded_pool().await;
        let repo = SqlRenewalRepository::new(pool.clone());

        let renewal_date = NaiveDate::from_ymd_opt(2026, 9, 6).expect("date");
        let send_date = scheduled_send_date(renewal_date);
        repo.upsert(&config("ren-1", renewal_date)).await.expect("upsert");

        let due = repo.list_due_on(send_date).await.expect("list due");
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id.0, "ren-1");

        repo.mark_sent(&RenewalConfigId("ren-1".to_string()), Utc::now()).await.expect("mark sent");
        let due_after = repo.list_due_on(send_date).await.expect("list due");
        assert!(due_after.is_empty(), "sent records drop out of the due selection");

        pool.close().await;
    }

    #[tokio::test]
    async fn upsert_reschedules_an_existing_cycle() {
        let pool = seeded_pool().await;
        let repo = SqlRenewalRepository::new(pool.clone());

        let renewal_date = NaiveDate::from_ymd_opt(2026, 9, 6).expect("date");
        repo.upsert(&config("ren-1", renewal_date)).await.expect("first upsert");
        repo.mark_error(&RenewalConfigId("ren-1".to_string()), "sin correo", Utc::now())
            .await
            .expect("mark error");

        // Operator re-enters a proposed premium for the same cycle.
        let mut updated = config("ren-ignored", renewal_date);
        updated.proposed_premium = Decimal::new(125_000, 2);
        repo.upsert(&updated).await.expect("second upsert");

        let stored = repo
            .find_by_id(&RenewalConfigId("ren-1".to_string()))
            .await
            .expect("query")
            .expect("kept original id");
        assert_eq!(stored.proposed_premium, Decimal::new(125_000, 2));
        assert_eq!(stored.status, RenewalStatus::Programada);
        assert!(stored.failed_at.is_none(), "reschedule clears the failure stamp");

        pool.close().await;
    }

    #[tokio::test]
    async fn sent_records_only_leave_via_reopen() {
        let pool = seeded_pool().await;
        let repo = SqlRenewalRepository::new(pool.clone());

        let renewal_date = NaiveDate::from_ymd_opt(2026, 9, 6).expect("date");
        repo.upsert(&config("ren-1", renewal_date)).await.expect("upsert");
        let id = RenewalConfigId("ren-1".to_string());

        repo.mark_sent(&id, Utc::now()).await.expect("mark sent");
        assert!(repo.mark_error(&id, "x", Utc::now()).await.is_err());

        repo.reopen(&id).await.expect("reopen");
        let stored = repo.find_by_id(&id).await.expect("query").expect("exists");
        assert_eq!(stored.status, RenewalStatus::Programada);
        assert!(stored.sent_at.is_none());

        pool.close().await;
    }
}
