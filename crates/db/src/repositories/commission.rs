use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use correduria_core::domain::commission::{
    BatchStatus, CommissionBatch, CommissionBatchId, CommissionEntry, CommissionEntryId,
};

use super::{decode_decimal, CommissionRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCommissionRepository {
    pool: DbPool,
}

impl SqlCommissionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_batch(row: &SqliteRow) -> Result<CommissionBatch, RepositoryError> {
    let status: String = row.try_get("status")?;

    Ok(CommissionBatch {
        id: CommissionBatchId(row.try_get("id")?),
        insurer: row.try_get("insurer")?,
        period: row.try_get("period")?,
        currency: row.try_get("currency")?,
        status: status.parse::<BatchStatus>().map_err(RepositoryError::Decode)?,
        created_at: row.try_get("created_at")?,
        verified_at: row.try_get("verified_at")?,
    })
}

fn row_to_entry(row: &SqliteRow) -> Result<CommissionEntry, RepositoryError> {
    let premium: String = row.try_get("premium")?;
    let rate: String = row.try_get("rate_pct")?;
    let reported: String = row.try_get("reported_amount")?;

    Ok(CommissionEntry {
        id: CommissionEntryId(row.try_get("id")?),
        batch_id: CommissionBatchId(row.try_get("batch_id")?),
        policy_number: row.try_get("policy_number")?,
        premium: decode_decimal(&premium, "premium")?,
        rate_pct: decode_decimal(&rate, "rate_pct")?,
        reported_amount: decode_decimal(&reported, "reported_amount")?,
        verified: row.try_get::<i64, _>("verified")? != 0,
        verified_at: row.try_get("verified_at")?,
    })
}

#[async_trait]
impl CommissionRepository for SqlCommissionRepository {
    async fn create_batch(
        &self,
        batch: &CommissionBatch,
        entries: &[CommissionEntry],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO commission_batch (id, insurer, period, currency, status, created_at, verified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&batch.id.0)
        .bind(&batch.insurer)
        .bind(&batch.period)
        .bind(&batch.currency)
        .bind(batch.status.as_str())
        .bind(batch.created_at)
        .bind(batch.verified_at)
        .execute(&mut *tx)
        .await?;

        for entry in entries {
            sqlx::query(
                "INSERT INTO commission_entry
                     (id, batch_id, policy_number, premium, rate_pct, reported_amount, verified, verified_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(&entry.id.0)
            .bind(&entry.batch_id.0)
            .bind(&entry.policy_number)
            .bind(entry.premium.to_string())
            .bind(entry.rate_pct.to_string())
            .bind(entry.reported_amount.to_string())
            .bind(i64::from(entry.verified))
            .bind(entry.verified_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_batch(
        &self,
        id: &CommissionBatchId,
    ) -> Result<Option<CommissionBatch>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM commission_batch WHERE id = ?1")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_batch).transpose()
    }

    async fn list_batches(&self) -> Result<Vec<CommissionBatch>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM commission_batch ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_batch).collect()
    }

    async fn list_entries(
        &self,
        batch_id: &CommissionBatchId,
    ) -> Result<Vec<CommissionEntry>, RepositoryError> {
        let rows =
            sqlx::query("SELECT * FROM commission_entry WHERE batch_id = ?1 ORDER BY policy_number")
                .bind(&batch_id.0)
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn find_entry(
        &self,
        id: &CommissionEntryId,
    ) -> Result<Option<CommissionEntry>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM commission_entry WHERE id = ?1")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_entry).transpose()
    }

    async fn save_entry(&self, entry: &CommissionEntry) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE commission_entry SET verified = ?2, verified_at = ?3 WHERE id = ?1",
        )
        .bind(&entry.id.0)
        .bind(i64::from(entry.verified))
        .bind(entry.verified_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("commission entry {}", entry.id.0)));
        }

        Ok(())
    }

    async fn save_batch(&self, batch: &CommissionBatch) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE commission_batch SET status = ?2, verified_at = ?3 WHERE id = ?1",
        )
        .bind(&batch.id.0)
        .bind(batch.status.as_str())
        .bind(batch.verified_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("commission batch {}", batch.id.0)));
        }

        Ok(())
    }
}
