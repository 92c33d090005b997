use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use correduria_core::domain::client::ClientId;
use correduria_core::domain::sales::{OpportunityStage, SalesOpportunity, SalesOpportunityId};

use super::{decode_opt_decimal, RepositoryError, SalesRepository};
use crate::DbPool;

pub struct SqlSalesRepository {
    pool: DbPool,
}

impl SqlSalesRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_opportunity(row: &SqliteRow) -> Result<SalesOpportunity, RepositoryError> {
    let stage: String = row.try_get("stage")?;
    let estimated: Option<String> = row.try_get("estimated_premium")?;

    Ok(SalesOpportunity {
        id: SalesOpportunityId(row.try_get("id")?),
        client_id: ClientId(row.try_get("client_id")?),
        product_interest: row.try_get("product_interest")?,
        estimated_premium: decode_opt_decimal(estimated, "estimated_premium")?,
        stage: stage.parse::<OpportunityStage>().map_err(RepositoryError::Decode)?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl SalesRepository for SqlSalesRepository {
    async fn insert(&self, opportunity: &SalesOpportunity) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO sales_opportunity
                 (id, client_id, product_interest, estimated_premium, stage, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&opportunity.id.0)
        .bind(&opportunity.client_id.0)
        .bind(&opportunity.product_interest)
        .bind(opportunity.estimated_premium.map(|premium| premium.to_string()))
        .bind(opportunity.stage.as_str())
        .bind(&opportunity.notes)
        .bind(opportunity.created_at)
        .bind(opportunity.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &SalesOpportunityId,
    ) -> Result<Option<SalesOpportunity>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM sales_opportunity WHERE id = ?1")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_opportunity).transpose()
    }

    async fn save(&self, opportunity: &SalesOpportunity) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE sales_opportunity
             SET product_interest = ?2, estimated_premium = ?3, stage = ?4, notes = ?5, updated_at = ?6
             WHERE id = ?1",
        )
        .bind(&opportunity.id.0)
        .bind(&opportunity.product_interest)
        .bind(opportunity.estimated_premium.map(|premium| premium.to_string()))
        .bind(opportunity.stage.as_str())
        .bind(&opportunity.notes)
        .bind(opportunity.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("opportunity {}", opportunity.id.0)));
        }

        Ok(())
    }

    async fn list(&self) -> Result<Vec<SalesOpportunity>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM sales_opportunity ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_opportunity).collect()
    }
}
