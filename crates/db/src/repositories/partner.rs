use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use correduria_core::domain::partner::{DiscountCode, DiscountCodeId, Partner, PartnerId};

use super::{decode_decimal, PartnerRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPartnerRepository {
    pool: DbPool,
}

impl SqlPartnerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_partner(row: &SqliteRow) -> Result<Partner, RepositoryError> {
    let discount: String = row.try_get("discount_pct")?;

    Ok(Partner {
        id: PartnerId(row.try_get("id")?),
        name: row.try_get("name")?,
        service: row.try_get("service")?,
        discount_pct: decode_decimal(&discount, "discount_pct")?,
        active: row.try_get::<i64, _>("active")? != 0,
    })
}

fn row_to_code(row: &SqliteRow) -> Result<DiscountCode, RepositoryError> {
    Ok(DiscountCode {
        id: DiscountCodeId(row.try_get("id")?),
        partner_id: PartnerId(row.try_get("partner_id")?),
        code: row.try_get("code")?,
        redeemed: row.try_get::<i64, _>("redeemed")? != 0,
        redeemed_at: row.try_get("redeemed_at")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl PartnerRepository for SqlPartnerRepository {
    async fn insert_partner(&self, partner: &Partner) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO partner (id, name, service, discount_pct, active)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&partner.id.0)
        .bind(&partner.name)
        .bind(&partner.service)
        .bind(partner.discount_pct.to_string())
        .bind(i64::from(partner.active))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_partners(&self) -> Result<Vec<Partner>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM partner ORDER BY name").fetch_all(&self.pool).await?;
        rows.iter().map(row_to_partner).collect()
    }

    async fn insert_code(&self, code: &DiscountCode) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO discount_code (id, partner_id, code, redeemed, redeemed_at, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&code.id.0)
        .bind(&code.partner_id.0)
        .bind(&code.code)
        .bind(i64::from(code.redeemed))
        .bind(code.redeemed_at)
        .bind(code.expires_at)
        .bind(code.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_code(&self, code: &str) -> Result<Option<DiscountCode>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM discount_code WHERE code = ?1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_code).transpose()
    }

    async fn save_code(&self, code: &DiscountCode) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE discount_code SET redeemed = ?2, redeemed_at = ?3 WHERE id = ?1",
        )
        .bind(&code.id.0)
        .bind(i64::from(code.redeemed))
        .bind(code.redeemed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("discount code {}", code.id.0)));
        }

        Ok(())
    }
}
