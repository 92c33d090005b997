use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use correduria_core::audit::{AuditCategory, AuditEvent, AuditOutcome};

use super::{AuditRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAuditRepository {
    pool: DbPool,
}

impl SqlAuditRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_category(raw: &str) -> Result<AuditCategory, RepositoryError> {
    match raw {
        "renewal" => Ok(AuditCategory::Renewal),
        "commission" => Ok(AuditCategory::Commission),
        "client" => Ok(AuditCategory::Client),
        "mail" => Ok(AuditCategory::Mail),
        "system" => Ok(AuditCategory::System),
        other => Err(RepositoryError::Decode(format!("unknown audit category `{other}`"))),
    }
}

fn parse_outcome(raw: &str) -> Result<AuditOutcome, RepositoryError> {
    match raw {
        "success" => Ok(AuditOutcome::Success),
        "rejected" => Ok(AuditOutcome::Rejected),
        "failed" => Ok(AuditOutcome::Failed),
        other => Err(RepositoryError::Decode(format!("unknown audit outcome `{other}`"))),
    }
}

fn row_to_event(row: &SqliteRow) -> Result<AuditEvent, RepositoryError> {
    let category: String = row.try_get("category")?;
    let outcome: String = row.try_get("outcome")?;
    let metadata_raw: String = row.try_get("metadata")?;
    let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata_raw)
        .map_err(|err| RepositoryError::Decode(format!("audit metadata: {err}")))?;

    Ok(AuditEvent {
        event_id: row.try_get("id")?,
        entity_id: row.try_get("entity_id")?,
        correlation_id: row.try_get("correlation_id")?,
        event_type: row.try_get("event_type")?,
        category: parse_category(&category)?,
        actor: row.try_get("actor")?,
        outcome: parse_outcome(&outcome)?,
        metadata,
        occurred_at: row.try_get("occurred_at")?,
    })
}

#[async_trait]
impl AuditRepository for SqlAuditRepository {
    async fn append(&self, event: &AuditEvent) -> Result<(), RepositoryError> {
        let metadata = serde_json::to_string(&event.metadata)
            .map_err(|err| RepositoryError::Decode(format!("audit metadata: {err}")))?;

        sqlx::query(
            "INSERT INTO audit_event
                 (id, entity_id, correlation_id, event_type, category, actor, outcome, metadata, occurred_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&event.event_id)
        .bind(&event.entity_id)
        .bind(&event.correlation_id)
        .bind(&event.event_type)
        .bind(event.category.as_str())
        .bind(&event.actor)
        .bind(event.outcome.as_str())
        .bind(metadata)
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<AuditEvent>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM audit_event ORDER BY occurred_at DESC LIMIT ?1")
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_event).collect()
    }
}
