use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use correduria_core::domain::client::Section;
use correduria_core::domain::commission::{
    BatchStatus, CommissionBatch, CommissionBatchId, CommissionEntry, CommissionEntryId,
};
use correduria_core::errors::DomainError;
use correduria_db::repositories::{CommissionRepository, SqlCommissionRepository};
use correduria_db::DbPool;

use crate::respond::{bad_request, not_found, require_role, storage_error, ErrorResponse};

#[derive(Clone)]
pub struct CommissionsState {
    db_pool: DbPool,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new()
        .route("/commissions/batches", get(list_batches))
        .route("/commissions/batches/{id}/entries", get(list_entries))
        .route("/commissions/batches/{id}/verify", post(verify_batch))
        .route("/commissions/entries/{id}/verify", post(verify_entry))
        .with_state(CommissionsState { db_pool })
}

#[derive(Debug, Serialize)]
struct BatchResponse {
    id: String,
    insurer: String,
    period: String,
    currency: String,
    status: BatchStatus,
    created_at: DateTime<Utc>,
    verified_at: Option<DateTime<Utc>>,
}

impl From<CommissionBatch> for BatchResponse {
    fn from(batch: CommissionBatch) -> Self {
        Self {
            id: batch.id.0,
            insurer: batch.insurer,
            period: batch.period,
            currency: batch.currency,
            status: batch.status,
            created_at: batch.created_at,
            verified_at: batch.verified_at,
        }
    }
}

/// Entry annotated with the expected amount and the discrepancy flag the
/// reconciliation screen renders as a warning.
#[derive(Debug, Serialize)]
struct EntryResponse {
    id: String,
    policy_number: String,
    premium: Decimal,
    rate_pct: Decimal,
    reported_amount: Decimal,
    expected_amount: Decimal,
    discrepancy: bool,
    verified: bool,
}

impl From<CommissionEntry> for EntryResponse {
    fn from(entry: CommissionEntry) -> Self {
        let expected_amount = entry.expected_amount();
        let discrepancy = entry.has_discrepancy();
        Self {
            id: entry.id.0,
            policy_number: entry.policy_number,
            premium: entry.premium,
            rate_pct: entry.rate_pct,
            reported_amount: entry.reported_amount,
            expected_amount,
            discrepancy,
            verified: entry.verified,
        }
    }
}

fn domain_error_response(error: DomainError) -> ErrorResponse {
    let message = match &error {
        DomainError::InvalidBatchTransition { .. } => {
            "El lote ya está verificado.".to_string()
        }
        DomainError::InvariantViolation(detail) if detail.contains("discrepancy") => {
            "La entrada tiene una discrepancia de comisión pendiente de conciliación.".to_string()
        }
        DomainError::InvariantViolation(_) => {
            "No se puede verificar el lote: hay entradas sin verificar.".to_string()
        }
        _ => "No se pudo procesar la solicitud. Verifica los datos e intenta de nuevo.".to_string(),
    };
    bad_request(message)
}

async fn list_batches(
    State(state): State<CommissionsState>,
    headers: HeaderMap,
) -> Result<Json<Vec<BatchResponse>>, ErrorResponse> {
    require_role(&headers, Section::Comisiones)?;

    let repo = SqlCommissionRepository::new(state.db_pool.clone());
    let batches =
        repo.list_batches().await.map_err(|error| storage_error("commissions.list", &error))?;
    Ok(Json(batches.into_iter().map(BatchResponse::from).collect()))
}

async fn list_entries(
    State(state): State<CommissionsState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<EntryResponse>>, ErrorResponse> {
    require_role(&headers, Section::Comisiones)?;

    let repo = SqlCommissionRepository::new(state.db_pool.clone());
    let entries = repo
        .list_entries(&CommissionBatchId(id))
        .await
        .map_err(|error| storage_error("commissions.entries", &error))?;
    Ok(Json(entries.into_iter().map(EntryResponse::from).collect()))
}

async fn verify_entry(
    State(state): State<CommissionsState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<EntryResponse>, ErrorResponse> {
    require_role(&headers, Section::Comisiones)?;

    let repo = SqlCommissionRepository::new(state.db_pool.clone());
    let Some(mut entry) = repo
        .find_entry(&CommissionEntryId(id))
        .await
        .map_err(|error| storage_error("commissions.verify_entry", &error))?
    else {
        return Err(not_found());
    };

    entry.mark_verified().map_err(domain_error_response)?;
    repo.save_entry(&entry)
        .await
        .map_err(|error| storage_error("commissions.verify_entry", &error))?;

    Ok(Json(entry.into()))
}

async fn verify_batch(
    State(state): State<CommissionsState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BatchResponse>, ErrorResponse> {
    require_role(&headers, Section::Comisiones)?;

    let repo = SqlCommissionRepository::new(state.db_pool.clone());
    let batch_id = CommissionBatchId(id);

    let Some(mut batch) = repo
        .find_batch(&batch_id)
        .await
        .map_err(|error| storage_error("commissions.verify_batch", &error))?
    else {
        return Err(not_found());
    };

    let entries = repo
        .list_entries(&batch_id)
        .await
        .map_err(|error| storage_error("commissions.verify_batch", &error))?;

    batch.verify(&entries).map_err(domain_error_response)?;
    repo.save_batch(&batch)
        .await
        .map_err(|error| storage_error("commissions.verify_batch", &error))?;

    Ok(Json(batch.into()))
}
