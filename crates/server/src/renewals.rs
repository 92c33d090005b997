use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use correduria_core::audit::{AuditCategory, AuditEvent, AuditOutcome};
use correduria_core::domain::policy::PolicyId;
use correduria_core::domain::renewal::{
    compute_renewal, scheduled_send_date, RenewalConfig, RenewalConfigId, RenewalStatus,
};
use correduria_db::repositories::{
    AuditRepository, ClientRepository, PolicyRepository, RenewalRepository, RepositoryError,
    SqlAuditRepository, SqlClientRepository, SqlPolicyRepository, SqlRenewalRepository,
};
use correduria_db::DbPool;
use correduria_mailer::templates::{NoticeTemplates, RenewalNoticeContext};
use correduria_mailer::{Mailer, MailerError, OutboundEmail};

use crate::respond::{not_found, storage_error, ErrorResponse};

const DISPATCH_ACTOR: &str = "renewal-dispatcher";

#[derive(Clone)]
pub struct RenewalsState {
    db_pool: DbPool,
    dispatcher: Arc<RenewalDispatcher>,
}

pub fn router(db_pool: DbPool, mailer: Arc<dyn Mailer>) -> Result<Router, MailerError> {
    let dispatcher = Arc::new(RenewalDispatcher::new(db_pool.clone(), mailer)?);
    Ok(Router::new()
        .route("/renewals", get(list_renewals).post(create_renewal))
        .route("/renewals/preview", post(preview_renewal))
        .route("/renewals/{id}/reopen", post(reopen_renewal))
        .route("/jobs/renewals/dispatch", post(dispatch_renewals))
        .with_state(RenewalsState { db_pool, dispatcher }))
}

// ---------------------------------------------------------------------------
// Calculator endpoints

#[derive(Debug, Deserialize)]
struct PreviewRequest {
    current_premium: Decimal,
    proposed_premium: Decimal,
    renewal_date: NaiveDate,
}

#[derive(Debug, Serialize)]
struct PreviewResponse {
    difference: Decimal,
    variance_pct: Decimal,
    scheduled_send_date: NaiveDate,
}

async fn preview_renewal(Json(request): Json<PreviewRequest>) -> Json<PreviewResponse> {
    let computation = compute_renewal(
        request.current_premium,
        request.proposed_premium,
        request.renewal_date,
    );
    Json(PreviewResponse {
        difference: computation.difference,
        variance_pct: computation.variance_pct,
        scheduled_send_date: computation.scheduled_send_date,
    })
}

#[derive(Debug, Deserialize)]
struct CreateRenewalRequest {
    policy_id: String,
    proposed_premium: Decimal,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Serialize)]
struct RenewalResponse {
    id: String,
    policy_id: String,
    renewal_date: NaiveDate,
    current_premium: Decimal,
    proposed_premium: Decimal,
    difference: Decimal,
    variance_pct: Decimal,
    scheduled_send_date: NaiveDate,
    status: RenewalStatus,
    notes: Option<String>,
}

impl From<RenewalConfig> for RenewalResponse {
    fn from(config: RenewalConfig) -> Self {
        let computation = config.computation();
        Self {
            id: config.id.0,
            policy_id: config.policy_id.0,
            renewal_date: config.renewal_date,
            current_premium: config.current_premium,
            proposed_premium: config.proposed_premium,
            difference: computation.difference,
            variance_pct: computation.variance_pct,
            scheduled_send_date: computation.scheduled_send_date,
            status: config.status,
            notes: config.notes,
        }
    }
}

/// Confirms a previewed renewal: the current premium and renewal date
/// come from the policy itself, and the record lands in `programada`.
async fn create_renewal(
    State(state): State<RenewalsState>,
    Json(request): Json<CreateRenewalRequest>,
) -> Result<(StatusCode, Json<RenewalResponse>), ErrorResponse> {
    let policies = SqlPolicyRepository::new(state.db_pool.clone());
    let renewals = SqlRenewalRepository::new(state.db_pool.clone());

    let Some(policy) = policies
        .find_by_id(&PolicyId(request.policy_id.clone()))
        .await
        .map_err(|error| storage_error("renewals.create", &error))?
    else {
        return Err(not_found());
    };

    let now = Utc::now();
    let config = RenewalConfig {
        id: RenewalConfigId(Uuid::new_v4().to_string()),
        policy_id: policy.id.clone(),
        renewal_date: policy.end_date,
        current_premium: policy.annual_premium,
        proposed_premium: request.proposed_premium,
        scheduled_send_date: scheduled_send_date(policy.end_date),
        status: RenewalStatus::Programada,
        notes: request.notes,
        sent_at: None,
        failed_at: None,
        created_at: now,
        updated_at: now,
    };

    renewals.upsert(&config).await.map_err(|error| storage_error("renewals.create", &error))?;
    Ok((StatusCode::CREATED, Json(config.into())))
}

async fn list_renewals(
    State(state): State<RenewalsState>,
) -> Result<Json<Vec<RenewalResponse>>, ErrorResponse> {
    let renewals = SqlRenewalRepository::new(state.db_pool.clone());
    let configs =
        renewals.list().await.map_err(|error| storage_error("renewals.list", &error))?;
    Ok(Json(configs.into_iter().map(RenewalResponse::from).collect()))
}

async fn reopen_renewal(
    State(state): State<RenewalsState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ErrorResponse> {
    let renewals = SqlRenewalRepository::new(state.db_pool.clone());
    renewals
        .reopen(&RenewalConfigId(id))
        .await
        .map_err(|error| storage_error("renewals.reopen", &error))?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Dispatch engine

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub processed: usize,
    pub sent: usize,
    pub errored: usize,
}

/// Processes the renewal configs whose scheduled send date is the given
/// day, one record at a time. A record without a client e-mail, or whose
/// send/update fails, is marked `error` and the run continues; nothing
/// here retries or re-queues.
pub struct RenewalDispatcher {
    renewals: SqlRenewalRepository,
    policies: SqlPolicyRepository,
    clients: SqlClientRepository,
    audits: SqlAuditRepository,
    mailer: Arc<dyn Mailer>,
    templates: NoticeTemplates,
}

impl RenewalDispatcher {
    pub fn new(db_pool: DbPool, mailer: Arc<dyn Mailer>) -> Result<Self, MailerError> {
        Ok(Self {
            renewals: SqlRenewalRepository::new(db_pool.clone()),
            policies: SqlPolicyRepository::new(db_pool.clone()),
            clients: SqlClientRepository::new(db_pool.clone()),
            audits: SqlAuditRepository::new(db_pool),
            mailer,
            templates: NoticeTemplates::new()?,
        })
    }

    pub async fn run(&self, today: NaiveDate) -> Result<DispatchSummary, RepositoryError> {
        let due = self.renewals.list_due_on(today).await?;
        let correlation_id = format!("renewal-dispatch-{today}");

        let mut sent = 0usize;
        let mut errored = 0usize;

        for config in &due {
            match self.process(config, &correlation_id).await {
                Ok(()) => sent += 1,
                Err(note) => {
                    errored += 1;
                    if let Err(update_error) =
                        self.renewals.mark_error(&config.id, &note, Utc::now()).await
                    {
                        error!(
                            event_name = "renewal.dispatch.mark_error_failed",
                            correlation_id = %correlation_id,
                            renewal_id = %config.id.0,
                            error = %update_error,
                            "could not record dispatch failure on the renewal"
                        );
                    }
                    self.audit(config, &correlation_id, AuditOutcome::Failed, &note).await;
                }
            }
        }

        info!(
            event_name = "renewal.dispatch.completed",
            correlation_id = %correlation_id,
            processed = due.len(),
            sent,
            errored,
            "renewal dispatch run finished"
        );

        Ok(DispatchSummary { processed: due.len(), sent, errored })
    }

    async fn process(&self, config: &RenewalConfig, correlation_id: &str) -> Result<(), String> {
        let policy = self
            .policies
            .find_by_id(&config.policy_id)
            .await
            .map_err(|error| format!("no se pudo cargar la póliza: {error}"))?
            .ok_or_else(|| format!("la póliza {} no existe", config.policy_id.0))?;

        let client = self
            .clients
            .find_by_id(&policy.client_id)
            .await
            .map_err(|error| format!("no se pudo cargar el cliente: {error}"))?
            .ok_or_else(|| format!("el cliente {} no existe", policy.client_id.0))?;

        let Some(recipient) = client.email.clone() else {
            return Err("el cliente no tiene correo de contacto".to_string());
        };

        let computation = config.computation();
        let html = self
            .templates
            .render_renewal_notice(&RenewalNoticeContext {
                client_name: client.full_name.clone(),
                policy_number: policy.policy_number.clone(),
                insurer: policy.insurer.clone(),
                product: policy.product.clone(),
                renewal_date: config.renewal_date.to_string(),
                current_premium: config.current_premium.round_dp(2).to_string(),
                proposed_premium: config.proposed_premium.round_dp(2).to_string(),
                variance_pct: format_signed_pct(computation.variance_pct),
            })
            .map_err(|error| format!("no se pudo componer el aviso: {error}"))?;

        let outbound = OutboundEmail {
            to: recipient,
            subject: self.templates.renewal_subject(&policy.policy_number),
            html: Some(html),
            text: None,
            from: None,
        };
        self.mailer
            .send(&outbound)
            .await
            .map_err(|error| format!("fallo de envío: {error}"))?;

        self.renewals
            .mark_sent(&config.id, Utc::now())
            .await
            .map_err(|error| format!("no se pudo marcar como enviada: {error}"))?;

        self.audit(config, correlation_id, AuditOutcome::Success, &policy.policy_number).await;
        Ok(())
    }

    async fn audit(
        &self,
        config: &RenewalConfig,
        correlation_id: &str,
        outcome: AuditOutcome,
        detail: &str,
    ) {
        let event_type = match outcome {
            AuditOutcome::Success => "renewal.notice_sent",
            _ => "renewal.notice_failed",
        };
        let event = AuditEvent::new(
            Some(config.id.0.clone()),
            correlation_id,
            event_type,
            AuditCategory::Renewal,
            DISPATCH_ACTOR,
            outcome,
        )
        .with_metadata("detail", detail);

        if let Err(audit_error) = self.audits.append(&event).await {
            error!(
                event_name = "renewal.dispatch.audit_failed",
                correlation_id = %correlation_id,
                renewal_id = %config.id.0,
                error = %audit_error,
                "could not persist the audit event"
            );
        }
    }
}

fn format_signed_pct(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    if rounded.is_sign_negative() {
        rounded.to_string()
    } else {
        format!("+{rounded}")
    }
}

#[derive(Debug, Deserialize)]
struct DispatchQuery {
    /// Defaults to today (UTC). Pinned explicitly by tests and by the
    /// CLI trigger.
    date: Option<NaiveDate>,
}

async fn dispatch_renewals(
    State(state): State<RenewalsState>,
    Query(query): Query<DispatchQuery>,
) -> Result<Json<DispatchSummary>, ErrorResponse> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let summary = state
        .dispatcher
        .run(date)
        .await
        .map_err(|error| storage_error("renewals.dispatch", &error))?;
    Ok(Json(summary))
}
