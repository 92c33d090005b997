use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rust_decimal::Decimal;

use correduria_core::domain::client::{AdvisorId, Client, ClientId};
use correduria_core::domain::policy::{PaymentFrequency, Policy, PolicyId, PolicyStatus};
use correduria_db::repositories::{
    ClientRepository, PolicyRepository, SqlClientRepository, SqlPolicyRepository,
};
use correduria_db::DbPool;

use crate::respond::{bad_request, not_found, storage_error, ErrorResponse};

#[derive(Clone)]
pub struct ClientsState {
    db_pool: DbPool,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new()
        .route("/clients", get(list_clients).post(create_client))
        .route("/clients/{id}", put(update_client).delete(delete_client))
        .route("/clients/{id}/policies", get(list_client_policies))
        .route("/clients/bulk-delete", post(bulk_delete_clients))
        .route("/policies", post(create_policy))
        .with_state(ClientsState { db_pool })
}

#[derive(Debug, Deserialize)]
struct ClientPayload {
    full_name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    birth_date: Option<NaiveDate>,
    #[serde(default)]
    advisor_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ClientResponse {
    id: String,
    full_name: String,
    email: Option<String>,
    phone: Option<String>,
    birth_date: Option<NaiveDate>,
    advisor_id: Option<String>,
}

impl From<Client> for ClientResponse {
    fn from(client: Client) -> Self {
        Self {
            id: client.id.0,
            full_name: client.full_name,
            email: client.email,
            phone: client.phone,
            birth_date: client.birth_date,
            advisor_id: client.advisor_id.map(|id| id.0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BulkDeleteRequest {
    ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct BulkDeleteRowResponse {
    id: String,
    deleted: bool,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct BulkDeleteResponse {
    requested: usize,
    deleted: usize,
    failed: usize,
    rows: Vec<BulkDeleteRowResponse>,
}

async fn list_clients(
    State(state): State<ClientsState>,
) -> Result<Json<Vec<ClientResponse>>, ErrorResponse> {
    let repo = SqlClientRepository::new(state.db_pool.clone());
    let clients = repo.list().await.map_err(|error| storage_error("clients.list", &error))?;
    Ok(Json(clients.into_iter().map(ClientResponse::from).collect()))
}

async fn create_client(
    State(state): State<ClientsState>,
    Json(payload): Json<ClientPayload>,
) -> Result<(StatusCode, Json<ClientResponse>), ErrorResponse> {
    let repo = SqlClientRepository::new(state.db_pool.clone());
    let now = Utc::now();
    let client = Client {
        id: ClientId(Uuid::new_v4().to_string()),
        full_name: payload.full_name,
        email: payload.email,
        phone: payload.phone,
        birth_date: payload.birth_date,
        advisor_id: payload.advisor_id.map(AdvisorId),
        created_at: now,
        updated_at: now,
    };

    repo.insert(&client).await.map_err(|error| storage_error("clients.create", &error))?;
    Ok((StatusCode::CREATED, Json(client.into())))
}

async fn update_client(
    State(state): State<ClientsState>,
    Path(id): Path<String>,
    Json(payload): Json<ClientPayload>,
) -> Result<Json<ClientResponse>, ErrorResponse> {
    let repo = SqlClientRepository::new(state.db_pool.clone());
    let id = ClientId(id);

    let Some(mut client) =
        repo.find_by_id(&id).await.map_err(|error| storage_error("clients.update", &error))?
    else {
        return Err(not_found());
    };

    client.full_name = payload.full_name;
    client.email = payload.email;
    client.phone = payload.phone;
    client.birth_date = payload.birth_date;
    client.advisor_id = payload.advisor_id.map(AdvisorId);
    client.updated_at = Utc::now();

    repo.update(&client).await.map_err(|error| storage_error("clients.update", &error))?;
    Ok(Json(client.into()))
}

async fn delete_client(
    State(state): State<ClientsState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ErrorResponse> {
    let repo = SqlClientRepository::new(state.db_pool.clone());
    repo.delete(&ClientId(id))
        .await
        .map_err(|error| storage_error("clients.delete", &error))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct PolicyPayload {
    client_id: String,
    insurer: String,
    product: String,
    policy_number: String,
    annual_premium: Decimal,
    #[serde(default)]
    frequency: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[derive(Debug, Serialize)]
struct PolicyResponse {
    id: String,
    client_id: String,
    insurer: String,
    product: String,
    policy_number: String,
    annual_premium: Decimal,
    installment_amount: Decimal,
    frequency: Option<&'static str>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: PolicyStatus,
}

impl From<Policy> for PolicyResponse {
    fn from(policy: Policy) -> Self {
        let installment_amount = policy.installment_amount();
        Self {
            id: policy.id.0,
            client_id: policy.client_id.0,
            insurer: policy.insurer,
            product: policy.product,
            policy_number: policy.policy_number,
            annual_premium: policy.annual_premium,
            installment_amount,
            frequency: policy.frequency.map(PaymentFrequency::as_str),
            start_date: policy.start_date,
            end_date: policy.end_date,
            status: policy.status,
        }
    }
}

async fn create_policy(
    State(state): State<ClientsState>,
    Json(payload): Json<PolicyPayload>,
) -> Result<(StatusCode, Json<PolicyResponse>), ErrorResponse> {
    let frequency = match payload.frequency.as_deref() {
        Some(raw) => Some(raw.parse::<PaymentFrequency>().map_err(bad_request)?),
        None => None,
    };
    if payload.annual_premium < Decimal::ZERO {
        return Err(bad_request("annual_premium must be non-negative"));
    }

    let policy = Policy {
        id: PolicyId(Uuid::new_v4().to_string()),
        client_id: ClientId(payload.client_id),
        insurer: payload.insurer,
        product: payload.product,
        policy_number: payload.policy_number,
        annual_premium: payload.annual_premium,
        frequency,
        start_date: payload.start_date,
        end_date: payload.end_date,
        status: PolicyStatus::Activa,
    };

    SqlPolicyRepository::new(state.db_pool.clone())
        .insert(&policy)
        .await
        .map_err(|error| storage_error("policies.create", &error))?;
    Ok((StatusCode::CREATED, Json(policy.into())))
}

async fn list_client_policies(
    State(state): State<ClientsState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PolicyResponse>>, ErrorResponse> {
    let policies = SqlPolicyRepository::new(state.db_pool.clone())
        .list_by_client(&ClientId(id))
        .await
        .map_err(|error| storage_error("policies.list", &error))?;
    Ok(Json(policies.into_iter().map(PolicyResponse::from).collect()))
}

/// One independent delete per requested id. There is deliberately no
/// transaction across the set: a failing row reports its own error and
/// the remaining rows still go through.
async fn bulk_delete_clients(
    State(state): State<ClientsState>,
    Json(request): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, ErrorResponse> {
    let repo = SqlClientRepository::new(state.db_pool.clone());
    let ids: Vec<ClientId> = request.ids.into_iter().map(ClientId).collect();

    let outcomes = repo.delete_many(&ids).await;
    let deleted = outcomes.iter().filter(|outcome| outcome.deleted).count();

    Ok(Json(BulkDeleteResponse {
        requested: outcomes.len(),
        deleted,
        failed: outcomes.len() - deleted,
        rows: outcomes
            .into_iter()
            .map(|outcome| BulkDeleteRowResponse {
                id: outcome.id,
                deleted: outcome.deleted,
                error: outcome.error,
            })
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use tower::ServiceExt;

    use correduria_core::domain::client::{Client, ClientId};
    use correduria_core::domain::policy::{Policy, PolicyId, PolicyStatus};
    use correduria_db::repositories::{
        ClientRepository, PolicyRepository, SqlClientRepository, SqlPolicyRepository,
    };
    use correduria_db::{connect_with_settings, migrations};

    use super::router;

    async fn pool() -> correduria_db::DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        pool
    }

    fn client(id: &str) -> Client {
        Client {
            id: ClientId(id.to_string()),
            full_name: format!("Cliente {id}"),
            email: None,
            phone: None,
            birth_date: None,
            advisor_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_then_list_round_trips_over_http() {
        let pool = pool().await;
        let app = router(pool.clone());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/clients")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"full_name": "Laura Méndez", "email": "laura@example.com", "birth_date": "1985-08-07"}"#,
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(Request::builder().uri("/clients").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes =
            axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
        let listed: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(listed.as_array().map(Vec::len), Some(1));
        assert_eq!(listed[0]["full_name"], "Laura Méndez");

        pool.close().await;
    }

    #[tokio::test]
    async fn policy_creation_reports_the_installment_amount() {
        let pool = pool().await;
        SqlClientRepository::new(pool.clone()).insert(&client("cli-1")).await.expect("insert");

        let response = router(pool.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/policies")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"client_id": "cli-1", "insurer": "Sura", "product": "Hogar",
                            "policy_number": "POL-2026-0007", "annual_premium": "1200.00",
                            "frequency": "trimestral", "start_date": "2026-02-01",
                            "end_date": "2027-02-01"}"#,
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes =
            axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
        let created: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(created["installment_amount"], "300.00");
        assert_eq!(created["status"], "activa");

        pool.close().await;
    }

    #[tokio::test]
    async fn unknown_frequency_codes_are_rejected() {
        let pool = pool().await;
        SqlClientRepository::new(pool.clone()).insert(&client("cli-1")).await.expect("insert");

        let response = router(pool.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/policies")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"client_id": "cli-1", "insurer": "Sura", "product": "Hogar",
                            "policy_number": "POL-2026-0008", "annual_premium": "1200.00",
                            "frequency": "quincenal", "start_date": "2026-02-01",
                            "end_date": "2027-02-01"}"#,
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        pool.close().await;
    }

    #[tokio::test]
    async fn bulk_delete_reports_per_row_outcomes_without_rollback() {
        let pool = pool().await;
        let clients = SqlClientRepository::new(pool.clone());
        for id in ["cli-1", "cli-2", "cli-3"] {
            clients.insert(&client(id)).await.expect("insert");
        }

        // cli-2 is referenced by a policy and cannot be deleted.
        SqlPolicyRepository::new(pool.clone())
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

        let response = router(pool.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/clients/bulk-delete")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"ids": ["cli-1", "cli-2", "cli-3"]}"#))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes =
            axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
        let summary: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(summary["requested"], 3);
        assert_eq!(summary["deleted"], 2);
        assert_eq!(summary["failed"], 1);
        assert_eq!(summary["rows"][1]["deleted"], false);

        let remaining = clients.list().await.expect("list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id.0, "cli-2");

        pool.close().await;
    }
}
