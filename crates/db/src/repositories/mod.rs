use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use correduria_core::audit::AuditEvent;
use correduria_core::domain::client::{Client, ClientId};
use correduria_core::domain::commission::{
    CommissionBatch, CommissionBatchId, CommissionEntry, CommissionEntryId,
};
use correduria_core::domain::partner::{DiscountCode, Partner};
use correduria_core::domain::policy::{Policy, PolicyId};
use correduria_core::domain::renewal::{RenewalConfig, RenewalConfigId};
use correduria_core::domain::sales::{SalesOpportunity, SalesOpportunityId};

pub mod audit;
pub mod client;
pub mod commission;
pub mod partner;
pub mod policy;
pub mod renewal;
pub mod sales;

pub use audit::SqlAuditRepository;
pub use client::SqlClientRepository;
pub use commission::SqlCommissionRepository;
pub use partner::SqlPartnerRepository;
pub use policy::SqlPolicyRepository;
pub use renewal::SqlRenewalRepository;
pub use sales::SqlSalesRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Outcome of one row inside a bulk delete. The bulk operation has no
/// atomicity across rows: each row either went through or kept its own
/// error, and the caller reports them individually.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowDeleteOutcome {
    pub id: String,
    pub deleted: bool,
    pub error: Option<String>,
}

pub(crate) fn decode_decimal(raw: &str, column: &str) -> Result<Decimal, RepositoryError> {
    raw.parse::<Decimal>()
        .map_err(|err| RepositoryError::Decode(format!("column `{column}`: {err}")))
}

pub(crate) fn decode_opt_decimal(
    raw: Option<String>,
    column: &str,
) -> Result<Option<Decimal>, RepositoryError> {
    raw.map(|value| decode_decimal(&value, column)).transpose()
}

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn insert(&self, client: &Client) -> Result<(), RepositoryError>;
    async fn update(&self, client: &Client) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &ClientId) -> Result<Option<Client>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Client>, RepositoryError>;
    async fn list_birthdays_on(&self, today: NaiveDate) -> Result<Vec<Client>, RepositoryError>;
    async fn delete(&self, id: &ClientId) -> Result<(), RepositoryError>;

    /// Issues one independent delete per id. A failing row records its
    /// error and does not stop the remaining rows.
    async fn delete_many(&self, ids: &[ClientId]) -> Vec<RowDeleteOutcome> {
        let mut outcomes = Vec::with_capacity(ids.len());
        for id in ids {
            match self.delete(id).await {
                Ok(()) => {
                    outcomes.push(RowDeleteOutcome { id: id.0.clone(), deleted: true, error: None });
                }
                Err(error) => outcomes.push(RowDeleteOutcome {
                    id: id.0.clone(),
                    deleted: false,
                    error: Some(error.to_string()),
                }),
            }
        }
        outcomes
    }
}

#[async_trait]
pub trait PolicyRepository: Send + Sync {
    async fn insert(&self, policy: &Policy) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &PolicyId) -> Result<Option<Policy>, RepositoryError>;
    async fn list_by_client(&self, client_id: &ClientId) -> Result<Vec<Policy>, RepositoryError>;
}

#[async_trait]
pub trait RenewalRepository: Send + Sync {
    /// Insert or refresh the renewal cycle of a policy. Re-entering a
    /// proposed premium puts the record back into `programada`.
    async fn upsert(&self, config: &RenewalConfig) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &RenewalConfigId)
        -> Result<Option<RenewalConfig>, RepositoryError>;
    async fn list(&self) -> Result<Vec<RenewalConfig>, RepositoryError>;
    /// Records whose scheduled send date is `date`, still `programada`,
    /// and never sent. This filter is the only duplicate-send guard.
    async fn list_due_on(&self, date: NaiveDate) -> Result<Vec<RenewalConfig>, RepositoryError>;
    async fn mark_sent(
        &self,
        id: &RenewalConfigId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
    async fn mark_error(
        &self,
        id: &RenewalConfigId,
        note: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
    async fn reopen(&self, id: &RenewalConfigId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CommissionRepository: Send + Sync {
    async fn create_batch(
        &self,
        batch: &CommissionBatch,
        entries: &[CommissionEntry],
    ) -> Result<(), RepositoryError>;
    async fn find_batch(
        &self,
        id: &CommissionBatchId,
    ) -> Result<Option<CommissionBatch>, RepositoryError>;
    async fn list_batches(&self) -> Result<Vec<CommissionBatch>, RepositoryError>;
    async fn list_entries(
        &self,
        batch_id: &CommissionBatchId,
    ) -> Result<Vec<CommissionEntry>, RepositoryError>;
    async fn find_entry(
        &self,
        id: &CommissionEntryId,
    ) -> Result<Option<CommissionEntry>, RepositoryError>;
    async fn save_entry(&self, entry: &CommissionEntry) -> Result<(), RepositoryError>;
    async fn save_batch(&self, batch: &CommissionBatch) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SalesRepository: Send + Sync {
    async fn insert(&self, opportunity: &SalesOpportunity) -> Result<(), RepositoryError>;
    async fn find_by_id(
        &self,
        id: &SalesOpportunityId,
    ) -> Result<Option<SalesOpportunity>, RepositoryError>;
    async fn save(&self, opportunity: &SalesOpportunity) -> Result<(), RepositoryError>;
    async fn list(&self) -> Result<Vec<SalesOpportunity>, RepositoryError>;
}

#[async_trait]
pub trait PartnerRepository: Send + Sync {
    async fn insert_partner(&self, partner: &Partner) -> Result<(), RepositoryError>;
    async fn list_partners(&self) -> Result<Vec<Partner>, RepositoryError>;
    async fn insert_code(&self, code: &DiscountCode) -> Result<(), RepositoryError>;
    async fn find_code(&self, code: &str) -> Result<Option<DiscountCode>, RepositoryError>;
    async fn save_code(&self, code: &DiscountCode) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, event: &AuditEvent) -> Result<(), RepositoryError>;
    async fn recent(&self, limit: u32) -> Result<Vec<AuditEvent>, RepositoryError>;
}
