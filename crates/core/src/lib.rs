//! Core domain logic for the correduria back-office service.
//!
//! This crate is deliberately free of I/O: everything here is either a
//! domain type with its status machine, a pure money/date computation, or
//! the configuration and error vocabulary shared by the other crates.

pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;

pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use domain::client::{Advisor, AdvisorId, Client, ClientId, Role, Section};
pub use domain::commission::{
    BatchStatus, CommissionBatch, CommissionBatchId, CommissionEntry, CommissionEntryId,
    DISCREPANCY_TOLERANCE,
};
pub use domain::partner::{DiscountCode, DiscountCodeId, Partner, PartnerId};
pub use domain::policy::{PaymentFrequency, Policy, PolicyId, PolicyStatus};
pub use domain::renewal::{RenewalComputation, RenewalConfig, RenewalConfigId, RenewalStatus};
pub use domain::sales::{OpportunityStage, SalesOpportunity, SalesOpportunityId};
pub use errors::{
    classify_storage_error, ApplicationError, DomainError, InterfaceError, StorageErrorKind,
};
