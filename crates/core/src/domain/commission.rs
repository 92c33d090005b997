use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Absolute tolerance, in currency units, between the expected and the
/// reported commission amount before an entry counts as discrepant.
/// A difference of exactly the tolerance is still accepted.
pub const DISCREPANCY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommissionBatchId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommissionEntryId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pendiente,
    Verificado,
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pendiente => "pendiente",
            Self::Verificado => "verificado",
        }
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pendiente" => Ok(Self::Pendiente),
            "verificado" => Ok(Self::Verificado),
            other => Err(format!("unknown batch status `{other}`")),
        }
    }
}

/// One imported commission statement from an insurer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommissionBatch {
    pub id: CommissionBatchId,
    pub insurer: String,
    pub period: String,
    pub currency: String,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl CommissionBatch {
    /// A batch only moves forward, and only when every entry has been
    /// individually verified.
    pub fn verify(&mut self, entries: &[CommissionEntry]) -> Result<(), DomainError> {
        if self.status == BatchStatus::Verificado {
            return Err(DomainError::InvalidBatchTransition {
                from: self.status,
                to: BatchStatus::Verificado,
            });
        }

        if let Some(pending) = entries.iter().find(|entry| !entry.verified) {
            return Err(DomainError::InvariantViolation(format!(
                "entry {} is not verified yet",
                pending.id.0
            )));
        }

        self.status = BatchStatus::Verificado;
        self.verified_at = Some(Utc::now());
        Ok(())
    }
}

/// One line item of a commission batch: what the insurer reported for a
/// policy against the agreed rate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommissionEntry {
    pub id: CommissionEntryId,
    pub batch_id: CommissionBatchId,
    pub policy_number: String,
    pub premium: Decimal,
    pub rate_pct: Decimal,
    pub reported_amount: Decimal,
    pub verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
}

impl CommissionEntry {
    pub fn expected_amount(&self) -> Decimal {
        self.premium * self.rate_pct / Decimal::ONE_HUNDRED
    }

    /// Discrepant when the reported amount strays from the expected one
    /// by strictly more than the tolerance.
    pub fn has_discrepancy(&self) -> bool {
        has_discrepancy(self.premium, self.rate_pct, self.reported_amount)
    }

    /// An entry with an unresolved discrepancy cannot be marked verified;
    /// it has to be reconciled manually first.
    pub fn mark_verified(&mut self) -> Result<(), DomainError> {
        if self.has_discrepancy() {
            return Err(DomainError::InvariantViolation(format!(
                "entry {} has a commission discrepancy pending reconciliation",
                self.id.0
            )));
        }

        self.verified = true;
        self.verified_at = Some(Utc::now());
        Ok(())
    }
}

pub fn has_discrepancy(premium: Decimal, rate_pct: Decimal, reported: Decimal) -> bool {
    let expected = premium * rate_pct / Decimal::ONE_HUNDRED;
    (expected - reported).abs() > DISCREPANCY_TOLERANCE
}
