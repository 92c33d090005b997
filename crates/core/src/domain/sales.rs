use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::client::ClientId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SalesOpportunityId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStage {
    Nueva,
    Contactado,
    Propuesta,
    Ganada,
    Perdida,
}

impl OpportunityStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nueva => "nueva",
            Self::Contactado => "contactado",
            Self::Propuesta => "propuesta",
            Self::Ganada => "ganada",
            Self::Perdida => "perdida",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ganada | Self::Perdida)
    }
}

impl std::str::FromStr for OpportunityStage {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "nueva" => Ok(Self::Nueva),
            "contactado" => Ok(Self::Contactado),
            "propuesta" => Ok(Self::Propuesta),
            "ganada" => Ok(Self::Ganada),
            "perdida" => Ok(Self::Perdida),
            other => Err(format!("unknown opportunity stage `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SalesOpportunity {
    pub id: SalesOpportunityId,
    pub client_id: ClientId,
    pub product_interest: String,
    pub estimated_premium: Option<Decimal>,
    pub stage: OpportunityStage,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SalesOpportunity {
    /// Pipeline moves forward one stage at a time; a non-terminal
    /// opportunity can be dropped to `Perdida` from anywhere.
    pub fn can_transition_to(&self, next: OpportunityStage) -> bool {
        if self.stage.is_terminal() {
            return false;
        }

        matches!(
            (self.stage, next),
            (OpportunityStage::Nueva, OpportunityStage::Contactado)
                | (OpportunityStage::Contactado, OpportunityStage::Propuesta)
                | (OpportunityStage::Propuesta, OpportunityStage::Ganada)
                | (_, OpportunityStage::Perdida)
        )
    }

    pub fn transition_to(&mut self, next: OpportunityStage) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.stage = next;
            return Ok(());
        }

        Err(DomainError::InvalidStageTransition { from: self.stage, to: next })
    }
}
