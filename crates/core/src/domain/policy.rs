use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::client::ClientId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Activa,
    Vencida,
    Cancelada,
}

impl PolicyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Activa => "activa",
            Self::Vencida => "vencida",
            Self::Cancelada => "cancelada",
        }
    }
}

impl std::str::FromStr for PolicyStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "activa" => Ok(Self::Activa),
            "vencida" => Ok(Self::Vencida),
            "cancelada" => Ok(Self::Cancelada),
            other => Err(format!("unknown policy status `{other}`")),
        }
    }
}

/// Payment frequencies and their fixed installment divisors.
/// `Mensual` is the legacy code some imported policies still carry; it
/// behaves as twelve monthly installments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFrequency {
    Anual,
    Semestral,
    Trimestral,
    Bimensual,
    Mensual10Cuotas,
    Mensual12Cuotas,
    Mensual,
}

impl PaymentFrequency {
    pub fn divisor(self) -> u32 {
        match self {
            Self::Anual => 1,
            Self::Semestral => 2,
            Self::Trimestral => 4,
            Self::Bimensual => 6,
            Self::Mensual10Cuotas => 10,
            Self::Mensual12Cuotas | Self::Mensual => 12,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anual => "anual",
            Self::Semestral => "semestral",
            Self::Trimestral => "trimestral",
            Self::Bimensual => "bimensual",
            Self::Mensual10Cuotas => "mensual_10_cuotas",
            Self::Mensual12Cuotas => "mensual_12_cuotas",
            Self::Mensual => "mensual",
        }
    }
}

impl std::str::FromStr for PaymentFrequency {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "anual" => Ok(Self::Anual),
            "semestral" => Ok(Self::Semestral),
            "trimestral" => Ok(Self::Trimestral),
            "bimensual" => Ok(Self::Bimensual),
            "mensual_10_cuotas" => Ok(Self::Mensual10Cuotas),
            "mensual_12_cuotas" => Ok(Self::Mensual12Cuotas),
            "mensual" => Ok(Self::Mensual),
            other => Err(format!("unknown payment frequency `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub client_id: ClientId,
    pub insurer: String,
    pub product: String,
    pub policy_number: String,
    pub annual_premium: Decimal,
    pub frequency: Option<PaymentFrequency>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PolicyStatus,
}

impl Policy {
    /// Per-installment amount. Policies imported without a recognized
    /// frequency fall back to divisor 1 and pay the full annual premium
    /// in one installment.
    pub fn installment_amount(&self) -> Decimal {
        let divisor = self.frequency.map(PaymentFrequency::divisor).unwrap_or(1);
        self.annual_premium / Decimal::from(divisor)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{PaymentFrequency, Policy, PolicyId, PolicyStatus};
    use crate::domain::client::ClientId;

    fn policy(frequency: Option<PaymentFrequency>, annual: Decimal) -> Policy {
        Policy {
            id: PolicyId("pol-1".to_string()),
            client_id: ClientId("cli-1".to_string()),
            insurer: "Mapfre".to_string(),
            product: "Auto Plus".to_string(),
            policy_number: "POL-2026-0001".to_string(),
            annual_premium: annual,
            frequency,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("date"),
            end_date: NaiveDate::from_ymd_opt(2027, 1, 1).expect("date"),
            status: PolicyStatus::Activa,
        }
    }

    #[test]
    fn divisor_table_matches_frequency_codes() {
        assert_eq!(PaymentFrequency::Anual.divisor(), 1);
        assert_eq!(PaymentFrequency::Semestral.divisor(), 2);
        assert_eq!(PaymentFrequency::Trimestral.divisor(), 4);
        assert_eq!(PaymentFrequency::Bimensual.divisor(), 6);
        assert_eq!(PaymentFrequency::Mensual10Cuotas.divisor(), 10);
        assert_eq!(PaymentFrequency::Mensual12Cuotas.divisor(), 12);
        // legacy alias
        assert_eq!(PaymentFrequency::Mensual.divisor(), 12);
    }

    #[test]
    fn installment_divides_annual_premium() {
        let semestral = policy(Some(PaymentFrequency::Semestral), Decimal::new(120_000, 2));
        assert_eq!(semestral.installment_amount(), Decimal::new(60_000, 2));

        let diez_cuotas = policy(Some(PaymentFrequency::Mensual10Cuotas), Decimal::new(100_000, 2));
        assert_eq!(diez_cuotas.installment_amount(), Decimal::new(10_000, 2));
    }

    #[test]
    fn missing_frequency_falls_back_to_full_annual_amount() {
        let sin_frecuencia = policy(None, Decimal::new(84_750, 2));
        assert_eq!(sin_frecuencia.installment_amount(), Decimal::new(84_750, 2));
    }

    #[test]
    fn unknown_frequency_code_is_rejected_at_parse_time() {
        assert!("quincenal".parse::<PaymentFrequency>().is_err());
        assert_eq!("mensual".parse::<PaymentFrequency>(), Ok(PaymentFrequency::Mensual));
    }

    #[test]
    fn policy_status_round_trips_through_str() {
        for status in [PolicyStatus::Activa, PolicyStatus::Vencida, PolicyStatus::Cancelada] {
            assert_eq!(status.as_str().parse::<PolicyStatus>(), Ok(status));
        }
    }
}
