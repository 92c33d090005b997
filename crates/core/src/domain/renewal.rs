use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::policy::PolicyId;
use crate::errors::DomainError;

/// Notices go out this many calendar days before the renewal date.
pub const NOTICE_LEAD_DAYS: i64 = 30;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenewalConfigId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalStatus {
    Programada,
    Enviada,
    Error,
}

impl RenewalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Programada => "programada",
            Self::Enviada => "enviada",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for RenewalStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "programada" => Ok(Self::Programada),
            "enviada" => Ok(Self::Enviada),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown renewal status `{other}`")),
        }
    }
}

/// Pure output of the renewal calculator: what the operator previews
/// before confirming a renewal config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalComputation {
    pub difference: Decimal,
    pub variance_pct: Decimal,
    pub scheduled_send_date: NaiveDate,
}

/// Signed premium difference and percentage variance. The variance is
/// defined only for a positive current premium; a zero current premium
/// yields 0 rather than a division error.
pub fn compute_variance(current: Decimal, proposed: Decimal) -> (Decimal, Decimal) {
    let difference = proposed - current;
    let variance_pct = if current > Decimal::ZERO {
        difference / current * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };
    (difference, variance_pct)
}

pub fn scheduled_send_date(renewal_date: NaiveDate) -> NaiveDate {
    renewal_date - Duration::days(NOTICE_LEAD_DAYS)
}

pub fn compute_renewal(
    current: Decimal,
    proposed: Decimal,
    renewal_date: NaiveDate,
) -> RenewalComputation {
    let (difference, variance_pct) = compute_variance(current, proposed);
    RenewalComputation {
        difference,
        variance_pct,
        scheduled_send_date: scheduled_send_date(renewal_date),
    }
}

/// One renewal cycle of an active policy: the proposed premium, the
/// computed variance, and the notification lifecycle around it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenewalConfig {
    pub id: RenewalConfigId,
    pub policy_id: PolicyId,
    pub renewal_date: NaiveDate,
    pub current_premium: Decimal,
    pub proposed_premium: Decimal,
    pub scheduled_send_date: NaiveDate,
    pub status: RenewalStatus,
    pub notes: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RenewalConfig {
    pub fn computation(&self) -> RenewalComputation {
        compute_renewal(self.current_premium, self.proposed_premium, self.renewal_date)
    }

    /// `Enviada` is terminal except for a manual reopen; `Error` records
    /// also only leave their state through a manual reopen.
    pub fn can_transition_to(&self, next: RenewalStatus) -> bool {
        matches!(
            (self.status, next),
            (RenewalStatus::Programada, RenewalStatus::Enviada)
                | (RenewalStatus::Programada, RenewalStatus::Error)
                | (RenewalStatus::Error, RenewalStatus::Programada)
                | (RenewalStatus::Enviada, RenewalStatus::Programada)
        )
    }

    pub fn transition_to(&mut self, next: RenewalStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidRenewalTransition { from: self.status, to: next })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use super::{
        compute_renewal, compute_variance, scheduled_send_date, RenewalConfig, RenewalConfigId,
        RenewalStatus,
    };
    use crate::domain::policy::PolicyId;
    use crate::errors::DomainError;

    fn config(status: RenewalStatus) -> RenewalConfig {
        let renewal_date = NaiveDate::from_ymd_opt(2026, 9, 15).expect("date");
        RenewalConfig {
            id: RenewalConfigId("ren-1".to_string()),
            policy_id: PolicyId("pol-1".to_string()),
            renewal_date,
            current_premium: Decimal::new(100_000, 2),
            proposed_premium: Decimal::new(112_500, 2),
            scheduled_send_date: scheduled_send_date(renewal_date),
            status,
            notes: None,
            sent_at: None,
            failed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn variance_is_signed_percentage_of_current_premium() {
        let (difference, variance) =
            compute_variance(Decimal::new(100_000, 2), Decimal::new(112_500, 2));
        assert_eq!(difference, Decimal::new(12_500, 2));
        assert_eq!(variance, Decimal::new(1250, 2));

        let (difference, variance) =
            compute_variance(Decimal::new(100_000, 2), Decimal::new(80_000, 2));
        assert!(difference < Decimal::ZERO);
        assert_eq!(variance, Decimal::new(-2000, 2));
    }

    #[test]
    fn variance_sign_always_matches_difference_sign() {
        let cases = [(150u32, 175u32), (175, 150), (90, 90)];
        for (current, proposed) in cases {
            let (difference, variance) =
                compute_variance(Decimal::from(current), Decimal::from(proposed));
            assert_eq!(difference.is_sign_negative(), variance.is_sign_negative());
            assert_eq!(difference.is_zero(), variance.is_zero());
        }
    }

    #[test]
    fn zero_current_premium_yields_zero_variance() {
        let (difference, variance) = compute_variance(Decimal::ZERO, Decimal::new(50_000, 2));
        assert_eq!(difference, Decimal::new(50_000, 2));
        assert_eq!(variance, Decimal::ZERO);
    }

    #[test]
    fn send_date_is_thirty_days_before_renewal_across_year_boundary() {
        let renewal = NaiveDate::from_ymd_opt(2024, 1, 15).expect("date");
        assert_eq!(
            scheduled_send_date(renewal),
            NaiveDate::from_ymd_opt(2023, 12, 16).expect("date")
        );

        let mid_year = NaiveDate::from_ymd_opt(2026, 3, 1).expect("date");
        assert_eq!(
            scheduled_send_date(mid_year),
            NaiveDate::from_ymd_opt(2026, 1, 30).expect("date")
        );
    }

    #[test]
    fn computation_bundles_difference_variance_and_send_date() {
        let renewal_date = NaiveDate::from_ymd_opt(2026, 9, 15).expect("date");
        let computation =
            compute_renewal(Decimal::new(100_000, 2), Decimal::new(95_000, 2), renewal_date);
        assert_eq!(computation.difference, Decimal::new(-5000, 2));
        assert_eq!(computation.variance_pct, Decimal::new(-500, 2));
        assert_eq!(
            computation.scheduled_send_date,
            NaiveDate::from_ymd_opt(2026, 8, 16).expect("date")
        );
    }

    #[test]
    fn dispatch_outcomes_are_reachable_from_programada() {
        let mut sent = config(RenewalStatus::Programada);
        sent.transition_to(RenewalStatus::Enviada).expect("programada -> enviada");

        let mut failed = config(RenewalStatus::Programada);
        failed.transition_to(RenewalStatus::Error).expect("programada -> error");
    }

    #[test]
    fn error_records_reopen_to_programada_only() {
        let mut failed = config(RenewalStatus::Error);
        let rejected = failed.transition_to(RenewalStatus::Enviada).expect_err("error -> enviada");
        assert!(matches!(rejected, DomainError::InvalidRenewalTransition { .. }));
        failed.transition_to(RenewalStatus::Programada).expect("error -> programada");
    }

    #[test]
    fn enviada_is_terminal_unless_reopened() {
        let mut sent = config(RenewalStatus::Enviada);
        assert!(sent.transition_to(RenewalStatus::Error).is_err());
        sent.transition_to(RenewalStatus::Programada).expect("manual reopen");
        assert_eq!(sent.status, RenewalStatus::Programada);
    }
}
