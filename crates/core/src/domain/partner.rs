use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Alphabet for generated codes. Skips 0/O, 1/I/L and U to keep codes
/// unambiguous when read over the phone.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTVWXYZ23456789";
const CODE_LENGTH: usize = 8;
const CODE_PREFIX: &str = "CRD-";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartnerId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscountCodeId(pub String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    pub id: PartnerId,
    pub name: String,
    pub service: String,
    pub discount_pct: Decimal,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscountCode {
    pub id: DiscountCodeId,
    pub partner_id: PartnerId,
    pub code: String,
    pub redeemed: bool,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DiscountCode {
    pub fn redeem(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.redeemed {
            return Err(DomainError::CodeAlreadyRedeemed);
        }
        if let Some(expires_at) = self.expires_at {
            if now > expires_at {
                return Err(DomainError::CodeExpired);
            }
        }

        self.redeemed = true;
        self.redeemed_at = Some(now);
        Ok(())
    }
}

pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("{CODE_PREFIX}{suffix}")
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{generate_code, DiscountCode, DiscountCodeId, PartnerId, CODE_ALPHABET};
    use crate::errors::DomainError;

    fn code(expires_in_hours: Option<i64>) -> DiscountCode {
        DiscountCode {
            id: DiscountCodeId("cod-1".to_string()),
            partner_id: PartnerId("par-1".to_string()),
            code: generate_code(),
            redeemed: false,
            redeemed_at: None,
            expires_at: expires_in_hours.map(|h| Utc::now() + Duration::hours(h)),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn generated_codes_use_the_unambiguous_alphabet() {
        for _ in 0..50 {
            let code = generate_code();
            let suffix = code.strip_prefix("CRD-").expect("prefix");
            assert_eq!(suffix.len(), 8);
            assert!(suffix.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn redeeming_twice_fails() {
        let mut code = code(Some(24));
        code.redeem(Utc::now()).expect("first redemption");
        assert!(matches!(code.redeem(Utc::now()), Err(DomainError::CodeAlreadyRedeemed)));
    }

    #[test]
    fn expired_codes_cannot_be_redeemed() {
        let mut code = code(Some(1));
        let later = Utc::now() + Duration::hours(2);
        assert!(matches!(code.redeem(later), Err(DomainError::CodeExpired)));
        assert!(!code.redeemed);
    }

    #[test]
    fn codes_without_expiry_redeem_any_time() {
        let mut code = code(None);
        code.redeem(Utc::now() + Duration::days(365)).expect("no expiry");
        assert!(code.redeemed_at.is_some());
    }
}
