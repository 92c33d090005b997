use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdvisorId(pub String);

/// The four role tiers of the back office. Ordering matters: a higher
/// tier sees everything a lower tier sees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Asesor,
    Gestor,
    Supervisor,
    Administrador,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asesor" => Ok(Self::Asesor),
            "gestor" => Ok(Self::Gestor),
            "supervisor" => Ok(Self::Supervisor),
            "administrador" => Ok(Self::Administrador),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Clientes,
    Polizas,
    Renovaciones,
    Ventas,
    Comisiones,
    Finanzas,
    Auditoria,
    Socios,
}

impl Role {
    /// Sidebar visibility per tier: commissions open up at Gestor,
    /// finances at Supervisor, the audit trail only to Administrador.
    pub fn can_view(self, section: Section) -> bool {
        match section {
            Section::Clientes | Section::Polizas | Section::Renovaciones | Section::Ventas
            | Section::Socios => true,
            Section::Comisiones => self >= Role::Gestor,
            Section::Finanzas => self >= Role::Supervisor,
            Section::Auditoria => self == Role::Administrador,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Advisor {
    pub id: AdvisorId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub advisor_id: Option<AdvisorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Whether this client's birthday falls on `today`. Clients born on
    /// Feb 29 are greeted on Feb 28 in non-leap years.
    pub fn birthday_on(&self, today: NaiveDate) -> bool {
        let Some(birth) = self.birth_date else {
            return false;
        };

        if birth.month() == today.month() && birth.day() == today.day() {
            return true;
        }

        birth.month() == 2
            && birth.day() == 29
            && today.month() == 2
            && today.day() == 28
            && NaiveDate::from_ymd_opt(today.year(), 2, 29).is_none()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::{Client, ClientId, Role, Section};

    fn client_born(date: Option<&str>) -> Client {
        Client {
            id: ClientId("cli-1".to_string()),
            full_name: "María Fernández".to_string(),
            email: Some("maria@example.com".to_string()),
            phone: None,
            birth_date: date.map(|d| d.parse().expect("valid date")),
            advisor_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn birthday_matches_month_and_day_across_years() {
        let client = client_born(Some("1980-08-07"));
        let today = NaiveDate::from_ymd_opt(2026, 8, 7).expect("date");
        assert!(client.birthday_on(today));
        assert!(!client.birthday_on(today.succ_opt().expect("date")));
    }

    #[test]
    fn missing_birth_date_never_matches() {
        let client = client_born(None);
        assert!(!client.birthday_on(NaiveDate::from_ymd_opt(2026, 8, 7).expect("date")));
    }

    #[test]
    fn leap_day_birthdays_match_feb_28_in_common_years() {
        let client = client_born(Some("1996-02-29"));
        assert!(client.birthday_on(NaiveDate::from_ymd_opt(2025, 2, 28).expect("date")));
        assert!(client.birthday_on(NaiveDate::from_ymd_opt(2028, 2, 29).expect("date")));
        assert!(!client.birthday_on(NaiveDate::from_ymd_opt(2028, 2, 28).expect("date")));
    }

    #[test]
    fn role_tiers_gate_restricted_sections() {
        assert!(!Role::Asesor.can_view(Section::Comisiones));
        assert!(Role::Gestor.can_view(Section::Comisiones));
        assert!(!Role::Gestor.can_view(Section::Finanzas));
        assert!(Role::Supervisor.can_view(Section::Finanzas));
        assert!(!Role::Supervisor.can_view(Section::Auditoria));
        assert!(Role::Administrador.can_view(Section::Auditoria));
        assert!(Role::Asesor.can_view(Section::Clientes));
    }
}
