use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use correduria_core::audit::{AuditCategory, AuditEvent, AuditOutcome};
use correduria_db::repositories::{
    AuditRepository, ClientRepository, RepositoryError, SqlAuditRepository, SqlClientRepository,
};
use correduria_db::DbPool;
use correduria_mailer::templates::NoticeTemplates;
use correduria_mailer::{Mailer, MailerError, OutboundEmail};

use crate::respond::{storage_error, ErrorResponse};

const GREETER_ACTOR: &str = "birthday-greeter";

#[derive(Clone)]
pub struct BirthdaysState {
    dispatcher: Arc<BirthdayDispatcher>,
}

pub fn router(db_pool: DbPool, mailer: Arc<dyn Mailer>) -> Result<Router, MailerError> {
    let dispatcher = Arc::new(BirthdayDispatcher::new(db_pool, mailer)?);
    Ok(Router::new()
        .route("/jobs/birthdays/dispatch", post(dispatch_birthdays))
        .with_state(BirthdaysState { dispatcher }))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GreetingSummary {
    pub processed: usize,
    pub sent: usize,
    pub skipped: usize,
}

/// Same engine shape as the renewal dispatcher, over clients whose
/// birthday falls on the given day. Clients without an e-mail are
/// skipped and counted; a send failure skips the client too and the run
/// continues.
pub struct BirthdayDispatcher {
    clients: SqlClientRepository,
    audits: SqlAuditRepository,
    mailer: Arc<dyn Mailer>,
    templates: NoticeTemplates,
}

impl BirthdayDispatcher {
    pub fn new(db_pool: DbPool, mailer: Arc<dyn Mailer>) -> Result<Self, MailerError> {
        Ok(Self {
            clients: SqlClientRepository::new(db_pool.clone()),
            audits: SqlAuditRepository::new(db_pool),
            mailer,
            templates: NoticeTemplates::new()?,
        })
    }

    pub async fn run(&self, today: NaiveDate) -> Result<GreetingSummary, RepositoryError> {
        let celebrants = self.clients.list_birthdays_on(today).await?;
        let correlation_id = format!("birthday-dispatch-{today}");

        let mut sent = 0usize;
        let mut skipped = 0usize;

        for client in &celebrants {
            let Some(recipient) = client.email.clone() else {
                skipped += 1;
                continue;
            };

            let outcome = async {
                let html = self
                    .templates
                    .render_birthday_greeting(&client.full_name)
                    .map_err(|error| error.to_string())?;
                self.mailer
                    .send(&OutboundEmail {
                        to: recipient,
                        subject: self.templates.birthday_subject(),
                        html: Some(html),
                        text: None,
                        from: None,
                    })
                    .await
                    .map_err(|error| error.to_string())
            }
            .await;

            match outcome {
                Ok(_) => {
                    sent += 1;
                    self.audit(&client.id.0, &correlation_id, AuditOutcome::Success, "").await;
                }
                Err(detail) => {
                    skipped += 1;
                    self.audit(&client.id.0, &correlation_id, AuditOutcome::Failed, &detail).await;
                }
            }
        }

        info!(
            event_name = "birthday.dispatch.completed",
            correlation_id = %correlation_id,
            processed = celebrants.len(),
            sent,
            skipped,
            "birthday greeting run finished"
        );

        Ok(GreetingSummary { processed: celebrants.len(), sent, skipped })
    }

    async fn audit(&self, client_id: &str, correlation_id: &str, outcome: AuditOutcome, detail: &str) {
        let event_type = match outcome {
            AuditOutcome::Success => "birthday.greeting_sent",
            _ => "birthday.greeting_failed",
        };
        let event = AuditEvent::new(
            Some(client_id.to_string()),
            correlation_id,
            event_type,
            AuditCategory::Client,
            GREETER_ACTOR,
            outcome,
        )
        .with_metadata("detail", detail);

        if let Err(audit_error) = self.audits.append(&event).await {
            error!(
                event_name = "birthday.dispatch.audit_failed",
                correlation_id = %correlation_id,
                client_id = client_id,
                error = %audit_error,
                "could not persist the audit event"
            );
        }
    }
}

#[derive(Debug, Deserialize)]
struct DispatchQuery {
    date: Option<NaiveDate>,
}

async fn dispatch_birthdays(
    State(state): State<BirthdaysState>,
    Query(query): Query<DispatchQuery>,
) -> Result<Json<GreetingSummary>, ErrorResponse> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let summary = state
        .dispatcher
        .run(date)
        .await
        .map_err(|error| storage_error("birthdays.dispatch", &error))?;
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, Utc};

    use correduria_core::domain::client::{Client, ClientId};
    use correduria_db::repositories::{ClientRepository, SqlClientRepository};
    use correduria_db::{connect_with_settings, migrations};
    use correduria_mailer::NoopMailer;

    use super::BirthdayDispatcher;

    #[tokio::test]
    async fn greetings_go_to_celebrants_with_an_email_only() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let clients = SqlClientRepository::new(pool.clone());
        let rows = [
            ("cli-1", Some("uno@example.com"), Some("1985-08-07")),
            ("cli-2", None, Some("1990-08-07")),
            ("cli-3", Some("tres@example.com"), Some("1970-12-24")),
        ];
        for (id, email, birth_date) in rows {
            clients
                .insert(&Client {
                    id: ClientId(id.to_string()),
                    full_name: format!("Cliente {id}"),
                    email: email.map(str::to_string),
                    phone: None,
                    birth_date: birth_date.map(|d| d.parse().expect("date")),
                    advisor_id: None,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
                .await
                .expect("insert");
        }

        let mailer = Arc::new(NoopMailer::default());
        let dispatcher = BirthdayDispatcher::new(pool.clone(), mailer.clone()).expect("dispatcher");

        let today = NaiveDate::from_ymd_opt(2026, 8, 7).expect("date");
        let summary = dispatcher.run(today).await.expect("run");

        assert_eq!(summary.processed, 2, "only the two August 7 birthdays are in scope");
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(mailer.sent_count(), 1);

        pool.close().await;
    }
}
