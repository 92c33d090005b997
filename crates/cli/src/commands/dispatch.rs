use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;

use correduria_core::config::{AppConfig, LoadOptions};
use correduria_db::{connect_with_settings, migrations};
use correduria_mailer::build_mailer;
use correduria_server::birthdays::BirthdayDispatcher;
use correduria_server::renewals::RenewalDispatcher;

use crate::commands::CommandResult;
use crate::DispatchKind;

/// One dispatch pass. An external scheduler (cron, a systemd timer)
/// invokes this daily; the command itself never reschedules anything.
pub fn run(kind: DispatchKind, date: Option<&str>) -> CommandResult {
    let date = match date {
        Some(raw) => match raw.parse::<NaiveDate>() {
            Ok(date) => date,
            Err(error) => {
                return CommandResult::failure(
                    "dispatch",
                    "invalid_date",
                    format!("could not parse `{raw}` as YYYY-MM-DD: {error}"),
                    2,
                );
            }
        },
        None => Utc::now().date_naive(),
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "dispatch",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "dispatch",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let mailer =
            build_mailer(&config.mailer).map_err(|error| ("mailer", error.to_string(), 6u8))?;

        let summary = match kind {
            DispatchKind::Renewals => {
                let dispatcher = RenewalDispatcher::new(pool.clone(), Arc::clone(&mailer))
                    .map_err(|error| ("mailer", error.to_string(), 6u8))?;
                let summary = dispatcher
                    .run(date)
                    .await
                    .map_err(|error| ("dispatch", error.to_string(), 7u8))?;
                json!({
                    "kind": "renewals",
                    "date": date.to_string(),
                    "processed": summary.processed,
                    "sent": summary.sent,
                    "errored": summary.errored,
                })
            }
            DispatchKind::Birthdays => {
                let dispatcher = BirthdayDispatcher::new(pool.clone(), Arc::clone(&mailer))
                    .map_err(|error| ("mailer", error.to_string(), 6u8))?;
                let summary = dispatcher
                    .run(date)
                    .await
                    .map_err(|error| ("dispatch", error.to_string(), 7u8))?;
                json!({
                    "kind": "birthdays",
                    "date": date.to_string(),
                    "processed": summary.processed,
                    "sent": summary.sent,
                    "skipped": summary.skipped,
                })
            }
        };

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(summary)
    });

    match result {
        Ok(summary) => CommandResult::success(
            "dispatch",
            serde_json::to_string(&summary).unwrap_or_default(),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("dispatch", error_class, message, exit_code)
        }
    }
}
