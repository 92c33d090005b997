use serde::Serialize;
use serde_json::json;

use correduria_core::config::{AppConfig, LoadOptions};
use correduria_db::connect_with_settings;
use correduria_mailer::build_mailer;

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    ok: bool,
    detail: String,
}

fn check(name: &'static str, result: Result<String, String>) -> DoctorCheck {
    match result {
        Ok(detail) => DoctorCheck { name, ok: true, detail },
        Err(detail) => DoctorCheck { name, ok: false, detail },
    }
}

/// Readiness report: configuration, database connectivity, and mail
/// transport wiring. Exits through the caller with code 0 either way;
/// the report is the deliverable.
pub fn run(json_output: bool) -> String {
    let mut checks = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(check("config", Ok("configuration loaded and validated".to_string())));
            Some(config)
        }
        Err(error) => {
            checks.push(check("config", Err(format!("configuration issue: {error}"))));
            None
        }
    };

    if let Some(config) = &config {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build();
        match runtime {
            Ok(runtime) => {
                let database_check = runtime.block_on(async {
                    let pool = connect_with_settings(
                        &config.database.url,
                        config.database.max_connections,
                        config.database.timeout_secs,
                    )
                    .await
                    .map_err(|error| format!("connection failed: {error}"))?;

                    pool.close().await;
                    Ok::<String, String>("database reachable".to_string())
                });
                checks.push(check("database", database_check));
            }
            Err(error) => {
                checks.push(check("database", Err(format!("runtime init failed: {error}"))));
            }
        }

        let mailer_check = build_mailer(&config.mailer)
            .map(|mailer| format!("transport `{}` ready", mailer.transport_name()))
            .map_err(|error| format!("transport setup failed: {error}"));
        checks.push(check("mailer", mailer_check));
    }

    let all_ok = checks.iter().all(|check| check.ok);

    if json_output {
        serde_json::to_string_pretty(&json!({
            "command": "doctor",
            "status": if all_ok { "ok" } else { "error" },
            "checks": checks,
        }))
        .unwrap_or_default()
    } else {
        let mut lines =
            vec![format!("doctor: {}", if all_ok { "all checks passed" } else { "issues found" })];
        for check in &checks {
            lines.push(format!(
                "  [{}] {} - {}",
                if check.ok { "ok" } else { "fail" },
                check.name,
                check.detail
            ));
        }
        lines.join("\n")
    }
}
