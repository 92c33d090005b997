use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

use correduria_core::domain::commission::has_discrepancy;
use correduria_core::domain::renewal::compute_renewal;
use correduria_db::fixtures::SEED_DISPATCH_DATE;
use correduria_db::{connect_with_settings, migrations, DemoSeedDataset};
use correduria_mailer::NoopMailer;
use correduria_server::renewals::RenewalDispatcher;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    ok: bool,
    duration_ms: u128,
    detail: String,
}

/// End-to-end readiness pass against an in-memory database: schema,
/// seeds, the two calculator invariants, and one dispatch run through
/// the noop transport.
pub fn run() -> CommandResult {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "smoke",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let checks = runtime.block_on(async {
        let mut checks: Vec<SmokeCheck> = Vec::new();

        let started = Instant::now();
        let pool = match connect_with_settings("sqlite::memory:?cache=shared", 1, 30).await {
            Ok(pool) => {
                checks.push(SmokeCheck {
                    name: "database",
                    ok: true,
                    duration_ms: started.elapsed().as_millis(),
                    detail: "in-memory database ready".to_string(),
                });
                pool
            }
            Err(error) => {
                checks.push(SmokeCheck {
                    name: "database",
                    ok: false,
                    duration_ms: started.elapsed().as_millis(),
                    detail: error.to_string(),
                });
                return checks;
            }
        };

        let started = Instant::now();
        match migrations::run_pending(&pool).await {
            Ok(()) => checks.push(SmokeCheck {
                name: "migrations",
                ok: true,
                duration_ms: started.elapsed().as_millis(),
                detail: "schema applied".to_string(),
            }),
            Err(error) => {
                checks.push(SmokeCheck {
                    name: "migrations",
                    ok: false,
                    duration_ms: started.elapsed().as_millis(),
                    detail: error.to_string(),
                });
                return checks;
            }
        }

        let started = Instant::now();
        let seed_ok = match DemoSeedDataset::load(&pool).await {
            Ok(_) => match DemoSeedDataset::verify(&pool).await {
                Ok(verification) if verification.passed() => Ok("seed contract holds".to_string()),
                Ok(verification) => Err(format!("failed checks: {:?}", verification.checks)),
                Err(error) => Err(error.to_string()),
            },
            Err(error) => Err(error.to_string()),
        };
        checks.push(SmokeCheck {
            name: "seed",
            ok: seed_ok.is_ok(),
            duration_ms: started.elapsed().as_millis(),
            detail: seed_ok.unwrap_or_else(|detail| detail),
        });

        let started = Instant::now();
        let renewal_date = NaiveDate::from_ymd_opt(2024, 1, 15).expect("date");
        let computation =
            compute_renewal(Decimal::from(1000), Decimal::new(112_500, 2), renewal_date);
        let calculator_ok = computation.variance_pct == Decimal::new(1250, 2)
            && computation.scheduled_send_date
                == NaiveDate::from_ymd_opt(2023, 12, 16).expect("date");
        checks.push(SmokeCheck {
            name: "renewal_calculator",
            ok: calculator_ok,
            duration_ms: started.elapsed().as_millis(),
            detail: format!(
                "variance {} scheduled {}",
                computation.variance_pct, computation.scheduled_send_date
            ),
        });

        let started = Instant::now();
        let boundary_ok = !has_discrepancy(
            Decimal::from(1000),
            Decimal::from(10),
            Decimal::new(10_001, 2),
        ) && has_discrepancy(Decimal::from(1000), Decimal::from(10), Decimal::new(10_002, 2));
        checks.push(SmokeCheck {
            name: "commission_tolerance",
            ok: boundary_ok,
            duration_ms: started.elapsed().as_millis(),
            detail: "strict > 0.01 boundary".to_string(),
        });

        let started = Instant::now();
        let dispatch_detail = match RenewalDispatcher::new(pool.clone(), Arc::new(NoopMailer::default()))
        {
            Ok(dispatcher) => {
                let date: NaiveDate = SEED_DISPATCH_DATE.parse().expect("seed date");
                match dispatcher.run(date).await {
                    Ok(summary) => {
                        let ok = summary.processed == 2
                            && summary.sent == 1
                            && summary.errored == 1;
                        Ok((
                            ok,
                            format!(
                                "processed {} sent {} errored {}",
                                summary.processed, summary.sent, summary.errored
                            ),
                        ))
                    }
                    Err(error) => Err(error.to_string()),
                }
            }
            Err(error) => Err(error.to_string()),
        };
        match dispatch_detail {
            Ok((ok, detail)) => checks.push(SmokeCheck {
                name: "renewal_dispatch",
                ok,
                duration_ms: started.elapsed().as_millis(),
                detail,
            }),
            Err(detail) => checks.push(SmokeCheck {
                name: "renewal_dispatch",
                ok: false,
                duration_ms: started.elapsed().as_millis(),
                detail,
            }),
        }

        pool.close().await;
        checks
    });

    let all_ok = checks.iter().all(|check| check.ok);
    let output = serde_json::to_string_pretty(&json!({
        "command": "smoke",
        "status": if all_ok { "ok" } else { "error" },
        "checks": checks,
    }))
    .unwrap_or_default();

    CommandResult { exit_code: if all_ok { 0 } else { 6 }, output }
}
