//! HTTP surface and scheduled-workflow engines of the correduria back
//! office. The binary target is a thin wrapper around [`run`]; the CLI
//! reuses the dispatch engines directly for its one-shot trigger.

pub mod birthdays;
pub mod bootstrap;
pub mod clients;
pub mod commissions;
pub mod health;
pub mod mail;
pub mod renewals;
pub mod respond;

use anyhow::Result;
use correduria_core::config::{AppConfig, LoadOptions};

pub fn init_logging(config: &AppConfig) {
    use correduria_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    tracing::info!(
        event_name = "system.server.mail_transport_mode",
        transport = app.mailer.transport_name(),
        correlation_id = "bootstrap",
        "mail transport initialized"
    );

    let router = bootstrap::api_router(&app)?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "correduria-server started"
    );

    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "correduria-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
