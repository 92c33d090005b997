use std::sync::Arc;

use axum::Router;
use correduria_core::config::{AppConfig, ConfigError, LoadOptions};
use correduria_db::{connect_with_settings, migrations, DbPool};
use correduria_mailer::{build_mailer, Mailer, MailerError};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub mailer: Arc<dyn Mailer>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("mail transport setup failed: {0}")]
    Mailer(#[from] MailerError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let mailer = build_mailer(&config.mailer)?;

    Ok(Application { config, db_pool, mailer })
}

/// The API surface: per-concern routers merged into one.
pub fn api_router(app: &Application) -> Result<Router, BootstrapError> {
    let router = Router::new()
        .merge(crate::clients::router(app.db_pool.clone()))
        .merge(crate::renewals::router(app.db_pool.clone(), app.mailer.clone())?)
        .merge(crate::birthdays::router(app.db_pool.clone(), app.mailer.clone())?)
        .merge(crate::commissions::router(app.db_pool.clone()))
        .merge(crate::mail::router(app.mailer.clone(), app.config.server.api_token.clone()));
    Ok(router)
}
