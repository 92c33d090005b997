use secrecy::ExposeSecret;
use serde_json::json;

use correduria_core::config::{AppConfig, LoadOptions, LogFormat, MailProvider};

fn redact(present: bool) -> serde_json::Value {
    if present {
        json!("<redacted>")
    } else {
        json!(null)
    }
}

/// Effective configuration after defaults, file, env, and overrides.
/// Secrets never leave the process: only their presence is reported.
pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return serde_json::to_string(&json!({
                "command": "config",
                "status": "error",
                "error_class": "config_validation",
                "message": format!("configuration issue: {error}"),
            }))
            .unwrap_or_default();
        }
    };

    let provider = match config.mailer.provider {
        MailProvider::Noop => "noop",
        MailProvider::Resend => "resend",
    };
    let format = match config.logging.format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    };

    let payload = json!({
        "command": "config",
        "status": "ok",
        "config": {
            "database": {
                "url": config.database.url,
                "max_connections": config.database.max_connections,
                "timeout_secs": config.database.timeout_secs,
            },
            "mailer": {
                "provider": provider,
                "api_key": redact(config.mailer.api_key.is_some()),
                "from_address": config.mailer.from_address,
                "base_url": config.mailer.base_url,
                "timeout_secs": config.mailer.timeout_secs,
            },
            "server": {
                "bind_address": config.server.bind_address,
                "port": config.server.port,
                "health_check_port": config.server.health_check_port,
                "api_token": redact(!config.server.api_token.expose_secret().is_empty()),
                "graceful_shutdown_secs": config.server.graceful_shutdown_secs,
            },
            "logging": {
                "level": config.logging.level,
                "format": format,
            },
        },
    });

    serde_json::to_string_pretty(&payload).unwrap_or_default()
}
