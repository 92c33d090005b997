//! Outbound e-mail for the correduria back office.
//!
//! Two transports sit behind the [`Mailer`] trait:
//! - [`NoopMailer`] logs the intended send and succeeds without touching
//!   the network. It is the default transport and the rendition of the
//!   original log-only send path.
//! - [`resend::ResendMailer`] forwards to the Resend HTTP API and maps
//!   provider responses onto [`MailerError`].
//!
//! Notification bodies are rendered by [`templates::NoticeTemplates`].

pub mod resend;
pub mod templates;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use correduria_core::config::{MailProvider, MailerConfig};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageId(pub String);

/// Payload of one outbound message. At least one of `html`/`text` must
/// be present; `from` falls back to the configured sender address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: Option<String>,
    pub text: Option<String>,
    pub from: Option<String>,
}

impl OutboundEmail {
    pub fn validate(&self) -> Result<(), MailerError> {
        if !self.to.contains('@') {
            return Err(MailerError::InvalidRequest(format!(
                "`to` is not an e-mail address: `{}`",
                self.to
            )));
        }
        if self.subject.trim().is_empty() {
            return Err(MailerError::InvalidRequest("`subject` must not be empty".to_string()));
        }
        if self.html.is_none() && self.text.is_none() {
            return Err(MailerError::InvalidRequest(
                "either `html` or `text` body is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MailerError {
    #[error("invalid mail request: {0}")]
    InvalidRequest(String),
    #[error("mail provider rejected the credentials")]
    Unauthorized,
    #[error("mail provider rate limit hit")]
    RateLimited,
    #[error("network failure talking to the mail provider: {0}")]
    Network(String),
    #[error("mail provider error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<MessageId, MailerError>;
    fn transport_name(&self) -> &'static str;
}

/// Log-only transport. Fabricates a local message id so callers can keep
/// their bookkeeping; nothing leaves the process.
#[derive(Default)]
pub struct NoopMailer {
    counter: AtomicU64,
}

impl NoopMailer {
    /// Number of sends accepted so far. Handy for asserting attempted
    /// deliveries in tests and in the doctor command.
    pub fn sent_count(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<MessageId, MailerError> {
        email.validate()?;
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed) + 1;

        tracing::info!(
            event_name = "mail.noop.send",
            to = %email.to,
            subject = %email.subject,
            "noop transport: e-mail logged, not delivered"
        );

        Ok(MessageId(format!("noop-{sequence}")))
    }

    fn transport_name(&self) -> &'static str {
        "noop"
    }
}

/// Build the transport the configuration asks for.
pub fn build_mailer(config: &MailerConfig) -> Result<Arc<dyn Mailer>, MailerError> {
    match config.provider {
        MailProvider::Noop => Ok(Arc::new(NoopMailer::default())),
        MailProvider::Resend => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                MailerError::InvalidRequest(
                    "resend provider requires mailer.api_key".to_string(),
                )
            })?;
            Ok(Arc::new(resend::ResendMailer::new(
                api_key,
                config.from_address.clone(),
                config.base_url.clone(),
                config.timeout_secs,
            )?))
        }
    }
}
