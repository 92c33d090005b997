use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::{Mailer, MailerError, MessageId, OutboundEmail};

const DEFAULT_BASE_URL: &str = "https://api.resend.com";

/// Transport backed by the Resend transactional-mail API.
pub struct ResendMailer {
    client: Client,
    api_key: SecretString,
    from_address: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

impl ResendMailer {
    pub fn new(
        api_key: SecretString,
        from_address: String,
        base_url: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, MailerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|err| MailerError::Network(err.to_string()))?;

        Ok(Self {
            client,
            api_key,
            from_address,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<MessageId, MailerError> {
        email.validate()?;

        let mut payload = json!({
            "from": email.from.clone().unwrap_or_else(|| self.from_address.clone()),
            "to": [email.to.clone()],
            "subject": email.subject.clone(),
        });
        if let Some(html) = &email.html {
            payload["html"] = json!(html);
        }
        if let Some(text) = &email.text {
            payload["text"] = json!(text);
        }

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|err| MailerError::Network(err.to_string()))?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                let body: SendResponse = response
                    .json()
                    .await
                    .map_err(|err| MailerError::Provider(format!("malformed response: {err}")))?;
                Ok(MessageId(body.id))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(MailerError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => Err(MailerError::RateLimited),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let detail = response.text().await.unwrap_or_default();
                Err(MailerError::InvalidRequest(detail))
            }
            status => {
                let detail = response.text().await.unwrap_or_default();
                Err(MailerError::Provider(format!("unexpected status {status}: {detail}")))
            }
        }
    }

    fn transport_name(&self) -> &'static str {
        "resend"
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::ResendMailer;
    use crate::{Mailer, MailerError, OutboundEmail};

    fn mailer(base_url: String) -> ResendMailer {
        ResendMailer::new(
            "re_test_key".to_string().into(),
            "avisos@correduria.example".to_string(),
            Some(base_url),
            5,
        )
        .expect("build mailer")
    }

    fn email() -> OutboundEmail {
        OutboundEmail {
            to: "laura@example.com".to_string(),
            subject: "Renovación de póliza POL-1".to_string(),
            html: Some("<p>Hola Laura</p>".to_string()),
            text: None,
            from: None,
        }
    }

    #[tokio::test]
    async fn successful_send_returns_the_provider_message_id() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/emails")
                .header("authorization", "Bearer re_test_key")
                .json_body_partial(r#"{"to": ["laura@example.com"]}"#);
            then.status(200).json_body(serde_json::json!({"id": "msg_123"}));
        });

        let result = mailer(server.base_url()).send(&email()).await.expect("send");
        assert_eq!(result.0, "msg_123");
        mock.assert();
    }

    #[tokio::test]
    async fn explicit_from_overrides_the_configured_sender() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/emails")
                .json_body_partial(r#"{"from": "gerencia@correduria.example"}"#);
            then.status(200).json_body(serde_json::json!({"id": "msg_124"}));
        });

        let mut custom = email();
        custom.from = Some("gerencia@correduria.example".to_string());
        mailer(server.base_url()).send(&custom).await.expect("send");
        mock.assert();
    }

    #[tokio::test]
    async fn provider_auth_failures_map_to_unauthorized() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/emails");
            then.status(401).json_body(serde_json::json!({"message": "invalid api key"}));
        });

        let error = mailer(server.base_url()).send(&email()).await.expect_err("401");
        assert_eq!(error, MailerError::Unauthorized);
    }

    #[tokio::test]
    async fn provider_throttling_maps_to_rate_limited() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/emails");
            then.status(429);
        });

        let error = mailer(server.base_url()).send(&email()).await.expect_err("429");
        assert_eq!(error, MailerError::RateLimited);
    }

    #[tokio::test]
    async fn validation_errors_map_to_invalid_request() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/emails");
            then.status(422).body("missing `to` field");
        });

        let error = mailer(server.base_url()).send(&email()).await.expect_err("422");
        assert!(matches!(error, MailerError::InvalidRequest(_)));
    }
}
