use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;

use correduria_mailer::{Mailer, MailerError, OutboundEmail};

use crate::respond::ApiError;

#[derive(Clone)]
pub struct MailState {
    mailer: Arc<dyn Mailer>,
    api_token: SecretString,
}

pub fn router(mailer: Arc<dyn Mailer>, api_token: SecretString) -> Router {
    Router::new()
        .route("/mail/send", post(send_mail))
        .with_state(MailState { mailer, api_token })
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    to: String,
    subject: String,
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    from: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendResponse {
    id: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

fn mailer_error_response(error: MailerError) -> (StatusCode, Json<ApiError>) {
    let (status, message) = match &error {
        MailerError::InvalidRequest(_) => {
            (StatusCode::BAD_REQUEST, "La solicitud de correo no es válida.")
        }
        MailerError::RateLimited => (
            StatusCode::TOO_MANY_REQUESTS,
            "Demasiadas solicitudes. Espera un momento e intenta de nuevo.",
        ),
        MailerError::Network(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Error de conexión. Revisa tu red e intenta de nuevo.",
        ),
        MailerError::Unauthorized | MailerError::Provider(_) => {
            (StatusCode::BAD_GATEWAY, "El proveedor de correo rechazó el envío.")
        }
    };

    warn!(
        event_name = "mail.relay.failed",
        detail = %error,
        "outbound mail relay failed"
    );

    (status, Json(ApiError { error: message.to_string() }))
}

/// Bearer-authenticated relay to the configured transport. The token is
/// the `server.api_token` config value; everything else about the
/// payload is delegated to the mailer's own validation.
async fn send_mail(
    State(state): State<MailState>,
    headers: HeaderMap,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendResponse>, (StatusCode, Json<ApiError>)> {
    match bearer_token(&headers) {
        Some(token) if token == state.api_token.expose_secret() => {}
        _ => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiError {
                    error: "No tienes permisos para realizar esta acción.".to_string(),
                }),
            ));
        }
    }

    let email = OutboundEmail {
        to: request.to,
        subject: request.subject,
        html: request.html,
        text: request.text,
        from: request.from,
    };

    let message_id = state.mailer.send(&email).await.map_err(mailer_error_response)?;
    Ok(Json(SendResponse { id: message_id.0 }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use correduria_mailer::NoopMailer;

    use super::router;

    fn request(token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/mail/send")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).expect("request")
    }

    const VALID_BODY: &str =
        r#"{"to": "laura@example.com", "subject": "Aviso", "text": "Hola"}"#;

    #[tokio::test]
    async fn missing_token_is_rejected_with_401() {
        let app = router(Arc::new(NoopMailer::default()), "token-secreto".to_string().into());
        let response = app.oneshot(request(None, VALID_BODY)).await.expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_token_is_rejected_with_401() {
        let app = router(Arc::new(NoopMailer::default()), "token-secreto".to_string().into());
        let response =
            app.oneshot(request(Some("otro-token"), VALID_BODY)).await.expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authenticated_send_returns_the_message_id() {
        let app = router(Arc::new(NoopMailer::default()), "token-secreto".to_string().into());
        let response =
            app.oneshot(request(Some("token-secreto"), VALID_BODY)).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes =
            axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
        let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(payload["id"], "noop-1");
    }

    #[tokio::test]
    async fn invalid_payload_maps_to_bad_request() {
        let app = router(Arc::new(NoopMailer::default()), "token-secreto".to_string().into());
        let response = app
            .oneshot(request(
                Some("token-secreto"),
                r#"{"to": "laura@example.com", "subject": "Aviso"}"#,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
