use serde::Serialize;
use tera::Tera;

use crate::MailerError;

const RENEWAL_NOTICE: &str = "\
<p>Estimado/a {{ client_name }}:</p>
<p>Su póliza <strong>{{ policy_number }}</strong> ({{ product }}, {{ insurer }})
vence el <strong>{{ renewal_date }}</strong>.</p>
<p>La prima anual pasa de {{ current_premium }} a
<strong>{{ proposed_premium }}</strong> ({{ variance_pct }}&nbsp;% de variación).</p>
<p>Si desea revisar las condiciones de la renovación, responda a este
correo o contacte a su asesor.</p>
<p>Un saludo,<br/>Su correduría de seguros</p>
";

const BIRTHDAY_GREETING: &str = "\
<p>¡Feliz cumpleaños, {{ client_name }}!</p>
<p>Todo el equipo de la correduría le desea un día estupendo.
Gracias por confiar en nosotros un año más.</p>
";

/// Context for the renewal notice. Premium and variance figures arrive
/// pre-formatted: the template does no number formatting of its own.
#[derive(Clone, Debug, Serialize)]
pub struct RenewalNoticeContext {
    pub client_name: String,
    pub policy_number: String,
    pub insurer: String,
    pub product: String,
    pub renewal_date: String,
    pub current_premium: String,
    pub proposed_premium: String,
    pub variance_pct: String,
}

pub struct NoticeTemplates {
    tera: Tera,
}

impl NoticeTemplates {
    pub fn new() -> Result<Self, MailerError> {
        let mut tera = Tera::default();
        tera.add_raw_template("renewal_notice", RENEWAL_NOTICE)
            .map_err(|err| MailerError::Provider(format!("template error: {err}")))?;
        tera.add_raw_template("birthday_greeting", BIRTHDAY_GREETING)
            .map_err(|err| MailerError::Provider(format!("template error: {err}")))?;
        Ok(Self { tera })
    }

    pub fn renewal_subject(&self, policy_number: &str) -> String {
        format!("Renovación de su póliza {policy_number}")
    }

    pub fn render_renewal_notice(
        &self,
        context: &RenewalNoticeContext,
    ) -> Result<String, MailerError> {
        let tera_context = tera::Context::from_serialize(context)
            .map_err(|err| MailerError::Provider(format!("template context: {err}")))?;
        self.tera
            .render("renewal_notice", &tera_context)
            .map_err(|err| MailerError::Provider(format!("template render: {err}")))
    }

    pub fn birthday_subject(&self) -> String {
        "¡Feliz cumpleaños!".to_string()
    }

    pub fn render_birthday_greeting(&self, client_name: &str) -> Result<String, MailerError> {
        let mut context = tera::Context::new();
        context.insert("client_name", client_name);
        self.tera
            .render("birthday_greeting", &context)
            .map_err(|err| MailerError::Provider(format!("template render: {err}")))
    }
}
