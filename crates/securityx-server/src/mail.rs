//! Contact form delivery.
//!
//! Messages go out through the EmailJS REST endpoint. Without EmailJS
//! settings, [`LogMailer`] records the message in the log and reports
//! success so the form still works locally.

use serde::Serialize;

use securityx_core::validation::ContactForm;

use crate::config::EmailJsConfig;

const EMAILJS_SEND_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// Why a message could not be sent.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Transport(String),
    #[error("mail relay rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Sends contact form messages.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send_contact(&self, form: &ContactForm) -> Result<(), MailError>;
}

/// EmailJS REST client.
#[derive(Debug, Clone)]
pub struct EmailJsMailer {
    http: reqwest::Client,
    config: EmailJsConfig,
    endpoint: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: TemplateParams<'a>,
}

#[derive(Serialize)]
struct TemplateParams<'a> {
    from_name: &'a str,
    from_email: &'a str,
    message: &'a str,
    to_email: &'a str,
}

impl EmailJsMailer {
    #[must_use]
    pub fn new(http: reqwest::Client, config: EmailJsConfig) -> Self {
        Self {
            http,
            config,
            endpoint: EMAILJS_SEND_URL.to_owned(),
        }
    }
}

#[async_trait::async_trait]
impl Mailer for EmailJsMailer {
    async fn send_contact(&self, form: &ContactForm) -> Result<(), MailError> {
        let request = SendRequest {
            service_id: &self.config.service_id,
            template_id: &self.config.template_id,
            user_id: &self.config.public_key,
            template_params: TemplateParams {
                from_name: form.name.trim(),
                from_email: form.email.trim(),
                message: &form.message,
                to_email: &self.config.to_email,
            },
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(from = %form.email.trim(), "contact message sent");
        Ok(())
    }
}

/// Logs contact messages instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send_contact(&self, form: &ContactForm) -> Result<(), MailError> {
        tracing::info!(
            from_name = %form.name.trim(),
            from_email = %form.email.trim(),
            message = %form.message,
            "contact message (mail relay not configured)"
        );
        Ok(())
    }
}
