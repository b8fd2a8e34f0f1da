//! Outbound collaborators for the contact form: SMTP delivery and
//! reCAPTCHA verification.
//!
//! Both are blocking and are only called from `spawn_blocking`.

use std::time::Duration;

use anyhow::Context;
use calc_core::contact::{HumanVerifier, MailTransport, OutgoingMail};
use calc_core::errors::{CalcError, CalcResult};
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use serde::Deserialize;

use crate::config::MailConfig;

const RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// STARTTLS SMTP relay
pub struct SmtpMailTransport {
    transport: SmtpTransport,
    sender: Mailbox,
}

impl SmtpMailTransport {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let sender: Mailbox = config
            .sender()
            .context("MAIL_DEFAULT_SENDER or MAIL_USERNAME must be set")?
            .parse()
            .context("invalid sender address")?;

        let mut builder = SmtpTransport::starttls_relay(&config.server)
            .with_context(|| format!("invalid mail server '{}'", config.server))?
            .port(config.port)
            .timeout(Some(Duration::from_secs(20)));
        if let Some((username, password)) = config.credentials() {
            builder = builder.credentials(Credentials::new(username.to_string(), password.to_string()));
        }

        Ok(SmtpMailTransport {
            transport: builder.build(),
            sender,
        })
    }
}

impl MailTransport for SmtpMailTransport {
    fn send(&self, mail: &OutgoingMail) -> CalcResult<()> {
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e| CalcError::delivery(format!("invalid recipient '{}': {}", mail.to, e)))?;
        let reply_to: Mailbox = mail
            .reply_to
            .parse()
            .map_err(|e| CalcError::delivery(format!("invalid reply-to '{}': {}", mail.reply_to, e)))?;

        let message = Message::builder()
            .from(self.sender.clone())
            .reply_to(reply_to)
            .to(to)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .map_err(|e| CalcError::delivery(e.to_string()))?;

        tracing::info!(to = %mail.to, "sending contact mail");
        self.transport
            .send(&message)
            .map(|_| ())
            .map_err(|e| CalcError::delivery(e.to_string()))
    }
}

/// Stand-in used when no sender is configured. Every send fails visibly.
pub struct UnconfiguredTransport;

impl MailTransport for UnconfiguredTransport {
    fn send(&self, _mail: &OutgoingMail) -> CalcResult<()> {
        Err(CalcError::delivery(
            "mail is not configured (set MAIL_USERNAME and MAIL_PASSWORD)",
        ))
    }
}

/// Google reCAPTCHA server-side check
pub struct RecaptchaVerifier {
    secret: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

impl RecaptchaVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        RecaptchaVerifier {
            secret: secret.into(),
            endpoint: RECAPTCHA_VERIFY_URL.to_string(),
        }
    }
}

impl HumanVerifier for RecaptchaVerifier {
    fn verify(&self, token: &str, remote_ip: Option<&str>) -> CalcResult<bool> {
        // A blocking client must not outlive the blocking thread it runs on
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CalcError::internal(e.to_string()))?;

        let mut params = vec![("secret", self.secret.as_str()), ("response", token)];
        if let Some(ip) = remote_ip {
            params.push(("remoteip", ip));
        }

        let response: SiteVerifyResponse = client
            .post(&self.endpoint)
            .form(&params)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| CalcError::delivery(format!("verification request failed: {}", e)))?;

        if !response.success {
            tracing::info!(errors = ?response.error_codes, "verification token rejected");
        }
        Ok(response.success)
    }
}
