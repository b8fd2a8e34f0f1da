//! # Contact Notifier
//!
//! Validates a contact-form submission and hands it to a mail transport.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. honeypot field must be empty
//! 2. email and message must be present
//! 3. email must look like `local@domain.tld`
//! 4. when a [`HumanVerifier`] is configured, the verification token must
//!    be present and accepted
//!
//! Only then is an [`OutgoingMail`] built and passed to the
//! [`MailTransport`]. Nothing is dispatched when any check fails.
//!
//! The transport and verifier are traits so the web front-end can plug in
//! SMTP and a third-party verification service while tests use fakes.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// Subject line of every contact mail
pub const CONTACT_SUBJECT: &str = "Nieuw contactbericht";

/// Upper bound on message length, in characters
pub const MAX_MESSAGE_CHARS: usize = 5000;

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("email pattern is valid"));

/// Contact form as submitted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    /// Hidden field; humans leave it empty
    #[serde(default)]
    pub honeypot: Option<String>,

    /// Token produced by the client-side verification widget
    #[serde(rename = "g-recaptcha-response", default)]
    pub verification_token: Option<String>,
}

/// A mail ready for the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub body: String,
}

/// Sends mail. Failures must be reported as `DeliveryError`.
pub trait MailTransport: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> CalcResult<()>;
}

/// External bot-verification service.
pub trait HumanVerifier: Send + Sync {
    /// `Ok(true)` when the token is accepted, `Ok(false)` when rejected,
    /// `Err` when the service could not be asked.
    fn verify(&self, token: &str, remote_ip: Option<&str>) -> CalcResult<bool>;
}

/// Validates submissions and dispatches them to one recipient.
#[derive(Clone)]
pub struct ContactNotifier {
    recipient: String,
    transport: Arc<dyn MailTransport>,
    verifier: Option<Arc<dyn HumanVerifier>>,
}

impl ContactNotifier {
    pub fn new(recipient: impl Into<String>, transport: Arc<dyn MailTransport>) -> Self {
        ContactNotifier {
            recipient: recipient.into(),
            transport,
            verifier: None,
        }
    }

    /// Require a verification token accepted by `verifier`
    pub fn with_verifier(mut self, verifier: Arc<dyn HumanVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn requires_verification(&self) -> bool {
        self.verifier.is_some()
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Validate `form` and send it. Returns the mail that was handed to the
    /// transport.
    ///
    /// # Errors
    ///
    /// * `ValidationError` - honeypot filled, missing/malformed fields,
    ///   missing or rejected verification token
    /// * `DeliveryError` - the transport failed
    pub fn submit(&self, form: &ContactForm, remote_ip: Option<&str>) -> CalcResult<OutgoingMail> {
        let (email, message) = validate(form)?;

        if let Some(verifier) = &self.verifier {
            let token = form
                .verification_token
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| CalcError::validation("verification", "Verification token is missing"))?;

            let accepted = verifier.verify(token, remote_ip).map_err(|e| {
                tracing::warn!(error = %e, "bot verification service unavailable");
                CalcError::validation("verification", "Verification could not be completed")
            })?;
            if !accepted {
                return Err(CalcError::validation("verification", "Verification token was rejected"));
            }
        }

        let mail = OutgoingMail {
            to: self.recipient.clone(),
            reply_to: email.to_string(),
            subject: CONTACT_SUBJECT.to_string(),
            body: format!("From: {}\n\n{}", email, message),
        };

        self.transport.send(&mail).map_err(|e| match e {
            CalcError::DeliveryError { reason } => CalcError::delivery(with_server_hint(&reason)),
            other => CalcError::delivery(with_server_hint(&other.to_string())),
        })?;

        Ok(mail)
    }
}

/// Field checks that need no collaborators. Returns trimmed (email, message).
pub fn validate(form: &ContactForm) -> CalcResult<(&str, &str)> {
    if form.honeypot.as_deref().is_some_and(|h| !h.is_empty()) {
        return Err(CalcError::validation("honeypot", "Hidden field was filled in"));
    }

    let email = form.email.as_deref().map(str::trim).unwrap_or("");
    let message = form.message.as_deref().map(str::trim).unwrap_or("");
    if email.is_empty() {
        return Err(CalcError::validation("email", "Email address is required"));
    }
    if message.is_empty() {
        return Err(CalcError::validation("message", "Message is required"));
    }
    if !EMAIL_SHAPE.is_match(email) {
        return Err(CalcError::validation("email", "Email address is malformed"));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(CalcError::validation("message", "Message is too long"));
    }
    Ok((email, message))
}

/// Append a configuration hint when the mail server name did not resolve.
pub fn with_server_hint(reason: &str) -> String {
    let lowered = reason.to_ascii_lowercase();
    let unresolved = ["getaddrinfo", "failed to lookup address", "name or service not known", "no such host"]
        .iter()
        .any(|needle| lowered.contains(needle));
    if unresolved && !reason.contains("MAIL_SERVER") {
        format!("{} | Controleer of MAIL_SERVER correct is ingesteld en bereikbaar is.", reason)
    } else {
        reason.to_string()
    }
}
