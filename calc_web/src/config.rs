//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Material calculator web server
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Directory for per-session calculation logs
    #[arg(long, env = "LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// JSON file with a material catalog (`{"name": unit_cost}`); built-in catalog when absent
    #[arg(long, env = "MATERIALS_FILE")]
    pub materials: Option<PathBuf>,

    /// Do not write the flat CSV log
    #[arg(long)]
    pub no_csv: bool,

    /// Do not write the JSON Lines log (disables history)
    #[arg(long)]
    pub no_jsonl: bool,

    #[command(flatten)]
    pub mail: MailConfig,

    /// Secret used to sign the session cookie; random per process when unset
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// reCAPTCHA site key (public, rendered into the contact form)
    #[arg(long, env = "RECAPTCHA_SITE_KEY")]
    pub recaptcha_site_key: Option<String>,

    /// reCAPTCHA secret key; verification is enabled only when both keys are set
    #[arg(long, env = "RECAPTCHA_SECRET_KEY", hide_env_values = true)]
    pub recaptcha_secret_key: Option<String>,
}

/// SMTP settings for the contact form
#[derive(clap::Args, Debug, Clone)]
pub struct MailConfig {
    #[arg(long = "mail-server", env = "MAIL_SERVER", default_value = "smtp.gmail.com")]
    pub server: String,

    /// STARTTLS submission port
    #[arg(long = "mail-port", env = "MAIL_PORT", default_value_t = 587)]
    pub port: u16,

    #[arg(long = "mail-username", env = "MAIL_USERNAME")]
    pub username: Option<String>,

    #[arg(long = "mail-password", env = "MAIL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Sender address; defaults to the username
    #[arg(long = "mail-sender", env = "MAIL_DEFAULT_SENDER")]
    pub default_sender: Option<String>,

    /// Where contact messages are delivered; defaults to the sender
    #[arg(long = "contact-recipient", env = "CONTACT_RECIPIENT")]
    pub recipient: Option<String>,
}

impl MailConfig {
    pub fn sender(&self) -> Option<&str> {
        self.default_sender.as_deref().or(self.username.as_deref())
    }

    pub fn recipient(&self) -> Option<&str> {
        self.recipient.as_deref().or_else(|| self.sender())
    }

    /// Credentials present for an authenticated SMTP session
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some((u, p)),
            _ => None,
        }
    }
}

impl Config {
    /// Both reCAPTCHA keys, when verification is enabled
    pub fn recaptcha_keys(&self) -> Option<(&str, &str)> {
        match (self.recaptcha_site_key.as_deref(), self.recaptcha_secret_key.as_deref()) {
            (Some(site), Some(secret)) if !site.is_empty() && !secret.is_empty() => Some((site, secret)),
            _ => None,
        }
    }
}
