//! Material calculator web server
//!
//! Serves the estimate form, per-session history and the contact form.

mod config;
mod cookies;
mod mail;
mod pages;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Context;
use calc_core::contact::{ContactNotifier, MailTransport};
use calc_core::materials::MaterialCatalog;
use calc_core::metrics::MaterialUsageCounter;
use calc_core::session_log::{FileLogStore, LogFormats};
use clap::Parser;

use crate::config::Config;
use crate::cookies::SessionCookies;
use crate::mail::{RecaptchaVerifier, SmtpMailTransport, UnconfiguredTransport};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,calc_web=debug".into()),
        )
        .init();

    let config = Config::parse();
    let state = build_state(&config)?;

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(addr = %config.bind, log_dir = %config.log_dir.display(), "listening");

    axum::serve(listener, routes::router(Arc::new(state)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let catalog = match &config.materials {
        Some(path) => MaterialCatalog::load(path)
            .with_context(|| format!("failed to load material catalog {}", path.display()))?,
        None => MaterialCatalog::default(),
    };
    tracing::info!(materials = catalog.len(), "material catalog ready");

    let formats = LogFormats {
        csv: !config.no_csv,
        jsonl: !config.no_jsonl,
    };
    if !formats.jsonl {
        tracing::warn!("JSONL logging disabled; history will always be empty");
    }
    let store = FileLogStore::new(&config.log_dir).with_formats(formats);

    let (recipient, transport): (String, Arc<dyn MailTransport>) =
        match (config.mail.recipient(), config.mail.credentials()) {
            (Some(recipient), Some(_)) => (
                recipient.to_string(),
                Arc::new(SmtpMailTransport::new(&config.mail)?),
            ),
            (recipient, _) => {
                tracing::warn!("mail credentials not configured; contact form will report delivery errors");
                (recipient.unwrap_or_default().to_string(), Arc::new(UnconfiguredTransport))
            }
        };
    let mut notifier = ContactNotifier::new(recipient, transport);

    if let Some((_, secret)) = config.recaptcha_keys() {
        notifier = notifier.with_verifier(Arc::new(RecaptchaVerifier::new(secret)));
    } else {
        tracing::info!("reCAPTCHA keys not set; contact form relies on the honeypot only");
    }

    let cookies = match config.secret_key.as_deref().filter(|s| !s.is_empty()) {
        Some(secret) => SessionCookies::from_secret(secret),
        None => {
            tracing::warn!("SECRET_KEY not set; sessions will not survive a restart");
            SessionCookies::ephemeral()
        }
    };

    let mut state = AppState::new(
        catalog,
        Arc::new(store),
        Arc::new(MaterialUsageCounter::new()),
        notifier,
        cookies,
    );
    if let Some((site_key, _)) = config.recaptcha_keys() {
        state = state.with_recaptcha_site_key(site_key);
    }
    Ok(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_state_without_mail_or_captcha() {
        let config = Config::parse_from(["calc_web"]);
        let state = build_state(&config).unwrap();
        assert_eq!(state.catalog.len(), 3);
        assert!(state.recaptcha_site_key.is_none());
        assert!(!state.notifier.requires_verification());
    }

    #[test]
    fn test_build_state_with_captcha() {
        let config = Config::parse_from([
            "calc_web",
            "--recaptcha-site-key",
            "site",
            "--recaptcha-secret-key",
            "secret",
        ]);
        let state = build_state(&config).unwrap();
        assert_eq!(state.recaptcha_site_key.as_deref(), Some("site"));
        assert!(state.notifier.requires_verification());
    }

    #[test]
    fn test_build_state_rejects_missing_catalog() {
        let config = Config::parse_from(["calc_web", "--materials", "/nonexistent/materials.json"]);
        assert!(build_state(&config).is_err());
    }
}
