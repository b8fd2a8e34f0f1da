use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use calc_core::contact::ContactNotifier;
use calc_core::materials::MaterialCatalog;
use calc_core::metrics::UsageMetrics;
use calc_core::session_log::LogStore;

use crate::cookies::SessionCookies;

/// Shared state handed to every handler
pub struct AppState {
    pub catalog: MaterialCatalog,
    pub store: Arc<dyn LogStore>,
    pub metrics: Arc<dyn UsageMetrics>,
    pub notifier: ContactNotifier,
    pub cookies: SessionCookies,
    /// Rendered into the contact form when verification is enabled
    pub recaptcha_site_key: Option<String>,
    request_seq: AtomicU64,
}

impl AppState {
    pub fn new(
        catalog: MaterialCatalog,
        store: Arc<dyn LogStore>,
        metrics: Arc<dyn UsageMetrics>,
        notifier: ContactNotifier,
        cookies: SessionCookies,
    ) -> Self {
        AppState {
            catalog,
            store,
            metrics,
            notifier,
            cookies,
            recaptcha_site_key: None,
            request_seq: AtomicU64::new(1),
        }
    }

    pub fn with_recaptcha_site_key(mut self, key: impl Into<String>) -> Self {
        self.recaptcha_site_key = Some(key.into());
        self
    }

    /// Id for a request that did not bring its own `x-request-id`
    pub fn next_request_id(&self) -> String {
        let id = self.request_seq.fetch_add(1, Ordering::Relaxed);
        format!("req-{id:08x}")
    }
}
