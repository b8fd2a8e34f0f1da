//! Signed session cookie.
//!
//! The cookie carries `{session_id}.{mac}` where `mac` is a keyed BLAKE3
//! hash of the id. A cookie with a bad signature or a malformed id is
//! treated as absent. No expiry is set, so the browser drops it at the end
//! of its session.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use calc_core::session::{SessionContext, SessionId};

pub const SESSION_COOKIE: &str = "sessie";

const KEY_CONTEXT: &str = "materiaalcalculator 2026-10 session cookie";

/// Signs and verifies session cookies
#[derive(Clone)]
pub struct SessionCookies {
    key: [u8; 32],
}

impl SessionCookies {
    /// Derive the signing key from a configured secret
    pub fn from_secret(secret: &str) -> Self {
        SessionCookies {
            key: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()),
        }
    }

    /// Key that only lives as long as the process
    pub fn ephemeral() -> Self {
        let seed = format!("{}{}", uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
        SessionCookies::from_secret(&seed)
    }

    fn sign(&self, id: &SessionId) -> blake3::Hash {
        blake3::keyed_hash(&self.key, id.as_str().as_bytes())
    }

    /// Cookie value for `id`
    pub fn encode(&self, id: &SessionId) -> String {
        format!("{}.{}", id, self.sign(id).to_hex())
    }

    /// Verify a cookie value and return the session id it carries
    pub fn decode(&self, value: &str) -> Option<SessionId> {
        let (raw_id, raw_mac) = value.split_once('.')?;
        let id = SessionId::parse(raw_id).ok()?;
        let mac = blake3::Hash::from_hex(raw_mac).ok()?;
        // blake3::Hash equality is constant-time
        (mac == self.sign(&id)).then_some(id)
    }

    /// Session context for an incoming request
    pub fn session_from(&self, headers: &HeaderMap) -> SessionContext {
        cookie_values(headers, SESSION_COOKIE)
            .find_map(|value| self.decode(value))
            .map(SessionContext::existing)
            .unwrap_or_else(SessionContext::anonymous)
    }

    /// `Set-Cookie` header handing `id` to the client
    pub fn set_cookie(&self, id: &SessionId) -> Option<(axum::http::HeaderName, HeaderValue)> {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            self.encode(id)
        );
        HeaderValue::from_str(&cookie).ok().map(|v| (SET_COOKIE, v))
    }
}

/// All values of cookie `name` across every `Cookie` header
fn cookie_values<'a>(headers: &'a HeaderMap, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(move |pair| {
            let (k, v) = pair.trim().split_once('=')?;
            (k.trim() == name).then(|| v.trim())
        })
}
