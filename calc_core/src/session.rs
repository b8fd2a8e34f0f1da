//! # Sessions
//!
//! A session is an opaque random token that scopes log files to one
//! browser. It is not an authentication mechanism.
//!
//! The transport layer owns the session lifecycle (cookie read/write) and
//! hands each request a [`SessionContext`]. The context starts empty for a
//! new visitor; [`SessionContext::ensure`] mints an identifier the first
//! time a calculation succeeds.
//!
//! ```rust
//! use calc_core::session::SessionContext;
//!
//! let mut ctx = SessionContext::anonymous();
//! assert!(ctx.session().is_none());
//!
//! let id = ctx.ensure().clone();
//! assert!(ctx.is_new());
//! assert_eq!(ctx.session(), Some(&id));
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{CalcError, CalcResult};

/// Opaque per-browser session token.
///
/// Always 32 lowercase hex characters, so it is safe to embed in file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh random identifier
    pub fn generate() -> Self {
        SessionId(Uuid::new_v4().simple().to_string())
    }

    /// Validate an identifier received from a client.
    pub fn parse(raw: &str) -> CalcResult<Self> {
        let valid = raw.len() == 32 && raw.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !valid {
            return Err(CalcError::validation("session", "Malformed session identifier"));
        }
        Ok(SessionId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = CalcError;

    fn try_from(value: String) -> CalcResult<Self> {
        SessionId::parse(&value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-request view of the visitor's session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    session: Option<SessionId>,
    is_new: bool,
}

impl SessionContext {
    /// Visitor without a session
    pub fn anonymous() -> Self {
        SessionContext::default()
    }

    /// Visitor presenting an existing session
    pub fn existing(id: SessionId) -> Self {
        SessionContext {
            session: Some(id),
            is_new: false,
        }
    }

    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    /// Return the session id, minting one if the visitor has none yet.
    pub fn ensure(&mut self) -> &SessionId {
        if self.session.is_none() {
            self.is_new = true;
        }
        self.session.get_or_insert_with(SessionId::generate)
    }

    /// True when [`ensure`](Self::ensure) minted the id during this request,
    /// meaning the transport must hand it to the client.
    pub fn is_new(&self) -> bool {
        self.is_new
    }
}

/// Identifies one session log: `{session_id}_{YYYYMMDD}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogKey {
    pub session: SessionId,
    pub date: NaiveDate,
}

impl LogKey {
    pub fn new(session: SessionId, date: NaiveDate) -> Self {
        LogKey { session, date }
    }

    /// File stem shared by the flat and structured logs
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.session, self.date.format("%Y%m%d"))
    }
}

/// Parse a `YYYYMMDD` date stamp.
pub fn parse_date_stamp(raw: &str) -> CalcResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y%m%d")
        .map_err(|_| CalcError::validation("datum", format!("Expected YYYYMMDD, got '{}'", raw)))
}
