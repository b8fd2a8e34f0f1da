//! # calc_core - Material Estimate Engine
//!
//! `calc_core` is the computational heart of the material calculator. It
//! turns submitted dimensions into area, quantity and price estimates, keeps
//! an append-only per-session log of them, and validates contact-form
//! submissions before they are mailed.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: Pure functions that take input and return results
//! - **Injected collaborators**: Log storage, mail transport, bot
//!   verification and usage metrics are traits supplied by the caller
//! - **Rich Errors**: Structured error types, not just strings
//!
//! ## Quick Start
//!
//! ```rust
//! use calc_core::calculations::estimate::{estimate, EstimateForm};
//! use calc_core::materials::MaterialCatalog;
//!
//! let form = EstimateForm {
//!     material: Some("hout".to_string()),
//!     length: Some("250".to_string()),
//!     width: Some("150".to_string()),
//!     unit: Some("cm".to_string()),
//!     ..Default::default()
//! };
//!
//! let result = estimate(&form, &MaterialCatalog::default()).unwrap();
//! assert_eq!(result.area, 3.75);
//!
//! let json = serde_json::to_string_pretty(&result).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`materials`] - Material catalog (name -> unit cost)
//! - [`units`] - Length unit symbols and metric newtypes
//! - [`calculations`] - The estimate calculator
//! - [`session`] - Session identifiers and log keys
//! - [`session_log`] - Append-only session logs and history reads
//! - [`contact`] - Contact-form validation and dispatch
//! - [`metrics`] - Per-material usage counting
//! - [`errors`] - Structured error types

pub mod calculations;
pub mod contact;
pub mod errors;
pub mod materials;
pub mod metrics;
pub mod session;
pub mod session_log;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use calculations::{EstimateForm, EstimateInput, EstimateResult};
pub use contact::{ContactForm, ContactNotifier, HumanVerifier, MailTransport, OutgoingMail};
pub use errors::{CalcError, CalcResult};
pub use materials::MaterialCatalog;
pub use metrics::{MaterialUsageCounter, UsageMetrics};
pub use session::{LogKey, SessionContext, SessionId};
pub use session_log::{FileLogStore, LogFormats, LogRecord, LogStore, MemoryLogStore};
pub use units::LengthUnit;
