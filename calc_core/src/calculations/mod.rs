//! # Calculations
//!
//! Each calculation follows the pattern:
//!
//! - `*Form` - Raw submitted values (strings, as they arrive from a form)
//! - `*Input` - Parsed, validated parameters
//! - `*Result` - Calculation results (JSON-serializable)
//! - `calculate(input, ..) -> Result<*Result, CalcError>` - Pure calculation function
//!
//! Calculations have no side effects. Logging a result is a separate step
//! the caller performs only after a successful calculation.
//!
//! ## Available Calculations
//!
//! - [`estimate`] - Material area, quantity and price estimate

pub mod estimate;

// Re-export commonly used types
pub use estimate::{calculate, EstimateForm, EstimateInput, EstimateResult};
