//! # Unit Types
//!
//! Length units accepted by the calculator form and lightweight newtype
//! wrappers for metric quantities.
//!
//! All calculations run in meters. Raw form input is multiplied by the
//! factor of the submitted unit symbol:
//!
//! | symbol | factor |
//! |--------|--------|
//! | `mm`   | 0.001  |
//! | `cm`   | 0.01   |
//! | `m`    | 1.0    |
//! | other  | 1.0    |
//!
//! An unrecognized symbol falls back to meters instead of failing.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::units::{LengthUnit, Meters};
//!
//! let unit = LengthUnit::from_symbol("cm");
//! let length: Meters = unit.to_meters(250.0);
//! assert_eq!(length.0, 2.5);
//!
//! assert_eq!(LengthUnit::from_symbol("furlong"), LengthUnit::Meter);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

// ============================================================================
// Length Unit Symbols
// ============================================================================

/// Length unit selectable on the calculator form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LengthUnit {
    #[serde(rename = "mm")]
    Millimeter,
    #[serde(rename = "cm")]
    Centimeter,
    #[default]
    #[serde(rename = "m")]
    Meter,
}

impl LengthUnit {
    /// All selectable units, in form display order
    pub const ALL: [LengthUnit; 3] = [LengthUnit::Millimeter, LengthUnit::Centimeter, LengthUnit::Meter];

    /// Resolve a unit symbol. Total: anything unrecognized is meters.
    pub fn from_symbol(symbol: &str) -> Self {
        match symbol.trim().to_ascii_lowercase().as_str() {
            "mm" => LengthUnit::Millimeter,
            "cm" => LengthUnit::Centimeter,
            _ => LengthUnit::Meter,
        }
    }

    /// Multiplicative factor from this unit to meters
    pub fn factor(self) -> f64 {
        match self {
            LengthUnit::Millimeter => 0.001,
            LengthUnit::Centimeter => 0.01,
            LengthUnit::Meter => 1.0,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            LengthUnit::Millimeter => "mm",
            LengthUnit::Centimeter => "cm",
            LengthUnit::Meter => "m",
        }
    }

    /// Convert a raw value in this unit to meters
    pub fn to_meters(self, raw: f64) -> Meters {
        Meters(raw * self.factor())
    }
}

impl std::fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Factor for a raw unit symbol. Shorthand for `LengthUnit::from_symbol(s).factor()`.
pub fn unit_factor(symbol: &str) -> f64 {
    LengthUnit::from_symbol(symbol).factor()
}

// ============================================================================
// Metric Quantities
// ============================================================================

/// Length in meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meters(pub f64);

/// Area in square meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SquareMeters(pub f64);

impl Mul for Meters {
    type Output = SquareMeters;
    fn mul(self, rhs: Self) -> SquareMeters {
        SquareMeters(self.0 * rhs.0)
    }
}

// ============================================================================
// Arithmetic Implementations (macro to reduce boilerplate)
// ============================================================================

macro_rules! impl_arithmetic {
    ($type:ty) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl $type {
            /// Get the raw f64 value
            pub fn value(self) -> f64 {
                self.0
            }
        }
    };
}

impl_arithmetic!(Meters);
impl_arithmetic!(SquareMeters);
