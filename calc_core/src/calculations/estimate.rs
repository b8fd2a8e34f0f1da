//! # Material Estimate
//!
//! Computes covered area, material quantity and price for one component.
//!
//! ## Formulas
//!
//! All lengths are converted to meters first, then:
//!
//! ```text
//! area     = round2(length × width)
//! quantity = round2(area × (1 + margin/100) × unit_cost)
//! price    = round2(quantity × 1.5)
//! ```
//!
//! Each step uses the rounded value of the previous one, so the numbers on
//! the results page always multiply out exactly as shown.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::calculations::estimate::{calculate, EstimateForm};
//! use calc_core::materials::MaterialCatalog;
//!
//! let form = EstimateForm {
//!     material: Some("hout".to_string()),
//!     length: Some("4".to_string()),
//!     width: Some("2.5".to_string()),
//!     margin_percent: Some("5".to_string()),
//!     ..Default::default()
//! };
//!
//! let catalog = MaterialCatalog::default();
//! let input = form.parse(&catalog).unwrap();
//! let result = calculate(&input, &catalog).unwrap();
//!
//! assert_eq!(result.area, 10.0);
//! assert_eq!(result.quantity, 105.0);
//! assert_eq!(result.price, 157.5);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::materials::MaterialCatalog;
use crate::units::{LengthUnit, Meters};

/// Fixed markup from material quantity to price
pub const PRICE_MARKUP: f64 = 1.5;

/// Unit label shown next to the area
pub const AREA_UNIT: &str = "m²";

/// Raw calculator form as submitted. Every field is an unparsed string.
///
/// Field names on the wire match the HTML form (`onderdeel`, `materiaal`,
/// `lengte`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimateForm {
    /// Free-text component label (e.g. "dak", "schutting")
    #[serde(rename = "onderdeel", default)]
    pub label: Option<String>,

    #[serde(rename = "materiaal", default)]
    pub material: Option<String>,

    #[serde(rename = "lengte", default)]
    pub length: Option<String>,

    #[serde(rename = "breedte", default)]
    pub width: Option<String>,

    /// Optional; empty means absent
    #[serde(rename = "hoogte", default)]
    pub height: Option<String>,

    /// Optional slope angle in degrees; empty means absent
    #[serde(rename = "helling", default)]
    pub slope: Option<String>,

    /// Margin percentage; empty means 0
    #[serde(rename = "marge", default)]
    pub margin_percent: Option<String>,

    /// Unit symbol for length, width and height
    #[serde(rename = "eenheid", default)]
    pub unit: Option<String>,
}

impl EstimateForm {
    /// Parse and validate the raw form against a catalog.
    ///
    /// The material is checked first; numeric fields are only parsed for
    /// a known material.
    pub fn parse(&self, catalog: &MaterialCatalog) -> CalcResult<EstimateInput> {
        let material = self.material.as_deref().unwrap_or("").trim();
        if !catalog.contains(material) {
            return Err(CalcError::invalid_material(material));
        }

        let unit = LengthUnit::from_symbol(self.unit.as_deref().unwrap_or(""));

        let length = unit.to_meters(parse_required("lengte", self.length.as_deref())?);
        let width = unit.to_meters(parse_required("breedte", self.width.as_deref())?);
        let height = parse_optional("hoogte", self.height.as_deref())?
            .filter(|h| *h != 0.0)
            .map(|h| unit.to_meters(h));
        let slope = parse_optional("helling", self.slope.as_deref())?;
        let margin_percent = parse_optional("marge", self.margin_percent.as_deref())?.unwrap_or(0.0);

        let label = self
            .label
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);

        let input = EstimateInput {
            label,
            material: material.to_string(),
            length,
            width,
            height,
            slope,
            margin_percent,
            unit,
        };
        input.validate()?;
        Ok(input)
    }
}

/// Parsed calculator input. Lengths are already in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateInput {
    pub label: Option<String>,
    pub material: String,
    pub length: Meters,
    pub width: Meters,
    pub height: Option<Meters>,
    /// Slope angle in degrees
    pub slope: Option<f64>,
    pub margin_percent: f64,
    /// Unit the raw lengths were submitted in
    pub unit: LengthUnit,
}

impl EstimateInput {
    /// Validate ranges. Parsing already guarantees finiteness for form input;
    /// this also covers inputs built directly.
    pub fn validate(&self) -> CalcResult<()> {
        if !self.length.0.is_finite() || self.length.0 <= 0.0 {
            return Err(CalcError::invalid_numeric_input(
                "lengte",
                self.length.0.to_string(),
                "Length must be a positive number",
            ));
        }
        if !self.width.0.is_finite() || self.width.0 <= 0.0 {
            return Err(CalcError::invalid_numeric_input(
                "breedte",
                self.width.0.to_string(),
                "Width must be a positive number",
            ));
        }
        if let Some(h) = self.height {
            if h.0 < 0.0 {
                return Err(CalcError::invalid_numeric_input(
                    "hoogte",
                    h.0.to_string(),
                    "Height cannot be negative",
                ));
            }
        }
        if !self.margin_percent.is_finite() || self.margin_percent < 0.0 {
            return Err(CalcError::invalid_numeric_input(
                "marge",
                self.margin_percent.to_string(),
                "Margin cannot be negative",
            ));
        }
        Ok(())
    }
}

/// Computed estimate. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateResult {
    pub label: Option<String>,
    pub material: String,
    /// Length in meters
    pub length: f64,
    /// Width in meters
    pub width: f64,
    /// Height in meters
    pub height: Option<f64>,
    /// Slope angle in degrees
    pub slope: Option<f64>,
    pub margin_percent: f64,
    /// Unit symbol the lengths were submitted in
    pub unit: String,
    /// Covered area in m², rounded to 2 decimals
    pub area: f64,
    /// Material quantity, rounded to 2 decimals
    pub quantity: f64,
    pub area_unit: String,
    /// Price, rounded to 2 decimals
    pub price: f64,
}

/// Run the estimate for a parsed input.
///
/// # Errors
///
/// * `InvalidMaterial` - material not in `catalog`
/// * `InvalidNumericInput` - a value is out of range
pub fn calculate(input: &EstimateInput, catalog: &MaterialCatalog) -> CalcResult<EstimateResult> {
    let unit_cost = catalog.unit_cost(&input.material)?;
    input.validate()?;

    let area = round2((input.length * input.width).value());
    let quantity = round2(area * (1.0 + input.margin_percent / 100.0) * unit_cost);
    let price = round2(quantity * PRICE_MARKUP);

    // Individually finite dimensions can still overflow once multiplied
    if !(area.is_finite() && quantity.is_finite() && price.is_finite()) {
        return Err(CalcError::invalid_numeric_input(
            "lengte",
            format!("{} x {}", input.length.value(), input.width.value()),
            "Dimensions are too large to estimate",
        ));
    }

    Ok(EstimateResult {
        label: input.label.clone(),
        material: input.material.clone(),
        length: input.length.value(),
        width: input.width.value(),
        height: input.height.map(Meters::value),
        slope: input.slope,
        margin_percent: input.margin_percent,
        unit: input.unit.symbol().to_string(),
        area,
        quantity,
        area_unit: AREA_UNIT.to_string(),
        price,
    })
}

/// Parse a raw form and calculate in one step.
pub fn estimate(form: &EstimateForm, catalog: &MaterialCatalog) -> CalcResult<EstimateResult> {
    let input = form.parse(catalog)?;
    calculate(&input, catalog)
}

/// Round half away from zero to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn parse_number(field: &str, raw: &str) -> CalcResult<f64> {
    let value: f64 = raw
        .parse()
        .map_err(|_| CalcError::invalid_numeric_input(field, raw, "Not a number"))?;
    if !value.is_finite() {
        return Err(CalcError::invalid_numeric_input(field, raw, "Number must be finite"));
    }
    Ok(value)
}

fn parse_required(field: &str, raw: Option<&str>) -> CalcResult<f64> {
    let raw = raw.unwrap_or("").trim();
    if raw.is_empty() {
        return Err(CalcError::invalid_numeric_input(field, raw, "Value is required"));
    }
    parse_number(field, raw)
}

fn parse_optional(field: &str, raw: Option<&str>) -> CalcResult<Option<f64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_number(field, raw).map(Some),
    }
}
