//! # Materials Catalog
//!
//! Static mapping from material name to a unit cost coefficient. The
//! coefficient scales an area (m²) into a cost quantity.
//!
//! ## Default Catalog
//!
//! | material    | coefficient |
//! |-------------|-------------|
//! | `hout`      | 10          |
//! | `metaal`    | 20          |
//! | `kunststof` | 5           |
//!
//! A catalog can also be loaded from a JSON object file such as
//! `{"hout": 10, "beton": 35.5}`.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::materials::MaterialCatalog;
//!
//! let catalog = MaterialCatalog::default();
//! assert_eq!(catalog.unit_cost("metaal").unwrap(), 20.0);
//! assert!(catalog.unit_cost("onbekend").is_err());
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// One catalog row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialEntry {
    pub name: String,
    pub unit_cost: f64,
}

/// Material name -> unit cost coefficient.
///
/// Serializes as a plain JSON object. Names are unique and iterate in
/// sorted order. Construct through [`MaterialCatalog::from_entries`] or
/// [`MaterialCatalog::load`] so every cost is validated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MaterialCatalog {
    entries: BTreeMap<String, f64>,
}

impl MaterialCatalog {
    /// Build a catalog from (name, unit_cost) pairs.
    ///
    /// Fails when a name is blank or a cost is not a positive finite number.
    /// Later duplicates replace earlier ones.
    pub fn from_entries<I, S>(entries: I) -> CalcResult<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (name, cost) in entries {
            let name = name.into();
            validate_entry(&name, cost)?;
            map.insert(name, cost);
        }
        Ok(MaterialCatalog { entries: map })
    }

    /// Load a catalog from a JSON object file.
    pub fn load(path: &Path) -> CalcResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            CalcError::file_error("read catalog", path.display().to_string(), e.to_string())
        })?;
        let raw: BTreeMap<String, f64> =
            serde_json::from_str(&contents).map_err(|e| CalcError::SerializationError {
                reason: format!("Invalid catalog JSON in {}: {}", path.display(), e),
            })?;
        Self::from_entries(raw)
    }

    /// Look up the unit cost of a material.
    pub fn unit_cost(&self, material: &str) -> CalcResult<f64> {
        self.entries
            .get(material)
            .copied()
            .ok_or_else(|| CalcError::invalid_material(material))
    }

    pub fn contains(&self, material: &str) -> bool {
        self.entries.contains_key(material)
    }

    /// Material names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> Vec<MaterialEntry> {
        self.entries
            .iter()
            .map(|(name, cost)| MaterialEntry {
                name: name.clone(),
                unit_cost: *cost,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MaterialCatalog {
    fn default() -> Self {
        let entries = [("hout", 10.0), ("metaal", 20.0), ("kunststof", 5.0)]
            .into_iter()
            .map(|(name, cost)| (name.to_string(), cost))
            .collect();
        MaterialCatalog { entries }
    }
}

fn validate_entry(name: &str, cost: f64) -> CalcResult<()> {
    if name.trim().is_empty() {
        return Err(CalcError::validation("material", "Material name must not be empty"));
    }
    if !cost.is_finite() || cost <= 0.0 {
        return Err(CalcError::invalid_numeric_input(
            format!("unit_cost[{}]", name),
            cost.to_string(),
            "Unit cost must be a positive number",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_catalog() {
        let catalog = MaterialCatalog::default();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.unit_cost("hout").unwrap(), 10.0);
        assert_eq!(catalog.unit_cost("metaal").unwrap(), 20.0);
        assert_eq!(catalog.unit_cost("kunststof").unwrap(), 5.0);
    }

    #[test]
    fn test_unknown_material() {
        let err = MaterialCatalog::default().unit_cost("onbekend").unwrap_err();
        assert_eq!(err, CalcError::invalid_material("onbekend"));
    }

    #[test]
    fn test_lookup_is_exact() {
        let catalog = MaterialCatalog::default();
        assert!(catalog.unit_cost("Hout").is_err());
        assert!(catalog.unit_cost(" hout").is_err());
    }

    #[test]
    fn test_names_sorted() {
        let names: Vec<_> = MaterialCatalog::default().names().map(str::to_string).collect();
        assert_eq!(names, vec!["hout", "kunststof", "metaal"]);
    }

    #[test]
    fn test_rejects_bad_costs() {
        assert!(MaterialCatalog::from_entries([("glas", 0.0)]).is_err());
        assert!(MaterialCatalog::from_entries([("glas", -3.0)]).is_err());
        assert!(MaterialCatalog::from_entries([("glas", f64::NAN)]).is_err());
        assert!(MaterialCatalog::from_entries([("  ", 4.0)]).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"beton": 35.5, "hout": 12}}"#).unwrap();

        let catalog = MaterialCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.unit_cost("beton").unwrap(), 35.5);
        assert_eq!(catalog.unit_cost("hout").unwrap(), 12.0);
        assert!(!catalog.contains("metaal"));
    }

    #[test]
    fn test_load_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = MaterialCatalog::load(file.path()).unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_serializes_as_object() {
        let json = serde_json::to_string(&MaterialCatalog::default()).unwrap();
        assert_eq!(json, r#"{"hout":10.0,"kunststof":5.0,"metaal":20.0}"#);
    }
}
