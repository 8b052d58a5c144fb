//! Unit types and conversion constants
//!
//! Metric units plus the household measures used in Brazilian menus
//! (colher, xícara, concha, copo, fatia...). Lookups are accent-insensitive.

use serde::Serialize;

use super::normalize::fold;

/// Category of a measurement unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCategory {
    /// Mass units, converted to grams
    Weight,
    /// Volume units, converted to milliliters
    Volume,
    /// Discrete units (unidade, fatia, porção), resolved through the food's portion weight
    Count,
}

/// A recognized unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitInfo {
    /// Canonical spelling, e.g. "colher de sopa" for "colheres de sopa"
    pub canonical: &'static str,
    pub category: UnitCategory,
    /// Grams (weight), milliliters (volume) or units (count) per one of this unit
    pub factor: f64,
}

// ============================================================================
// Conversion Constants
// ============================================================================

/// Standard portion weight used when neither the text nor the food gives one
pub const DEFAULT_PORTION_GRAMS: f64 = 100.0;

/// Canonical unit for an omitted quantity
pub const PORTION_UNIT: &str = "porcao";

/// Canonical unit for a bare count ("2 bananas")
pub const COUNT_UNIT: &str = "unidade";

pub const G_PER_MG: f64 = 0.001;
pub const G_PER_KG: f64 = 1000.0;

pub const ML_PER_LITER: f64 = 1000.0;
pub const ML_PER_COLHER_SOPA: f64 = 15.0;
pub const ML_PER_COLHER_SOBREMESA: f64 = 10.0;
pub const ML_PER_COLHER_CHA: f64 = 5.0;
pub const ML_PER_XICARA: f64 = 240.0;
pub const ML_PER_COPO: f64 = 200.0;
pub const ML_PER_CONCHA: f64 = 100.0;

use UnitCategory::{Count, Volume, Weight};

/// (alias, canonical, category, factor). Aliases are folded (no accents).
const UNIT_TABLE: &[(&str, &str, UnitCategory, f64)] = &[
    ("g", "g", Weight, 1.0),
    ("gr", "g", Weight, 1.0),
    ("grama", "g", Weight, 1.0),
    ("gramas", "g", Weight, 1.0),
    ("gram", "g", Weight, 1.0),
    ("grams", "g", Weight, 1.0),
    ("mg", "mg", Weight, G_PER_MG),
    ("kg", "kg", Weight, G_PER_KG),
    ("quilo", "kg", Weight, G_PER_KG),
    ("quilos", "kg", Weight, G_PER_KG),
    ("ml", "ml", Volume, 1.0),
    ("l", "l", Volume, ML_PER_LITER),
    ("litro", "l", Volume, ML_PER_LITER),
    ("litros", "l", Volume, ML_PER_LITER),
    ("colher de sopa", "colher de sopa", Volume, ML_PER_COLHER_SOPA),
    ("colheres de sopa", "colher de sopa", Volume, ML_PER_COLHER_SOPA),
    ("colher de sobremesa", "colher de sobremesa", Volume, ML_PER_COLHER_SOBREMESA),
    ("colheres de sobremesa", "colher de sobremesa", Volume, ML_PER_COLHER_SOBREMESA),
    ("colher de cha", "colher de cha", Volume, ML_PER_COLHER_CHA),
    ("colheres de cha", "colher de cha", Volume, ML_PER_COLHER_CHA),
    ("colher", "colher de sopa", Volume, ML_PER_COLHER_SOPA),
    ("colheres", "colher de sopa", Volume, ML_PER_COLHER_SOPA),
    ("tbsp", "colher de sopa", Volume, ML_PER_COLHER_SOPA),
    ("tsp", "colher de cha", Volume, ML_PER_COLHER_CHA),
    ("xicara", "xicara", Volume, ML_PER_XICARA),
    ("xicaras", "xicara", Volume, ML_PER_XICARA),
    ("cup", "xicara", Volume, ML_PER_XICARA),
    ("cups", "xicara", Volume, ML_PER_XICARA),
    ("copo", "copo", Volume, ML_PER_COPO),
    ("copos", "copo", Volume, ML_PER_COPO),
    ("concha", "concha", Volume, ML_PER_CONCHA),
    ("conchas", "concha", Volume, ML_PER_CONCHA),
    ("unidade", COUNT_UNIT, Count, 1.0),
    ("unidades", COUNT_UNIT, Count, 1.0),
    ("un", COUNT_UNIT, Count, 1.0),
    ("und", COUNT_UNIT, Count, 1.0),
    ("unid", COUNT_UNIT, Count, 1.0),
    ("unit", COUNT_UNIT, Count, 1.0),
    ("units", COUNT_UNIT, Count, 1.0),
    ("piece", COUNT_UNIT, Count, 1.0),
    ("pieces", COUNT_UNIT, Count, 1.0),
    ("pedaco", COUNT_UNIT, Count, 1.0),
    ("pedacos", COUNT_UNIT, Count, 1.0),
    ("fatia", "fatia", Count, 1.0),
    ("fatias", "fatia", Count, 1.0),
    ("slice", "fatia", Count, 1.0),
    ("slices", "fatia", Count, 1.0),
    ("porcao", PORTION_UNIT, Count, 1.0),
    ("porcoes", PORTION_UNIT, Count, 1.0),
    ("portion", PORTION_UNIT, Count, 1.0),
    ("serving", PORTION_UNIT, Count, 1.0),
    ("servings", PORTION_UNIT, Count, 1.0),
];

/// Longest alias, in words; the parser tries multi-word units first
pub const MAX_UNIT_WORDS: usize = 3;

// ============================================================================
// Unit Recognition
// ============================================================================

/// Recognize a unit string (accent- and case-insensitive)
pub fn lookup_unit(unit: &str) -> Option<UnitInfo> {
    let folded = fold(unit);
    UNIT_TABLE
        .iter()
        .find(|(alias, ..)| *alias == folded)
        .map(|(_, canonical, category, factor)| UnitInfo {
            canonical: *canonical,
            category: *category,
            factor: *factor,
        })
}

/// Grams per one of a weight unit
pub fn grams_per_unit(unit: &str) -> Option<f64> {
    lookup_unit(unit)
        .filter(|u| u.category == Weight)
        .map(|u| u.factor)
}

/// Milliliters per one of a volume unit
pub fn ml_per_unit(unit: &str) -> Option<f64> {
    lookup_unit(unit)
        .filter(|u| u.category == Volume)
        .map(|u| u.factor)
}

pub fn categorize_unit(unit: &str) -> Option<UnitCategory> {
    lookup_unit(unit).map(|u| u.category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_units() {
        assert_eq!(categorize_unit("g"), Some(Weight));
        assert_eq!(categorize_unit("KG"), Some(Weight));
        assert_eq!(categorize_unit("ml"), Some(Volume));
        assert_eq!(categorize_unit("Xícaras"), Some(Volume));
        assert_eq!(categorize_unit("fatia"), Some(Count));
        assert_eq!(categorize_unit("porção"), Some(Count));
        assert_eq!(categorize_unit("arroz"), None);
    }

    #[test]
    fn test_grams_per_unit() {
        assert_eq!(grams_per_unit("g"), Some(1.0));
        assert_eq!(grams_per_unit("kg"), Some(G_PER_KG));
        assert_eq!(grams_per_unit("ml"), None);
    }

    #[test]
    fn test_ml_per_unit() {
        assert_eq!(ml_per_unit("colheres de sopa"), Some(ML_PER_COLHER_SOPA));
        assert_eq!(ml_per_unit("colher de chá"), Some(ML_PER_COLHER_CHA));
        assert_eq!(ml_per_unit("l"), Some(ML_PER_LITER));
        assert_eq!(ml_per_unit("g"), None);
    }

    #[test]
    fn test_canonical_spelling() {
        assert_eq!(lookup_unit("Colheres de Sopa").unwrap().canonical, "colher de sopa");
        assert_eq!(lookup_unit("un").unwrap().canonical, COUNT_UNIT);
    }
}
