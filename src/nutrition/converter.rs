//! Unit conversion functions
//!
//! Turns a parsed (quantity, unit) into the multiplier applied to a nutrient
//! fact's stored values.

use crate::models::{FactBasis, NutrientFact};

use super::units::{lookup_unit, UnitCategory, DEFAULT_PORTION_GRAMS};

/// Convert a quantity to grams. Volume converts at 1 g/ml.
/// Returns None for count units and unknown units.
pub fn to_grams(quantity: f64, unit: &str) -> Option<f64> {
    let info = lookup_unit(unit)?;
    match info.category {
        UnitCategory::Weight | UnitCategory::Volume => Some(quantity * info.factor),
        UnitCategory::Count => None,
    }
}

/// Grams represented by `quantity` of `unit` for this food, using the
/// food's portion weight for count units
fn grams_for_fact(quantity: f64, unit: &str, fact: &NutrientFact) -> Option<f64> {
    let info = lookup_unit(unit)?;
    match info.category {
        UnitCategory::Weight | UnitCategory::Volume => Some(quantity * info.factor),
        UnitCategory::Count => {
            Some(quantity * info.factor * fact.portion_grams.unwrap_or(DEFAULT_PORTION_GRAMS))
        }
    }
}

/// Calculate the multiplier for a fact's stored nutrition
///
/// Examples:
/// - 80 g of a per-100 g food -> 0.8
/// - 2 unidades of a per-100 g food with 50 g portions -> 1.0
/// - 2 unidades of a per-unit food -> 2.0
/// - 120 g of a per-unit food with 60 g portions -> 2.0
pub fn fact_multiplier(quantity: f64, unit: &str, fact: &NutrientFact) -> f64 {
    let quantity = if quantity.is_finite() { quantity.max(0.0) } else { 0.0 };

    match fact.basis {
        FactBasis::Per100g | FactBasis::Per100ml => {
            if let Some(grams) = grams_for_fact(quantity, unit, fact) {
                return grams / 100.0;
            }
            // Unknown unit: treat the quantity as portions
            tracing::warn!(
                "Unit conversion fallback: '{}' for '{}'. Treating {} as portions.",
                unit,
                fact.name,
                quantity
            );
            quantity * fact.portion_grams.unwrap_or(DEFAULT_PORTION_GRAMS) / 100.0
        }
        FactBasis::PerUnit => {
            let info = lookup_unit(unit);
            if let Some(info) = info.filter(|i| i.category == UnitCategory::Count) {
                return quantity * info.factor;
            }
            if let (Some(grams), Some(portion)) = (to_grams(quantity, unit), fact.portion_grams) {
                return grams / portion;
            }
            tracing::warn!(
                "Unit conversion fallback: '{}' for per-unit '{}'. Treating {} as units.",
                unit,
                fact.name,
                quantity
            );
            quantity
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NutritionTotals;

    fn fact(basis: FactBasis, portion_grams: Option<f64>) -> NutrientFact {
        NutrientFact {
            id: 1,
            name: "Teste".to_string(),
            basis,
            portion_grams,
            nutrition: NutritionTotals::zero(),
            notes: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_to_grams() {
        assert_eq!(to_grams(2.0, "kg"), Some(2000.0));
        assert_eq!(to_grams(1.0, "xícara"), Some(240.0));
        assert_eq!(to_grams(1.0, "fatia"), None);
        assert_eq!(to_grams(0.5, "l"), Some(500.0));
    }

    #[test]
    fn test_multiplier_grams_per_100g() {
        let f = fact(FactBasis::Per100g, None);
        assert!((fact_multiplier(80.0, "g", &f) - 0.8).abs() < 1e-9);
        assert!((fact_multiplier(100.0, "gramas", &f) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_multiplier_volume_per_100ml() {
        let f = fact(FactBasis::Per100ml, None);
        assert!((fact_multiplier(180.0, "ml", &f) - 1.8).abs() < 1e-9);
        assert!((fact_multiplier(2.0, "colheres de sopa", &f) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_multiplier_count_uses_portion() {
        let f = fact(FactBasis::Per100g, Some(50.0));
        assert!((fact_multiplier(2.0, "unidade", &f) - 1.0).abs() < 1e-9);
        let no_portion = fact(FactBasis::Per100g, None);
        assert!((fact_multiplier(1.0, "porcao", &no_portion) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_multiplier_per_unit() {
        let f = fact(FactBasis::PerUnit, Some(60.0));
        assert!((fact_multiplier(2.0, "unidades", &f) - 2.0).abs() < 1e-9);
        assert!((fact_multiplier(120.0, "g", &f) - 2.0).abs() < 1e-9);
        let no_portion = fact(FactBasis::PerUnit, None);
        assert!((fact_multiplier(3.0, "g", &no_portion) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_multiplier_unknown_unit_falls_back_to_portions() {
        let f = fact(FactBasis::Per100g, Some(30.0));
        assert!((fact_multiplier(2.0, "punhado", &f) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_multiplier_never_negative() {
        let f = fact(FactBasis::Per100g, None);
        assert_eq!(fact_multiplier(-5.0, "g", &f), 0.0);
        assert_eq!(fact_multiplier(f64::NAN, "g", &f), 0.0);
    }
}
