//! Meal nutrition calculator
//!
//! Derives the nutrition of one meal text field from the fact table.
//! Pure: the same text and table always give the same result.

use serde::Serialize;

use crate::models::NutritionTotals;

use super::converter::fact_multiplier;
use super::facts::FactTable;
use super::parser::{parse_meal_text, ParsedIngredient};

/// Nutrition contributed by one resolved ingredient
#[derive(Debug, Clone, Serialize)]
pub struct IngredientContribution {
    pub ingredient: ParsedIngredient,
    pub fact_id: i64,
    pub fact_name: String,
    pub multiplier: f64,
    pub nutrition: NutritionTotals,
}

/// Full breakdown of a meal text
#[derive(Debug, Clone, Serialize)]
pub struct MealAnalysis {
    /// `None` when no ingredient resolved
    pub totals: Option<NutritionTotals>,
    pub contributions: Vec<IngredientContribution>,
    /// Fragments with no matching fact; they contribute nothing
    pub unresolved: Vec<ParsedIngredient>,
}

/// Resolve parsed ingredients against the fact table
pub fn compute_ingredients(
    ingredients: Vec<ParsedIngredient>,
    facts: &FactTable,
) -> (Vec<IngredientContribution>, Vec<ParsedIngredient>) {
    let mut contributions = Vec::new();
    let mut unresolved = Vec::new();

    for ingredient in ingredients {
        match facts.lookup(&ingredient.name) {
            Some(fact) => {
                let multiplier = fact_multiplier(ingredient.quantity, &ingredient.unit, fact);
                let nutrition = fact.nutrition.scale(multiplier);
                // Overflowing quantities would turn zero fields into NaN
                if !nutrition.is_valid() {
                    tracing::warn!("Quantity out of range in '{}', ingredient ignored", ingredient.fragment);
                    unresolved.push(ingredient);
                    continue;
                }
                contributions.push(IngredientContribution {
                    fact_id: fact.id,
                    fact_name: fact.name.clone(),
                    multiplier,
                    nutrition,
                    ingredient,
                });
            }
            None => {
                tracing::debug!("No nutrient fact for '{}'", ingredient.name);
                unresolved.push(ingredient);
            }
        }
    }

    (contributions, unresolved)
}

pub fn analyze_meal(text: &str, facts: &FactTable) -> MealAnalysis {
    let (contributions, unresolved) = compute_ingredients(parse_meal_text(text), facts);
    let totals = if contributions.is_empty() {
        None
    } else {
        Some(contributions.iter().map(|c| c.nutrition).sum())
    };

    MealAnalysis { totals, contributions, unresolved }
}

/// Nutrition of a meal text; `None` when nothing in it resolved
pub fn compute_totals(text: &str, facts: &FactTable) -> Option<NutritionTotals> {
    analyze_meal(text, facts).totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FactBasis, NutrientFact};

    fn fact(id: i64, name: &str, basis: FactBasis, portion: Option<f64>, energy: f64, protein: f64) -> NutrientFact {
        NutrientFact {
            id,
            name: name.to_string(),
            basis,
            portion_grams: portion,
            nutrition: NutritionTotals { energy, protein, ..NutritionTotals::zero() },
            notes: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn table() -> FactTable {
        FactTable::new(vec![
            fact(1, "Arroz", FactBasis::Per100g, None, 128.0, 2.5),
            fact(2, "Frango grelhado", FactBasis::Per100g, None, 159.0, 32.0),
            fact(3, "Leite", FactBasis::Per100ml, None, 61.0, 3.2),
            fact(4, "Ovo", FactBasis::PerUnit, Some(50.0), 72.0, 6.3),
        ])
    }

    #[test]
    fn test_scaling_law() {
        let totals = compute_totals("Arroz 100g, Frango grelhado 80g", &table()).unwrap();
        assert!((totals.energy - (128.0 * 1.0 + 159.0 * 0.8)).abs() < 1e-9);
        assert!((totals.protein - (2.5 + 32.0 * 0.8)).abs() < 1e-9);
    }

    #[test]
    fn test_example_against_seeded_names() {
        let t = FactTable::new(vec![
            fact(1, "arroz branco cozido", FactBasis::Per100g, Some(100.0), 128.0, 2.5),
            fact(2, "frango peito grelhado", FactBasis::Per100g, Some(80.0), 159.0, 32.0),
        ]);
        let analysis = analyze_meal("Arroz 100g, Frango grelhado 80g", &t);
        assert!(analysis.unresolved.is_empty());
        let energy = analysis.totals.unwrap().energy;
        assert!((energy - (128.0 + 159.0 * 0.8)).abs() < 1e-9);
    }

    #[test]
    fn test_overflowing_quantity_is_unresolved() {
        let text = format!("Arroz {}kg, Frango grelhado 80g", "9".repeat(306));
        let analysis = analyze_meal(&text, &table());
        assert_eq!(analysis.unresolved.len(), 1);
        assert_eq!(analysis.unresolved[0].name, "Arroz");
        let totals = analysis.totals.unwrap();
        assert!(totals.is_valid());
        assert!((totals.energy - 159.0 * 0.8).abs() < 1e-9);
        assert_eq!(totals.fiber, 0.0);
    }

    #[test]
    fn test_unrecognized_contributes_nothing() {
        let t = table();
        let mixed = analyze_meal("Arroz 100g, Quinoa 50g", &t);
        let only = compute_totals("Arroz 100g", &t);
        assert_eq!(mixed.totals, only);
        assert_eq!(mixed.unresolved.len(), 1);
        assert_eq!(mixed.unresolved[0].name, "Quinoa");
    }

    #[test]
    fn test_nothing_resolved_is_absent() {
        let t = table();
        assert_eq!(compute_totals("Quinoa 50g", &t), None);
        assert_eq!(compute_totals("", &t), None);
        assert_eq!(compute_totals("Arroz", &FactTable::default()), None);
    }

    #[test]
    fn test_zero_quantity_is_present() {
        let totals = compute_totals("Arroz 0g", &table());
        assert_eq!(totals, Some(NutritionTotals::zero()));
    }

    #[test]
    fn test_idempotent() {
        let t = table();
        let text = "2 ovos, Leite 200ml e arroz";
        assert_eq!(compute_totals(text, &t), compute_totals(text, &t));
    }

    #[test]
    fn test_units_and_portions() {
        let analysis = analyze_meal("2 ovos, Leite 200ml e arroz", &table());
        assert!(analysis.unresolved.is_empty());
        let multipliers: Vec<f64> = analysis.contributions.iter().map(|c| c.multiplier).collect();
        assert_eq!(multipliers, vec![2.0, 2.0, 1.0]);
        let energy = analysis.totals.unwrap().energy;
        assert!((energy - (72.0 * 2.0 + 61.0 * 2.0 + 128.0)).abs() < 1e-9);
    }
}
