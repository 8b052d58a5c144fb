//! Nutrition engine
//!
//! Meal text parsing, ingredient resolution, unit conversion, day/week
//! aggregation and allergy cross-checking. Everything here is synchronous
//! and free of I/O except `FactTable::load`.

pub mod aggregate;
pub mod allergy;
pub mod calculator;
pub mod converter;
pub mod facts;
pub mod normalize;
pub mod parser;
pub mod units;

pub use aggregate::{day_name, day_total, slot_nutrition_for_items, week_summary, DaySummary, SlotNutrition};
pub use allergy::{check_allergies, week_allergy_alerts, AllergyAlert, DayAllergyAlerts};
pub use calculator::{analyze_meal, compute_ingredients, compute_totals, IngredientContribution, MealAnalysis};
pub use converter::{fact_multiplier, to_grams};
pub use facts::FactTable;
pub use normalize::fold;
pub use parser::{parse_fragment, parse_meal_text, split_fragments, ParsedIngredient};
pub use units::{categorize_unit, grams_per_unit, lookup_unit, ml_per_unit, UnitCategory, UnitInfo};
