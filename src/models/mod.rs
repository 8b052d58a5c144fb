//! Data models
//!
//! Rust structs representing database entities.

mod child;
mod menu_item;
mod nutrient_fact;
mod nutrition;

pub use child::{ChildAllergyRecord, ChildCreate, ChildUpdate};
pub use menu_item::{
    date_for, normalize_time, parse_date, parse_weekday, week_start_of, MealField, MealSlot,
    MenuItem, MenuType, SaveOutcome, WEEKDAYS,
};
pub use nutrient_fact::{FactBasis, NutrientFact, NutrientFactCreate, NutrientFactUpdate};
pub use nutrition::{sum_present, NutritionTotals};
