//! Day and week aggregation
//!
//! Slot nutrition is keyed by (weekday, slot). Day totals are folded on
//! demand and never stored.

use std::collections::HashMap;

use chrono::{NaiveDate, Weekday};
use serde::Serialize;

use crate::models::{
    date_for, sum_present, week_start_of, MealSlot, MenuItem, MenuType, NutritionTotals, WEEKDAYS,
};

use super::calculator::compute_totals;
use super::facts::FactTable;

/// Nutrition per (weekday, slot). A missing key and a `None` value both mean absent.
pub type SlotNutrition = HashMap<(Weekday, MealSlot), Option<NutritionTotals>>;

/// Compute every slot of the given rows
pub fn slot_nutrition_for_items(items: &[MenuItem], facts: &FactTable) -> SlotNutrition {
    let mut entries = SlotNutrition::new();
    for item in items {
        for slot in item.menu_type.slots() {
            let text = item.text(*slot);
            let totals = if text.is_empty() { None } else { compute_totals(text, facts) };
            entries.insert((item.weekday, *slot), totals);
        }
    }
    entries
}

/// Field-wise sum of the applicable slots of one day. `None` iff all are absent.
pub fn day_total(entries: &SlotNutrition, day: Weekday, menu_type: MenuType) -> Option<NutritionTotals> {
    sum_present(
        menu_type
            .slots()
            .iter()
            .map(|slot| entries.get(&(day, *slot)).copied().flatten()),
    )
}

/// One weekday of a week summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub weekday: Weekday,
    pub day_name: &'static str,
    pub date: NaiveDate,
    pub totals: Option<NutritionTotals>,
}

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Exactly five entries, Monday to Friday. Days are independent; nothing is
/// summed across days.
pub fn week_summary(entries: &SlotNutrition, week_start: NaiveDate, menu_type: MenuType) -> Vec<DaySummary> {
    let monday = week_start_of(week_start);
    WEEKDAYS
        .iter()
        .map(|day| DaySummary {
            weekday: *day,
            day_name: day_name(*day),
            date: date_for(monday, *day),
            totals: day_total(entries, *day, menu_type),
        })
        .collect()
}
