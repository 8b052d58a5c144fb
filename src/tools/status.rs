//! Menuplan Status Tool
//!
//! Provides runtime status information about the menuplan service.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::db::Database;
use crate::models::{ChildAllergyRecord, NutrientFact};

/// Menu planning instructions for AI assistants
pub const MENU_INSTRUCTIONS: &str = r#"
# Daycare Menu Planning Instructions

This guide explains how to plan a weekly daycare menu with the menuplan tools.

## Overview

A weekly menu covers Monday to Friday for one menu type:
- `infant_0_6` - infants 0-6 months: breakfast, bottle, pre_dinner (milk feeds)
- `infant_6_24` - infants 6-24 months: all seven slots
- `toddler` - toddler/preschool: breakfast, morning_snack, lunch, snack, dinner

Each slot holds free text, for example `Arroz 100g, Frango grelhado 80g e salada`.
Nutrition is derived from that text using the nutrient fact table; it is never typed in.

---

## Writing Meal Text

Separate ingredients with commas, semicolons, `+`, new lines, or "e"/"and".
Each ingredient may carry a quantity before or after its name:

| Text | Parsed as |
|------|-----------|
| `Arroz 100g` | 100 g of arroz |
| `100g de arroz` | 100 g of arroz |
| `2 colheres de sopa de feijão` | 30 ml of feijão |
| `Leite 1,5 copo` | 300 ml of leite |
| `2 bananas` | 2 units of banana |
| `Salada` | 1 portion (the fact's portion_grams, or 100 g) |

Ingredients that match no nutrient fact contribute nothing and are listed as `unresolved`.
Add the missing fact with `add_nutrient_fact` and the open weeks are recomputed.

---

## Workflow

1. `open_menu_week` with `week_start` (any date of the week, YYYY-MM-DD) and `menu_type`.
2. `set_meal_text` for each day/slot. The response shows the slot nutrition, the
   day total, unresolved ingredients and allergy alerts.
3. Optionally `set_meal_time` (HH:MM) and `set_day_notes`.
4. `get_week_summary` for the five daily totals (`null` means nothing resolved).
5. `get_week_allergy_alerts` to review allergy conflicts. Alerts never block saving.
6. `save_menu_week` writes all five days in one transaction. Either every day is
   saved or nothing is.
7. `export_week_menu_pdf` for the printable menu.
8. `close_menu_week` when done (pass `discard=true` to drop unsaved edits).

## Quick Checks

- `calculate_meal_nutrition` computes a meal text without opening a week.
- `check_meal_allergies` checks a meal text against the current roster.

## Notes

- Dates use ISO format: YYYY-MM-DD
- Weekdays accept monday..friday (or segunda..sexta, or 1..5)
- A day with no meal text and no notes is removed from the database on save
- Children with `active=false` are not checked for allergies
"#;

/// Runtime status of the menuplan service
#[derive(Debug, Clone, Serialize)]
pub struct MenuplanStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub nutrient_fact_count: Option<i64>,
    pub children_count: Option<usize>,

    /// Open editing sessions
    pub open_menu_weeks: usize,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    /// Create a new status tracker
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    /// Get the current status
    pub fn get_status(&self, db: &Database, open_menu_weeks: usize) -> MenuplanStatus {
        let build_info = BuildInfo::current();

        // Get database size if it exists
        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let (nutrient_fact_count, children_count) = match db.get_conn() {
            Ok(conn) => (
                NutrientFact::count(&conn).ok(),
                ChildAllergyRecord::list(&conn, false).ok().map(|c| c.len()),
            ),
            Err(e) => {
                tracing::warn!("Status: database unavailable: {}", e);
                (None, None)
            }
        };

        // Get process info
        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        MenuplanStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            nutrient_fact_count,
            children_count,
            open_menu_weeks,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
