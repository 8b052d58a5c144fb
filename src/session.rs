//! Weekly menu editing session
//!
//! Holds one week of one menu type in memory. Edits update the local rows
//! and recompute only the affected slot; the database is touched on load
//! and on save.

use chrono::{NaiveDate, Weekday};
use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

use crate::db::DbError;
use crate::models::{
    normalize_time, week_start_of, ChildAllergyRecord, MealSlot, MenuItem, MenuType, NutritionTotals,
    SaveOutcome, WEEKDAYS,
};
use crate::nutrition::{
    analyze_meal, check_allergies, compute_totals, day_total, slot_nutrition_for_items,
    week_allergy_alerts, week_summary, AllergyAlert, DayAllergyAlerts, DaySummary, FactTable,
    MealAnalysis, SlotNutrition,
};

#[derive(Debug, Error)]
pub enum MenuError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Slot '{slot}' is not part of the {menu_type} menu")]
    SlotNotApplicable { slot: &'static str, menu_type: &'static str },

    #[error("{0:?} is not a planned weekday")]
    WeekendDay(Weekday),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("Unknown menu type '{0}'")]
    UnknownMenuType(String),

    #[error("Unknown meal slot '{0}'")]
    UnknownSlot(String),

    #[error("Unknown weekday '{0}'")]
    UnknownWeekday(String),
}

impl From<rusqlite::Error> for MenuError {
    fn from(e: rusqlite::Error) -> Self {
        MenuError::Db(DbError::Sqlite(e))
    }
}

pub type MenuResult<T> = Result<T, MenuError>;

/// Editing state for one (week, menu type)
#[derive(Debug, Clone)]
pub struct MenuSession {
    week_start: NaiveDate,
    menu_type: MenuType,
    /// Always the five weekdays, Monday first
    items: Vec<MenuItem>,
    facts: FactTable,
    roster: Vec<ChildAllergyRecord>,
    nutrition: SlotNutrition,
    dirty: bool,
}

/// Snapshot of a session for tool responses
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub week_start: NaiveDate,
    pub menu_type: MenuType,
    pub dirty: bool,
    pub days: Vec<MenuItem>,
    pub summary: Vec<DaySummary>,
}

impl MenuSession {
    /// Build a session from already loaded parts
    pub fn new(
        week_start: NaiveDate,
        menu_type: MenuType,
        items: Vec<MenuItem>,
        facts: FactTable,
        roster: Vec<ChildAllergyRecord>,
    ) -> Self {
        let week_start = week_start_of(week_start);
        let items = WEEKDAYS
            .iter()
            .map(|day| {
                items
                    .iter()
                    .find(|item| item.weekday == *day)
                    .cloned()
                    .unwrap_or_else(|| MenuItem::empty(week_start, *day, menu_type))
            })
            .collect();

        let mut session = Self {
            week_start,
            menu_type,
            items,
            facts,
            roster,
            nutrition: SlotNutrition::new(),
            dirty: false,
        };
        session.recompute_all();
        session
    }

    /// Fetch the week's rows, the fact table and the allergy roster
    pub fn load(conn: &Connection, week_start: NaiveDate, menu_type: MenuType) -> MenuResult<Self> {
        let items = MenuItem::load_week(conn, week_start, menu_type)?;
        let facts = FactTable::load(conn)?;
        let roster = ChildAllergyRecord::allergy_roster(conn)?;

        tracing::info!(
            "Opened {} menu for week of {} ({} facts, {} children with allergies)",
            menu_type.as_str(),
            week_start_of(week_start),
            facts.len(),
            roster.len()
        );

        Ok(Self::new(week_start, menu_type, items, facts, roster))
    }

    pub fn week_start(&self) -> NaiveDate {
        self.week_start
    }

    pub fn menu_type(&self) -> MenuType {
        self.menu_type
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn facts(&self) -> &FactTable {
        &self.facts
    }

    /// True when there are edits not yet saved
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn item(&self, day: Weekday) -> MenuResult<&MenuItem> {
        self.items
            .iter()
            .find(|item| item.weekday == day)
            .ok_or(MenuError::WeekendDay(day))
    }

    fn item_mut(&mut self, day: Weekday) -> MenuResult<&mut MenuItem> {
        self.items
            .iter_mut()
            .find(|item| item.weekday == day)
            .ok_or(MenuError::WeekendDay(day))
    }

    fn check_slot(&self, slot: MealSlot) -> MenuResult<()> {
        if self.menu_type.allows(slot) {
            Ok(())
        } else {
            Err(MenuError::SlotNotApplicable {
                slot: slot.as_str(),
                menu_type: self.menu_type.as_str(),
            })
        }
    }

    /// Replace a meal text and recompute that slot only
    pub fn set_meal_text(&mut self, day: Weekday, slot: MealSlot, text: &str) -> MenuResult<Option<NutritionTotals>> {
        self.check_slot(slot)?;
        self.item_mut(day)?.set_text(slot, text);

        let totals = compute_totals(text, &self.facts);
        self.nutrition.insert((day, slot), totals);
        self.dirty = true;

        Ok(totals)
    }

    /// Set or clear (`None` or empty) a meal time
    pub fn set_meal_time(&mut self, day: Weekday, slot: MealSlot, time: Option<&str>) -> MenuResult<()> {
        self.check_slot(slot)?;
        let time = match time.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => Some(normalize_time(t).ok_or_else(|| MenuError::InvalidTime(t.to_string()))?),
            None => None,
        };
        self.item_mut(day)?.set_time(slot, time);
        self.dirty = true;
        Ok(())
    }

    pub fn set_notes(&mut self, day: Weekday, notes: Option<&str>) -> MenuResult<()> {
        let notes = notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
        self.item_mut(day)?.notes = notes;
        self.dirty = true;
        Ok(())
    }

    /// Recompute every slot from the current texts
    pub fn recompute_all(&mut self) {
        self.nutrition = slot_nutrition_for_items(&self.items, &self.facts);
    }

    /// Replace the fact table (after fact edits) and recompute
    pub fn refresh_facts(&mut self, facts: FactTable) {
        self.facts = facts;
        self.recompute_all();
    }

    pub fn refresh_roster(&mut self, roster: Vec<ChildAllergyRecord>) {
        self.roster = roster;
    }

    pub fn slot_nutrition(&self, day: Weekday, slot: MealSlot) -> Option<NutritionTotals> {
        self.nutrition.get(&(day, slot)).copied().flatten()
    }

    pub fn slot_analysis(&self, day: Weekday, slot: MealSlot) -> MenuResult<MealAnalysis> {
        self.check_slot(slot)?;
        Ok(analyze_meal(self.item(day)?.text(slot), &self.facts))
    }

    pub fn day_total(&self, day: Weekday) -> Option<NutritionTotals> {
        day_total(&self.nutrition, day, self.menu_type)
    }

    pub fn week_summary(&self) -> Vec<DaySummary> {
        week_summary(&self.nutrition, self.week_start, self.menu_type)
    }

    /// Alerts for one slot's text
    pub fn allergy_alerts(&self, day: Weekday, slot: MealSlot) -> MenuResult<Vec<AllergyAlert>> {
        self.check_slot(slot)?;
        Ok(check_allergies(self.item(day)?.text(slot), &self.roster))
    }

    pub fn week_allergy_alerts(&self) -> Vec<DayAllergyAlerts> {
        week_allergy_alerts(&self.items, &self.roster)
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            week_start: self.week_start,
            menu_type: self.menu_type,
            dirty: self.dirty,
            days: self.items.clone(),
            summary: self.week_summary(),
        }
    }

    /// Persist all five days in one transaction. Nothing is written unless
    /// every row succeeds; on failure the session keeps its unsaved state.
    pub fn save(&mut self, conn: &mut Connection) -> MenuResult<SaveOutcome> {
        let mut staged = self.items.clone();
        let mut outcome = SaveOutcome::default();

        let tx = conn.transaction()?;
        for item in staged.iter_mut() {
            item.save(&tx, &mut outcome)?;
        }
        tx.commit()?;

        self.items = staged;
        self.dirty = false;

        tracing::info!(
            "Saved {} menu for week of {}: {} inserted, {} updated, {} deleted",
            self.menu_type.as_str(),
            self.week_start,
            outcome.inserted,
            outcome.updated,
            outcome.deleted
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::{ChildCreate, FactBasis, NutrientFact, NutrientFactCreate};

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        for (name, energy) in [("Arroz", 128.0), ("Frango grelhado", 159.0), ("Leite", 61.0)] {
            NutrientFact::create(&conn, &NutrientFactCreate {
                name: name.to_string(),
                basis: FactBasis::Per100g,
                portion_grams: None,
                nutrition: NutritionTotals { energy, ..NutritionTotals::zero() },
                notes: None,
            }).unwrap();
        }
        ChildAllergyRecord::create(&conn, &ChildCreate {
            name: "Ana".to_string(),
            allergies: Some("Amendoim".to_string()),
        }).unwrap();
        conn
    }

    #[test]
    fn test_edit_recomputes_slot_and_day() {
        let conn = setup();
        let mut session = MenuSession::load(&conn, monday(), MenuType::Toddler).unwrap();
        assert!(session.day_total(Weekday::Mon).is_none());

        let lunch = session
            .set_meal_text(Weekday::Mon, MealSlot::Lunch, "Arroz 100g, Frango grelhado 80g")
            .unwrap()
            .unwrap();
        assert!((lunch.energy - (128.0 + 159.0 * 0.8)).abs() < 1e-9);

        session.set_meal_text(Weekday::Mon, MealSlot::Snack, "Quinoa").unwrap();
        assert!(session.slot_nutrition(Weekday::Mon, MealSlot::Snack).is_none());
        assert_eq!(session.day_total(Weekday::Mon), Some(lunch));
        assert!(session.is_dirty());

        let summary = session.week_summary();
        assert_eq!(summary.len(), 5);
        assert_eq!(summary[0].totals, Some(lunch));
        assert!(summary[1].totals.is_none());
    }

    #[test]
    fn test_rejects_non_applicable_slot_and_weekend() {
        let conn = setup();
        let mut session = MenuSession::load(&conn, monday(), MenuType::Toddler).unwrap();
        assert!(matches!(
            session.set_meal_text(Weekday::Mon, MealSlot::Bottle, "Leite 180ml"),
            Err(MenuError::SlotNotApplicable { .. })
        ));
        assert!(matches!(
            session.set_meal_text(Weekday::Sat, MealSlot::Lunch, "Arroz"),
            Err(MenuError::WeekendDay(Weekday::Sat))
        ));
        assert!(matches!(
            session.set_meal_time(Weekday::Mon, MealSlot::Lunch, Some("meio-dia")),
            Err(MenuError::InvalidTime(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let mut conn = setup();
        let mut session = MenuSession::load(&conn, monday(), MenuType::Toddler).unwrap();
        session.set_meal_text(Weekday::Mon, MealSlot::Lunch, "Arroz 100g").unwrap();
        session.set_meal_time(Weekday::Mon, MealSlot::Lunch, Some("11h30")).unwrap();
        session.set_notes(Weekday::Fri, Some("Festa junina")).unwrap();

        let outcome = session.save(&mut conn).unwrap();
        assert_eq!(outcome, SaveOutcome { inserted: 2, updated: 0, deleted: 0 });
        assert!(!session.is_dirty());

        let reloaded = MenuSession::load(&conn, monday() + chrono::Duration::days(2), MenuType::Toddler).unwrap();
        assert_eq!(reloaded.week_start(), monday());
        assert_eq!(reloaded.item(Weekday::Mon).unwrap().time(MealSlot::Lunch), Some("11:30"));
        assert_eq!(reloaded.day_total(Weekday::Mon), session.day_total(Weekday::Mon));

        // Clearing a day removes its row
        session.set_notes(Weekday::Fri, None).unwrap();
        let outcome = session.save(&mut conn).unwrap();
        assert_eq!(outcome, SaveOutcome { inserted: 0, updated: 1, deleted: 1 });
    }

    #[test]
    fn test_time_only_day_is_saved() {
        let mut conn = setup();
        let mut session = MenuSession::load(&conn, monday(), MenuType::Toddler).unwrap();
        session.set_meal_time(Weekday::Mon, MealSlot::Lunch, Some("11:30")).unwrap();

        let outcome = session.save(&mut conn).unwrap();
        assert_eq!(outcome, SaveOutcome { inserted: 1, updated: 0, deleted: 0 });

        let reloaded = MenuSession::load(&conn, monday(), MenuType::Toddler).unwrap();
        assert_eq!(reloaded.item(Weekday::Mon).unwrap().time(MealSlot::Lunch), Some("11:30"));
        assert!(reloaded.day_total(Weekday::Mon).is_none());
    }

    #[test]
    fn test_save_is_all_or_nothing() {
        let mut conn = setup();
        conn.execute_batch(
            "CREATE TRIGGER reject_wednesday BEFORE INSERT ON weekly_menus
             WHEN NEW.day_of_week = 3
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        ).unwrap();

        let mut session = MenuSession::load(&conn, monday(), MenuType::Toddler).unwrap();
        session.set_meal_text(Weekday::Mon, MealSlot::Lunch, "Arroz 100g").unwrap();
        session.set_meal_text(Weekday::Wed, MealSlot::Lunch, "Frango grelhado").unwrap();

        assert!(session.save(&mut conn).is_err());
        assert!(session.is_dirty());
        assert!(session.item(Weekday::Mon).unwrap().id.is_none());
        assert!(MenuItem::list_for_week(&conn, monday(), MenuType::Toddler).unwrap().is_empty());
    }

    #[test]
    fn test_allergy_alerts() {
        let conn = setup();
        let mut session = MenuSession::load(&conn, monday(), MenuType::Toddler).unwrap();
        session.set_meal_text(Weekday::Tue, MealSlot::Snack, "Pasta de amendoim").unwrap();

        let alerts = session.allergy_alerts(Weekday::Tue, MealSlot::Snack).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].child_name, "Ana");

        let week = session.week_allergy_alerts();
        assert_eq!(week.len(), 1);
        assert_eq!(week[0].weekday, Weekday::Tue);
    }
}
