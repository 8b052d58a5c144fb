//! Weekly Menu MCP Tools
//!
//! Stateless meal calculation plus the editing-session tools. Sessions live
//! in a map keyed by (week start Monday, menu type) owned by the server.

use std::collections::HashMap;

use chrono::{NaiveDate, Weekday};
use serde::Serialize;

use crate::db::Database;
use crate::models::{
    parse_date, parse_weekday, week_start_of, MealSlot, MenuType, NutritionTotals, SaveOutcome,
};
use crate::nutrition::{
    analyze_meal, check_allergies, AllergyAlert, DayAllergyAlerts, DaySummary, FactTable,
    IngredientContribution, ParsedIngredient,
};
use crate::session::{MenuSession, SessionView};
use crate::tools::children::load_roster;

pub type SessionKey = (NaiveDate, MenuType);

/// Open editing sessions
pub type SessionMap = HashMap<SessionKey, MenuSession>;

// ============================================================================
// Argument parsing
// ============================================================================

pub fn parse_session_key(week_start: &str, menu_type: &str) -> Result<SessionKey, String> {
    let date = parse_date(week_start)
        .ok_or_else(|| format!("Invalid week_start '{}', expected YYYY-MM-DD", week_start))?;
    let menu_type = MenuType::from_str(menu_type).ok_or_else(|| {
        format!(
            "Unknown menu_type '{}', expected one of: infant_0_6, infant_6_24, toddler",
            menu_type
        )
    })?;
    Ok((week_start_of(date), menu_type))
}

pub fn parse_day(day: &str) -> Result<Weekday, String> {
    parse_weekday(day).ok_or_else(|| format!("Unknown weekday '{}', expected monday..friday", day))
}

pub fn parse_slot(slot: &str) -> Result<MealSlot, String> {
    MealSlot::from_str(slot).ok_or_else(|| {
        format!(
            "Unknown meal slot '{}', expected one of: breakfast, morning_snack, lunch, bottle, snack, pre_dinner, dinner",
            slot
        )
    })
}

// ============================================================================
// Responses
// ============================================================================

/// Response for calculate_meal_nutrition
#[derive(Debug, Serialize)]
pub struct MealNutritionResponse {
    pub text: String,
    /// `null` when no ingredient could be resolved
    pub totals: Option<NutritionTotals>,
    pub ingredients: Vec<IngredientContribution>,
    pub unresolved: Vec<ParsedIngredient>,
}

/// Response for check_meal_allergies
#[derive(Debug, Serialize)]
pub struct MealAllergiesResponse {
    pub text: String,
    pub alerts: Vec<AllergyAlert>,
    pub children_checked: usize,
}

/// Response for set_meal_text
#[derive(Debug, Serialize)]
pub struct SetMealTextResponse {
    pub weekday: Weekday,
    pub slot: MealSlot,
    pub totals: Option<NutritionTotals>,
    pub day_total: Option<NutritionTotals>,
    pub unresolved: Vec<String>,
    pub allergy_alerts: Vec<AllergyAlert>,
}

/// Response for get_week_summary
#[derive(Debug, Serialize)]
pub struct WeekSummaryResponse {
    pub week_start: NaiveDate,
    pub menu_type: MenuType,
    pub menu_label: &'static str,
    pub dirty: bool,
    pub days: Vec<DaySummary>,
}

/// Response for get_week_allergy_alerts
#[derive(Debug, Serialize)]
pub struct WeekAllergyAlertsResponse {
    pub week_start: NaiveDate,
    pub menu_type: MenuType,
    pub days: Vec<DayAllergyAlerts>,
}

/// Response for save_menu_week
#[derive(Debug, Serialize)]
pub struct SaveMenuWeekResponse {
    pub success: bool,
    pub week_start: NaiveDate,
    pub menu_type: MenuType,
    pub outcome: SaveOutcome,
}

/// Response for close_menu_week
#[derive(Debug, Serialize)]
pub struct CloseMenuWeekResponse {
    pub closed: bool,
    pub discarded_changes: bool,
}

// ============================================================================
// Stateless tools
// ============================================================================

/// Parse and resolve a meal text without touching any session
pub fn calculate_meal_nutrition(db: &Database, text: &str) -> Result<MealNutritionResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let facts = FactTable::load(&conn).map_err(|e| format!("Failed to load nutrient facts: {}", e))?;

    let analysis = analyze_meal(text, &facts);

    Ok(MealNutritionResponse {
        text: text.to_string(),
        totals: analysis.totals,
        ingredients: analysis.contributions,
        unresolved: analysis.unresolved,
    })
}

pub fn check_meal_allergies(db: &Database, text: &str) -> Result<MealAllergiesResponse, String> {
    let roster = load_roster(db)?;

    Ok(MealAllergiesResponse {
        text: text.to_string(),
        alerts: check_allergies(text, &roster),
        children_checked: roster.len(),
    })
}

// ============================================================================
// Session tools
// ============================================================================

/// Open (or reuse) a session. `reload` discards unsaved edits and re-reads
/// the database.
pub fn open_menu_week(
    db: &Database,
    sessions: &mut SessionMap,
    key: SessionKey,
    reload: bool,
) -> Result<SessionView, String> {
    if reload {
        sessions.remove(&key);
    }
    Ok(session_mut(db, sessions, key)?.view())
}

/// The session for `key`, opened from the database when not yet open
pub fn session_mut<'a>(
    db: &Database,
    sessions: &'a mut SessionMap,
    key: SessionKey,
) -> Result<&'a mut MenuSession, String> {
    if !sessions.contains_key(&key) {
        let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
        let session = MenuSession::load(&conn, key.0, key.1)
            .map_err(|e| format!("Failed to open menu week: {}", e))?;
        sessions.insert(key, session);
    }
    sessions
        .get_mut(&key)
        .ok_or_else(|| format!("No open menu for week {} ({})", key.0, key.1.as_str()))
}

pub fn set_meal_text(
    db: &Database,
    sessions: &mut SessionMap,
    key: SessionKey,
    day: Weekday,
    slot: MealSlot,
    text: &str,
) -> Result<SetMealTextResponse, String> {
    let session = session_mut(db, sessions, key)?;

    let totals = session.set_meal_text(day, slot, text).map_err(|e| e.to_string())?;
    let analysis = session.slot_analysis(day, slot).map_err(|e| e.to_string())?;
    let allergy_alerts = session.allergy_alerts(day, slot).map_err(|e| e.to_string())?;

    Ok(SetMealTextResponse {
        weekday: day,
        slot,
        totals,
        day_total: session.day_total(day),
        unresolved: analysis.unresolved.into_iter().map(|i| i.name).collect(),
        allergy_alerts,
    })
}

pub fn set_meal_time(
    db: &Database,
    sessions: &mut SessionMap,
    key: SessionKey,
    day: Weekday,
    slot: MealSlot,
    time: Option<&str>,
) -> Result<SessionView, String> {
    let session = session_mut(db, sessions, key)?;
    session.set_meal_time(day, slot, time).map_err(|e| e.to_string())?;
    Ok(session.view())
}

pub fn set_day_notes(
    db: &Database,
    sessions: &mut SessionMap,
    key: SessionKey,
    day: Weekday,
    notes: Option<&str>,
) -> Result<SessionView, String> {
    let session = session_mut(db, sessions, key)?;
    session.set_notes(day, notes).map_err(|e| e.to_string())?;
    Ok(session.view())
}

pub fn get_week_summary(db: &Database, sessions: &mut SessionMap, key: SessionKey) -> Result<WeekSummaryResponse, String> {
    let session = session_mut(db, sessions, key)?;

    Ok(WeekSummaryResponse {
        week_start: session.week_start(),
        menu_type: session.menu_type(),
        menu_label: session.menu_type().label(),
        dirty: session.is_dirty(),
        days: session.week_summary(),
    })
}

pub fn get_week_allergy_alerts(
    db: &Database,
    sessions: &mut SessionMap,
    key: SessionKey,
) -> Result<WeekAllergyAlertsResponse, String> {
    let session = session_mut(db, sessions, key)?;

    Ok(WeekAllergyAlertsResponse {
        week_start: session.week_start(),
        menu_type: session.menu_type(),
        days: session.week_allergy_alerts(),
    })
}

/// Write the whole week in one transaction
pub fn save_menu_week(db: &Database, sessions: &mut SessionMap, key: SessionKey) -> Result<SaveMenuWeekResponse, String> {
    let session = session_mut(db, sessions, key)?;
    let mut conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let outcome = session
        .save(&mut conn)
        .map_err(|e| format!("Failed to save menu week (no changes written): {}", e))?;

    Ok(SaveMenuWeekResponse {
        success: true,
        week_start: key.0,
        menu_type: key.1,
        outcome,
    })
}

/// Drop a session. Refuses to drop unsaved edits unless `discard` is set.
pub fn close_menu_week(sessions: &mut SessionMap, key: SessionKey, discard: bool) -> Result<CloseMenuWeekResponse, String> {
    let dirty = match sessions.get(&key) {
        Some(session) => session.is_dirty(),
        None => return Ok(CloseMenuWeekResponse { closed: false, discarded_changes: false }),
    };

    if dirty && !discard {
        return Err(format!(
            "Menu for week {} ({}) has unsaved changes. Call save_menu_week or pass discard=true.",
            key.0,
            key.1.as_str()
        ));
    }

    sessions.remove(&key);
    Ok(CloseMenuWeekResponse { closed: true, discarded_changes: dirty })
}

/// Recompute open sessions after the fact table changed
pub fn refresh_session_facts(db: &Database, sessions: &mut SessionMap) -> Result<usize, String> {
    if sessions.is_empty() {
        return Ok(0);
    }
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let facts = FactTable::load(&conn).map_err(|e| format!("Failed to load nutrient facts: {}", e))?;

    for session in sessions.values_mut() {
        session.refresh_facts(facts.clone());
    }
    Ok(sessions.len())
}

/// Reload the allergy roster of open sessions after roster changes
pub fn refresh_session_roster(db: &Database, sessions: &mut SessionMap) -> Result<usize, String> {
    if sessions.is_empty() {
        return Ok(0);
    }
    let roster = load_roster(db)?;

    for session in sessions.values_mut() {
        session.refresh_roster(roster.clone());
    }
    Ok(sessions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;
    use crate::models::{ChildAllergyRecord, ChildCreate, FactBasis, NutrientFact, NutrientFactCreate};

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            run_migrations(conn)?;
            NutrientFact::create(conn, &NutrientFactCreate {
                name: "Arroz".to_string(),
                basis: FactBasis::Per100g,
                portion_grams: None,
                nutrition: NutritionTotals { energy: 128.0, ..NutritionTotals::zero() },
                notes: None,
            })?;
            ChildAllergyRecord::create(conn, &ChildCreate {
                name: "Ana".to_string(),
                allergies: Some("Amendoim".to_string()),
            })?;
            Ok(())
        })
        .unwrap();
        db
    }

    #[test]
    fn test_parse_session_key_normalizes_to_monday() {
        let (monday, menu_type) = parse_session_key("2026-10-22", "toddler").unwrap();
        assert_eq!(monday, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(menu_type, MenuType::Toddler);
        assert!(parse_session_key("22/10/2026", "toddler").is_err());
        assert!(parse_session_key("2026-10-22", "adult").is_err());
    }

    #[test]
    fn test_calculate_meal_nutrition() {
        let db = setup();
        let result = calculate_meal_nutrition(&db, "Arroz 50g, Quinoa").unwrap();
        assert_eq!(result.totals.map(|t| t.energy), Some(64.0));
        assert_eq!(result.unresolved.len(), 1);

        let none = calculate_meal_nutrition(&db, "Quinoa").unwrap();
        assert!(none.totals.is_none());
    }

    #[test]
    fn test_session_flow() {
        let db = setup();
        let mut sessions = SessionMap::new();
        let key = parse_session_key("2026-10-19", "toddler").unwrap();

        let view = open_menu_week(&db, &mut sessions, key, false).unwrap();
        assert_eq!(view.days.len(), 5);

        let set = set_meal_text(&db, &mut sessions, key, Weekday::Mon, MealSlot::Lunch, "Arroz 100g, pasta de amendoim").unwrap();
        assert_eq!(set.day_total.map(|t| t.energy), Some(128.0));
        assert_eq!(set.unresolved, vec!["pasta de amendoim"]);
        assert_eq!(set.allergy_alerts.len(), 1);

        assert!(close_menu_week(&mut sessions, key, false).is_err());

        let saved = save_menu_week(&db, &mut sessions, key).unwrap();
        assert_eq!(saved.outcome.inserted, 1);

        let close = close_menu_week(&mut sessions, key, false).unwrap();
        assert!(close.closed && !close.discarded_changes);

        // Reopening reads the saved text back
        let summary = get_week_summary(&db, &mut sessions, key).unwrap();
        assert_eq!(summary.days[0].totals.map(|t| t.energy), Some(128.0));
        assert!(!summary.dirty);
    }

    #[test]
    fn test_rejects_bottle_for_toddler() {
        let db = setup();
        let mut sessions = SessionMap::new();
        let key = parse_session_key("2026-10-19", "toddler").unwrap();
        assert!(set_meal_text(&db, &mut sessions, key, Weekday::Mon, MealSlot::Bottle, "Leite").is_err());
    }
}
