//! Weekly menu model
//!
//! One `MenuItem` per (week, weekday, menu type) holding the free-text meal
//! fields, their times and notes.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

/// Planned weekdays; there is no weekend meal planning
pub const WEEKDAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

/// Age/stage category governing which meal slots apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuType {
    /// Infants 0-6 months
    #[serde(rename = "infant_0_6")]
    Infant0To6,
    /// Infants 6-24 months
    #[serde(rename = "infant_6_24")]
    Infant6To24,
    /// Toddler / preschool
    Toddler,
}

impl MenuType {
    pub const ALL: [MenuType; 3] = [MenuType::Infant0To6, MenuType::Infant6To24, MenuType::Toddler];

    pub fn as_str(&self) -> &'static str {
        match self {
            MenuType::Infant0To6 => "infant_0_6",
            MenuType::Infant6To24 => "infant_6_24",
            MenuType::Toddler => "toddler",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "infant_0_6" | "0-6" | "bercario_1" => Some(MenuType::Infant0To6),
            "infant_6_24" | "6-24" | "bercario_2" => Some(MenuType::Infant6To24),
            "toddler" | "preschool" | "maternal" => Some(MenuType::Toddler),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MenuType::Infant0To6 => "Infant (0-6 months)",
            MenuType::Infant6To24 => "Infant (6-24 months)",
            MenuType::Toddler => "Toddler / Preschool",
        }
    }

    /// Slots offered for this menu type, in display order
    pub fn slots(&self) -> &'static [MealSlot] {
        match self {
            MenuType::Infant0To6 => &[MealSlot::Breakfast, MealSlot::Bottle, MealSlot::PreDinner],
            MenuType::Infant6To24 => &MealSlot::ALL,
            MenuType::Toddler => &[
                MealSlot::Breakfast,
                MealSlot::MorningSnack,
                MealSlot::Lunch,
                MealSlot::Snack,
                MealSlot::Dinner,
            ],
        }
    }

    pub fn allows(&self, slot: MealSlot) -> bool {
        self.slots().contains(&slot)
    }
}

/// Named feeding occasion; declaration order is display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealSlot {
    Breakfast,
    MorningSnack,
    Lunch,
    Bottle,
    Snack,
    PreDinner,
    Dinner,
}

impl MealSlot {
    pub const ALL: [MealSlot; 7] = [
        MealSlot::Breakfast,
        MealSlot::MorningSnack,
        MealSlot::Lunch,
        MealSlot::Bottle,
        MealSlot::Snack,
        MealSlot::PreDinner,
        MealSlot::Dinner,
    ];

    /// Column name in `weekly_menus`
    pub fn as_str(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::MorningSnack => "morning_snack",
            MealSlot::Lunch => "lunch",
            MealSlot::Bottle => "bottle",
            MealSlot::Snack => "snack",
            MealSlot::PreDinner => "pre_dinner",
            MealSlot::Dinner => "dinner",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let key = s.trim().to_lowercase().replace([' ', '-'], "_");
        MealSlot::ALL.into_iter().find(|slot| slot.as_str() == key)
    }

    pub fn label(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "Breakfast",
            MealSlot::MorningSnack => "Morning snack",
            MealSlot::Lunch => "Lunch",
            MealSlot::Bottle => "Bottle",
            MealSlot::Snack => "Snack",
            MealSlot::PreDinner => "Pre-dinner",
            MealSlot::Dinner => "Dinner",
        }
    }

    fn time_column(&self) -> String {
        format!("{}_time", self.as_str())
    }
}

/// Monday of the week containing `date`
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Calendar date of `weekday` in the week starting at `week_start`
pub fn date_for(week_start: NaiveDate, weekday: Weekday) -> NaiveDate {
    week_start_of(week_start) + Duration::days(weekday.num_days_from_monday() as i64)
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

pub fn parse_weekday(s: &str) -> Option<Weekday> {
    let weekday = match s.trim().to_lowercase().as_str() {
        "mon" | "monday" | "segunda" | "1" => Weekday::Mon,
        "tue" | "tuesday" | "terca" | "terça" | "2" => Weekday::Tue,
        "wed" | "wednesday" | "quarta" | "3" => Weekday::Wed,
        "thu" | "thursday" | "quinta" | "4" => Weekday::Thu,
        "fri" | "friday" | "sexta" | "5" => Weekday::Fri,
        "sat" | "saturday" | "sabado" | "sábado" | "6" => Weekday::Sat,
        "sun" | "sunday" | "domingo" | "7" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}

/// Normalize a meal time to `HH:MM`
pub fn normalize_time(s: &str) -> Option<String> {
    let trimmed = s.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%Hh%M"))
        .ok()
        .map(|t| t.format("%H:%M").to_string())
}

/// One meal field: free text plus an optional time of day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealField {
    pub text: Option<String>,
    pub time: Option<String>,
}

impl MealField {
    pub fn has_text(&self) -> bool {
        self.text.as_deref().map_or(false, |t| !t.trim().is_empty())
    }
}

/// A weekly menu row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    /// `None` until persisted
    pub id: Option<i64>,
    pub week_start: NaiveDate,
    pub weekday: Weekday,
    pub menu_type: MenuType,
    pub meals: BTreeMap<MealSlot, MealField>,
    pub notes: Option<String>,
}

/// Counts of row operations performed by a save
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl MenuItem {
    /// Unsaved, empty row
    pub fn empty(week_start: NaiveDate, weekday: Weekday, menu_type: MenuType) -> Self {
        Self {
            id: None,
            week_start: week_start_of(week_start),
            weekday,
            menu_type,
            meals: BTreeMap::new(),
            notes: None,
        }
    }

    pub fn date(&self) -> NaiveDate {
        date_for(self.week_start, self.weekday)
    }

    /// Meal text for a slot, empty string when unset
    pub fn text(&self, slot: MealSlot) -> &str {
        self.meals
            .get(&slot)
            .and_then(|m| m.text.as_deref())
            .unwrap_or("")
    }

    pub fn time(&self, slot: MealSlot) -> Option<&str> {
        self.meals.get(&slot).and_then(|m| m.time.as_deref())
    }

    pub fn set_text(&mut self, slot: MealSlot, text: &str) {
        let trimmed = text.trim();
        let field = self.meals.entry(slot).or_default();
        field.text = if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
        self.prune(slot);
    }

    pub fn set_time(&mut self, slot: MealSlot, time: Option<String>) {
        self.meals.entry(slot).or_default().time = time;
        self.prune(slot);
    }

    fn prune(&mut self, slot: MealSlot) {
        if self.meals.get(&slot).map_or(false, |m| *m == MealField::default()) {
            self.meals.remove(&slot);
        }
    }

    /// Texts of the slots applicable to this row's menu type, joined
    pub fn applicable_text(&self) -> String {
        self.menu_type
            .slots()
            .iter()
            .map(|slot| self.text(*slot))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// No meal text, no meal time and no notes; such a row is not kept in
    /// the database
    pub fn is_empty(&self) -> bool {
        !self.meals.values().any(|m| m.has_text() || m.time.is_some())
            && self.notes.as_deref().map_or(true, |n| n.trim().is_empty())
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let week_start: String = row.get("week_start")?;
        let day_of_week: u32 = row.get("day_of_week")?;
        let menu_type: String = row.get("menu_type")?;

        let conversion_err = |msg: String| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                msg.into(),
            )
        };

        let week_start = parse_date(&week_start)
            .ok_or_else(|| conversion_err(format!("invalid week_start '{}'", week_start)))?;
        let weekday = day_of_week
            .checked_sub(1)
            .and_then(|i| WEEKDAYS.get(i as usize).copied())
            .ok_or_else(|| conversion_err(format!("invalid day_of_week {}", day_of_week)))?;
        let menu_type = MenuType::from_str(&menu_type)
            .ok_or_else(|| conversion_err(format!("invalid menu_type '{}'", menu_type)))?;

        let mut meals = BTreeMap::new();
        for slot in MealSlot::ALL {
            let field = MealField {
                text: row.get(slot.as_str())?,
                time: row.get(slot.time_column().as_str())?,
            };
            if field != MealField::default() {
                meals.insert(slot, field);
            }
        }

        Ok(Self {
            id: Some(row.get("id")?),
            week_start,
            weekday,
            menu_type,
            meals,
            notes: row.get("notes")?,
        })
    }

    /// Stored rows for one week and menu type, Monday first
    pub fn list_for_week(
        conn: &Connection,
        week_start: NaiveDate,
        menu_type: MenuType,
    ) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM weekly_menus WHERE week_start = ?1 AND menu_type = ?2 ORDER BY day_of_week",
        )?;

        let items = stmt
            .query_map(
                params![week_start_of(week_start).to_string(), menu_type.as_str()],
                Self::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// The five weekday rows, with empty placeholders for days not stored
    pub fn load_week(
        conn: &Connection,
        week_start: NaiveDate,
        menu_type: MenuType,
    ) -> DbResult<Vec<Self>> {
        let stored = Self::list_for_week(conn, week_start, menu_type)?;
        Ok(WEEKDAYS
            .iter()
            .map(|day| {
                stored
                    .iter()
                    .find(|item| item.weekday == *day)
                    .cloned()
                    .unwrap_or_else(|| Self::empty(week_start, *day, menu_type))
            })
            .collect())
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM weekly_menus WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert, update or delete this row. Updates `self.id` accordingly.
    /// Concurrent writers are last-write-wins per row.
    pub fn save(&mut self, conn: &Connection, outcome: &mut SaveOutcome) -> DbResult<()> {
        if !WEEKDAYS.contains(&self.weekday) {
            return Err(DbError::Invalid(format!("{:?} is not a planned weekday", self.weekday)));
        }

        if self.is_empty() {
            if let Some(id) = self.id.take() {
                conn.execute("DELETE FROM weekly_menus WHERE id = ?1", [id])?;
                outcome.deleted += 1;
            }
            return Ok(());
        }

        let week_start = week_start_of(self.week_start).to_string();
        let day_of_week = self.weekday.number_from_monday();

        let mut columns = vec!["week_start".to_string(), "day_of_week".to_string(), "menu_type".to_string()];
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(week_start.clone()),
            Box::new(day_of_week),
            Box::new(self.menu_type.as_str()),
        ];
        for slot in MealSlot::ALL {
            let field = self.meals.get(&slot).cloned().unwrap_or_default();
            columns.push(slot.as_str().to_string());
            values.push(Box::new(field.text));
            columns.push(slot.time_column());
            values.push(Box::new(field.time));
        }
        columns.push("notes".to_string());
        values.push(Box::new(self.notes.clone()));

        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
        let assignments: Vec<String> = columns
            .iter()
            .skip(3)
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();

        let sql = format!(
            "INSERT INTO weekly_menus ({}) VALUES ({})
             ON CONFLICT(week_start, day_of_week, menu_type) DO UPDATE SET {}, updated_at = datetime('now')",
            columns.join(", "),
            placeholders.join(", "),
            assignments.join(", "),
        );

        let params_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        let id: i64 = conn.query_row(
            "SELECT id FROM weekly_menus WHERE week_start = ?1 AND day_of_week = ?2 AND menu_type = ?3",
            params![week_start, day_of_week, self.menu_type.as_str()],
            |row| row.get(0),
        )?;

        if self.id.is_some() {
            outcome.updated += 1;
        } else {
            outcome.inserted += 1;
        }
        self.id = Some(id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_week_start_of() {
        let thursday = NaiveDate::from_ymd_opt(2026, 10, 22).unwrap();
        assert_eq!(week_start_of(thursday), monday());
        assert_eq!(week_start_of(monday()), monday());
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();
        assert_eq!(week_start_of(sunday), monday());
    }

    #[test]
    fn test_date_for() {
        assert_eq!(date_for(monday(), Weekday::Fri), NaiveDate::from_ymd_opt(2026, 10, 23).unwrap());
    }

    #[test]
    fn test_slot_applicability() {
        assert!(!MenuType::Toddler.allows(MealSlot::Bottle));
        assert!(!MenuType::Toddler.allows(MealSlot::PreDinner));
        assert!(MenuType::Infant6To24.allows(MealSlot::Bottle));
        assert_eq!(MenuType::Infant0To6.slots().len(), 3);
        assert_eq!(MenuType::Infant6To24.slots().len(), 7);
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(MealSlot::from_str("Morning snack"), Some(MealSlot::MorningSnack));
        assert_eq!(MealSlot::from_str("pre-dinner"), Some(MealSlot::PreDinner));
        assert_eq!(MenuType::from_str("infant_6_24"), Some(MenuType::Infant6To24));
        assert_eq!(parse_weekday("Quarta"), Some(Weekday::Wed));
        assert_eq!(normalize_time("7:30"), Some("07:30".to_string()));
        assert_eq!(normalize_time("11h15"), Some("11:15".to_string()));
        assert_eq!(normalize_time("lunch"), None);
    }

    #[test]
    fn test_set_text_clears_empty() {
        let mut item = MenuItem::empty(monday(), Weekday::Mon, MenuType::Toddler);
        item.set_text(MealSlot::Lunch, "Arroz 100g");
        assert_eq!(item.text(MealSlot::Lunch), "Arroz 100g");
        item.set_text(MealSlot::Lunch, "   ");
        assert!(item.meals.is_empty());
        assert!(item.is_empty());

        item.set_time(MealSlot::Lunch, Some("11:30".to_string()));
        assert!(!item.is_empty());
    }

    #[test]
    fn test_save_insert_update_delete() {
        let conn = setup();
        let mut outcome = SaveOutcome::default();
        let mut item = MenuItem::empty(monday(), Weekday::Tue, MenuType::Toddler);
        item.set_text(MealSlot::Lunch, "Arroz, feijão");
        item.set_time(MealSlot::Lunch, Some("11:00".to_string()));
        item.save(&conn, &mut outcome).unwrap();
        assert!(item.id.is_some());

        let week = MenuItem::load_week(&conn, monday(), MenuType::Toddler).unwrap();
        assert_eq!(week.len(), 5);
        assert_eq!(week[1].text(MealSlot::Lunch), "Arroz, feijão");
        assert_eq!(week[1].time(MealSlot::Lunch), Some("11:00"));
        assert_eq!(week[0].id, None);

        item.set_text(MealSlot::Lunch, "Macarrão");
        item.save(&conn, &mut outcome).unwrap();
        let stored = MenuItem::get_by_id(&conn, item.id.unwrap()).unwrap().unwrap();
        assert_eq!(stored.text(MealSlot::Lunch), "Macarrão");

        item.set_text(MealSlot::Lunch, "");
        item.set_time(MealSlot::Lunch, None);
        item.save(&conn, &mut outcome).unwrap();
        assert_eq!(item.id, None);
        assert!(MenuItem::list_for_week(&conn, monday(), MenuType::Toddler).unwrap().is_empty());

        assert_eq!(outcome, SaveOutcome { inserted: 1, updated: 1, deleted: 1 });
    }

    #[test]
    fn test_menu_types_are_isolated() {
        let conn = setup();
        let mut outcome = SaveOutcome::default();
        let mut item = MenuItem::empty(monday(), Weekday::Mon, MenuType::Infant6To24);
        item.set_text(MealSlot::Bottle, "Leite 180ml");
        item.save(&conn, &mut outcome).unwrap();
        assert!(MenuItem::list_for_week(&conn, monday(), MenuType::Toddler).unwrap().is_empty());
        assert_eq!(MenuItem::list_for_week(&conn, monday(), MenuType::Infant6To24).unwrap().len(), 1);
    }
}
