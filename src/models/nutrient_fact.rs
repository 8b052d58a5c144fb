//! Nutrient fact model
//!
//! Canonical nutrient values for one food, stored per 100 g, per 100 ml or
//! per unit.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use super::NutritionTotals;

/// What quantity the stored nutrient values refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FactBasis {
    #[default]
    Per100g,
    Per100ml,
    PerUnit,
}

impl FactBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactBasis::Per100g => "per_100g",
            FactBasis::Per100ml => "per_100ml",
            FactBasis::PerUnit => "per_unit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "per_100g" | "100g" | "g" => Some(FactBasis::Per100g),
            "per_100ml" | "100ml" | "ml" => Some(FactBasis::Per100ml),
            "per_unit" | "unit" | "count" => Some(FactBasis::PerUnit),
            _ => None,
        }
    }
}

/// A row of the nutrient fact table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutrientFact {
    pub id: i64,
    pub name: String,
    pub basis: FactBasis,
    /// Grams in one household portion or unit, when known
    pub portion_grams: Option<f64>,
    pub nutrition: NutritionTotals,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a nutrient fact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutrientFactCreate {
    pub name: String,
    #[serde(default)]
    pub basis: FactBasis,
    pub portion_grams: Option<f64>,
    pub nutrition: NutritionTotals,
    pub notes: Option<String>,
}

/// Data for updating a nutrient fact; `None` leaves the column untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NutrientFactUpdate {
    pub name: Option<String>,
    pub basis: Option<FactBasis>,
    pub portion_grams: Option<f64>,
    pub energy: Option<f64>,
    pub protein: Option<f64>,
    pub lipid: Option<f64>,
    pub carbohydrate: Option<f64>,
    pub fiber: Option<f64>,
    pub calcium: Option<f64>,
    pub iron: Option<f64>,
    pub sodium: Option<f64>,
    pub vitamin_c: Option<f64>,
    pub vitamin_a: Option<f64>,
    pub notes: Option<String>,
}

fn validate(name: &str, portion_grams: Option<f64>, nutrition: &NutritionTotals) -> DbResult<()> {
    if name.trim().is_empty() {
        return Err(DbError::Invalid("name must not be empty".to_string()));
    }
    if let Some(grams) = portion_grams {
        if !(grams.is_finite() && grams > 0.0) {
            return Err(DbError::Invalid(format!("portion_grams must be positive, got {}", grams)));
        }
    }
    if !nutrition.is_valid() {
        return Err(DbError::Invalid("nutrient values must be non-negative".to_string()));
    }
    Ok(())
}

impl NutrientFact {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let basis: String = row.get("basis")?;
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            basis: FactBasis::from_str(&basis).unwrap_or_default(),
            portion_grams: row.get("portion_grams")?,
            nutrition: NutritionTotals {
                energy: row.get("energy")?,
                protein: row.get("protein")?,
                lipid: row.get("lipid")?,
                carbohydrate: row.get("carbohydrate")?,
                fiber: row.get("fiber")?,
                calcium: row.get("calcium")?,
                iron: row.get("iron")?,
                sodium: row.get("sodium")?,
                vitamin_c: row.get("vitamin_c")?,
                vitamin_a: row.get("vitamin_a")?,
            },
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new fact
    pub fn create(conn: &Connection, data: &NutrientFactCreate) -> DbResult<Self> {
        validate(&data.name, data.portion_grams, &data.nutrition)?;
        let n = &data.nutrition;

        conn.execute(
            r#"
            INSERT INTO nutrient_facts (
                name, basis, portion_grams,
                energy, protein, lipid, carbohydrate, fiber,
                calcium, iron, sodium, vitamin_c, vitamin_a, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                data.name.trim(),
                data.basis.as_str(),
                data.portion_grams,
                n.energy,
                n.protein,
                n.lipid,
                n.carbohydrate,
                n.fiber,
                n.calcium,
                n.iron,
                n.sodium,
                n.vitamin_c,
                n.vitamin_a,
                data.notes,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::NotFound { entity: "nutrient fact", id })
    }

    /// Insert or replace by name (used by seeding). Replacing writes every
    /// column, so a missing portion or note clears the stored one.
    pub fn upsert(conn: &Connection, data: &NutrientFactCreate) -> DbResult<Self> {
        let existing = match Self::get_by_name(conn, &data.name)? {
            Some(fact) => fact,
            None => return Self::create(conn, data),
        };

        validate(&data.name, data.portion_grams, &data.nutrition)?;
        let n = &data.nutrition;

        conn.execute(
            r#"
            UPDATE nutrient_facts SET
                basis = ?1, portion_grams = ?2,
                energy = ?3, protein = ?4, lipid = ?5, carbohydrate = ?6, fiber = ?7,
                calcium = ?8, iron = ?9, sodium = ?10, vitamin_c = ?11, vitamin_a = ?12,
                notes = ?13, updated_at = datetime('now')
            WHERE id = ?14
            "#,
            params![
                data.basis.as_str(),
                data.portion_grams,
                n.energy,
                n.protein,
                n.lipid,
                n.carbohydrate,
                n.fiber,
                n.calcium,
                n.iron,
                n.sodium,
                n.vitamin_c,
                n.vitamin_a,
                data.notes,
                existing.id,
            ],
        )?;

        Self::get_by_id(conn, existing.id)?.ok_or(DbError::NotFound { entity: "nutrient fact", id: existing.id })
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM nutrient_facts WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(fact) => Ok(Some(fact)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Exact (case-insensitive) name lookup
    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM nutrient_facts WHERE name = ?1 COLLATE NOCASE")?;

        match stmt.query_row([name.trim()], Self::from_row) {
            Ok(fact) => Ok(Some(fact)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Substring search on name
    pub fn search(conn: &Connection, query: &str, limit: i64) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", query.trim());
        let mut stmt = conn.prepare(
            "SELECT * FROM nutrient_facts WHERE name LIKE ?1 ORDER BY name ASC LIMIT ?2",
        )?;

        let facts = stmt
            .query_map(params![pattern, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(facts)
    }

    /// Every fact, ordered by name. This is what a planning session loads.
    pub fn list_all(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM nutrient_facts ORDER BY name ASC, id ASC")?;

        let facts = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(facts)
    }

    pub fn list(conn: &Connection, sort_by: &str, limit: i64, offset: i64) -> DbResult<Vec<Self>> {
        let sort_col = match sort_by.to_lowercase().as_str() {
            "energy" => "energy DESC",
            "created_at" => "created_at DESC",
            _ => "name ASC",
        };

        let sql = format!(
            "SELECT * FROM nutrient_facts ORDER BY {} LIMIT ?1 OFFSET ?2",
            sort_col
        );
        let mut stmt = conn.prepare(&sql)?;

        let facts = stmt
            .query_map(params![limit, offset], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(facts)
    }

    pub fn count(conn: &Connection) -> DbResult<i64> {
        Ok(conn.query_row("SELECT COUNT(*) FROM nutrient_facts", [], |row| row.get(0))?)
    }

    /// Partial update
    pub fn update(conn: &Connection, id: i64, data: &NutrientFactUpdate) -> DbResult<Option<Self>> {
        let existing = match Self::get_by_id(conn, id)? {
            Some(fact) => fact,
            None => return Ok(None),
        };

        let mut merged = existing.nutrition;
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(v) = data.$field { merged.$field = v; })*
            };
        }
        merge!(energy, protein, lipid, carbohydrate, fiber, calcium, iron, sodium, vitamin_c, vitamin_a);

        let name = data.name.clone().unwrap_or(existing.name);
        let portion_grams = data.portion_grams.or(existing.portion_grams);
        validate(&name, portion_grams, &merged)?;

        let basis = data.basis.unwrap_or(existing.basis);
        let notes = data.notes.clone().or(existing.notes);

        conn.execute(
            r#"
            UPDATE nutrient_facts SET
                name = ?1, basis = ?2, portion_grams = ?3,
                energy = ?4, protein = ?5, lipid = ?6, carbohydrate = ?7, fiber = ?8,
                calcium = ?9, iron = ?10, sodium = ?11, vitamin_c = ?12, vitamin_a = ?13,
                notes = ?14, updated_at = datetime('now')
            WHERE id = ?15
            "#,
            params![
                name.trim(),
                basis.as_str(),
                portion_grams,
                merged.energy,
                merged.protein,
                merged.lipid,
                merged.carbohydrate,
                merged.fiber,
                merged.calcium,
                merged.iron,
                merged.sodium,
                merged.vitamin_c,
                merged.vitamin_a,
                notes,
                id,
            ],
        )?;

        Self::get_by_id(conn, id)
    }

    /// Returns Ok(false) if not found
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM nutrient_facts WHERE id = ?1", [id])?;
        Ok(rows > 0)
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

    fn rice() -> NutrientFactCreate {
        NutrientFactCreate {
            name: "Arroz".to_string(),
            basis: FactBasis::Per100g,
            portion_grams: Some(80.0),
            nutrition: NutritionTotals {
                energy: 128.0,
                protein: 2.5,
                carbohydrate: 28.1,
                ..NutritionTotals::zero()
            },
            notes: None,
        }
    }

    #[test]
    fn test_create_and_get_by_name_case_insensitive() {
        let conn = setup();
        let created = NutrientFact::create(&conn, &rice()).unwrap();
        let found = NutrientFact::get_by_name(&conn, "ARROZ").unwrap().unwrap();
        assert_eq!(created.id, found.id);
        assert_eq!(found.nutrition.energy, 128.0);
        assert_eq!(found.portion_grams, Some(80.0));
    }

    #[test]
    fn test_rejects_negative_values() {
        let conn = setup();
        let mut data = rice();
        data.nutrition.iron = -1.0;
        assert!(matches!(NutrientFact::create(&conn, &data), Err(DbError::Invalid(_))));
    }

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let conn = setup();
        let created = NutrientFact::create(&conn, &rice()).unwrap();
        let update = NutrientFactUpdate {
            energy: Some(130.0),
            ..Default::default()
        };
        let updated = NutrientFact::update(&conn, created.id, &update).unwrap().unwrap();
        assert_eq!(updated.nutrition.energy, 130.0);
        assert_eq!(updated.nutrition.protein, 2.5);
        assert_eq!(updated.name, "Arroz");
    }

    #[test]
    fn test_upsert_replaces_values() {
        let conn = setup();
        NutrientFact::create(&conn, &rice()).unwrap();
        let mut data = rice();
        data.nutrition.energy = 140.0;
        NutrientFact::upsert(&conn, &data).unwrap();
        assert_eq!(NutrientFact::count(&conn).unwrap(), 1);
        let found = NutrientFact::get_by_name(&conn, "arroz").unwrap().unwrap();
        assert_eq!(found.nutrition.energy, 140.0);
    }

    #[test]
    fn test_upsert_clears_portion_and_notes() {
        let conn = setup();
        let mut data = rice();
        data.notes = Some("TACO".to_string());
        NutrientFact::create(&conn, &data).unwrap();

        data.portion_grams = None;
        data.notes = None;
        let replaced = NutrientFact::upsert(&conn, &data).unwrap();
        assert_eq!(replaced.portion_grams, None);
        assert_eq!(replaced.notes, None);
        assert_eq!(replaced.nutrition.energy, 128.0);
    }

    #[test]
    fn test_search_and_delete() {
        let conn = setup();
        let created = NutrientFact::create(&conn, &rice()).unwrap();
        assert_eq!(NutrientFact::search(&conn, "rro", 10).unwrap().len(), 1);
        assert!(NutrientFact::delete(&conn, created.id).unwrap());
        assert!(!NutrientFact::delete(&conn, created.id).unwrap());
    }
}
