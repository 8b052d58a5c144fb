//! Child roster model
//!
//! Children with their declared allergies as free text.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildAllergyRecord {
    pub id: i64,
    pub name: String,
    /// Free text, e.g. "Amendoim, proteína do leite"
    pub allergies: Option<String>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildCreate {
    pub name: String,
    pub allergies: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChildUpdate {
    pub name: Option<String>,
    pub allergies: Option<String>,
    pub active: Option<bool>,
}

impl ChildAllergyRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            allergies: row.get("allergies")?,
            active: row.get::<_, i64>("active")? != 0,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Allergy text, empty when none declared
    pub fn allergy_text(&self) -> &str {
        self.allergies.as_deref().unwrap_or("").trim()
    }

    pub fn create(conn: &Connection, data: &ChildCreate) -> DbResult<Self> {
        if data.name.trim().is_empty() {
            return Err(DbError::Invalid("child name must not be empty".to_string()));
        }

        conn.execute(
            "INSERT INTO children (name, allergies) VALUES (?1, ?2)",
            params![data.name.trim(), data.allergies],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::NotFound { entity: "child", id })
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM children WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(child) => Ok(Some(child)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list(conn: &Connection, active_only: bool) -> DbResult<Vec<Self>> {
        let sql = if active_only {
            "SELECT * FROM children WHERE active = 1 ORDER BY name ASC, id ASC"
        } else {
            "SELECT * FROM children ORDER BY name ASC, id ASC"
        };
        let mut stmt = conn.prepare(sql)?;

        let children = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(children)
    }

    /// Active children that declared at least one allergy
    pub fn allergy_roster(conn: &Connection) -> DbResult<Vec<Self>> {
        Ok(Self::list(conn, true)?
            .into_iter()
            .filter(|c| !c.allergy_text().is_empty())
            .collect())
    }

    pub fn update(conn: &Connection, id: i64, data: &ChildUpdate) -> DbResult<Option<Self>> {
        let existing = match Self::get_by_id(conn, id)? {
            Some(child) => child,
            None => return Ok(None),
        };

        let name = data.name.clone().unwrap_or(existing.name);
        if name.trim().is_empty() {
            return Err(DbError::Invalid("child name must not be empty".to_string()));
        }
        let allergies = data.allergies.clone().or(existing.allergies);
        let active = data.active.unwrap_or(existing.active);

        conn.execute(
            r#"
            UPDATE children SET name = ?1, allergies = ?2, active = ?3, updated_at = datetime('now')
            WHERE id = ?4
            "#,
            params![name.trim(), allergies, active as i64, id],
        )?;

        Self::get_by_id(conn, id)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM children WHERE id = ?1", [id])?;
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

    #[test]
    fn test_roster_skips_inactive_and_allergy_free() {
        let conn = setup();
        let ana = ChildAllergyRecord::create(&conn, &ChildCreate {
            name: "Ana".to_string(),
            allergies: Some("Amendoim".to_string()),
        }).unwrap();
        ChildAllergyRecord::create(&conn, &ChildCreate {
            name: "Bruno".to_string(),
            allergies: None,
        }).unwrap();
        let caio = ChildAllergyRecord::create(&conn, &ChildCreate {
            name: "Caio".to_string(),
            allergies: Some("Glúten".to_string()),
        }).unwrap();

        ChildAllergyRecord::update(&conn, caio.id, &ChildUpdate {
            active: Some(false),
            ..Default::default()
        }).unwrap();

        let roster = ChildAllergyRecord::allergy_roster(&conn).unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].id, ana.id);
        assert_eq!(ChildAllergyRecord::list(&conn, false).unwrap().len(), 3);
    }

    #[test]
    fn test_update_and_delete() {
        let conn = setup();
        let child = ChildAllergyRecord::create(&conn, &ChildCreate {
            name: "Duda".to_string(),
            allergies: None,
        }).unwrap();
        let updated = ChildAllergyRecord::update(&conn, child.id, &ChildUpdate {
            allergies: Some("Ovo".to_string()),
            ..Default::default()
        }).unwrap().unwrap();
        assert_eq!(updated.allergy_text(), "Ovo");
        assert!(ChildAllergyRecord::delete(&conn, child.id).unwrap());
        assert!(ChildAllergyRecord::get_by_id(&conn, child.id).unwrap().is_none());
    }
}
