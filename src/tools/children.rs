//! Children Roster MCP Tools
//!
//! Tools for maintaining the children and their declared allergies.

use serde::Serialize;

use crate::db::Database;
use crate::models::{ChildAllergyRecord, ChildCreate, ChildUpdate};

/// Response for list_children
#[derive(Debug, Serialize)]
pub struct ListChildrenResponse {
    pub children: Vec<ChildAllergyRecord>,
    pub total: usize,
    pub with_allergies: usize,
}

/// Response for delete_child
#[derive(Debug, Serialize)]
pub struct DeleteChildResponse {
    pub success: bool,
    pub deleted_id: i64,
}

pub fn add_child(db: &Database, data: ChildCreate) -> Result<ChildAllergyRecord, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let child = ChildAllergyRecord::create(&conn, &data)
        .map_err(|e| format!("Failed to add child: {}", e))?;

    tracing::info!("Added child {} '{}'", child.id, child.name);
    Ok(child)
}

/// List children, optionally only the active ones
pub fn list_children(db: &Database, active_only: bool) -> Result<ListChildrenResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let children = ChildAllergyRecord::list(&conn, active_only)
        .map_err(|e| format!("Failed to list children: {}", e))?;
    let with_allergies = children.iter().filter(|c| !c.allergy_text().is_empty()).count();

    Ok(ListChildrenResponse {
        total: children.len(),
        with_allergies,
        children,
    })
}

pub fn update_child(db: &Database, id: i64, data: ChildUpdate) -> Result<ChildAllergyRecord, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    ChildAllergyRecord::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update child: {}", e))?
        .ok_or_else(|| format!("Child not found with id: {}", id))
}

pub fn delete_child(db: &Database, id: i64) -> Result<DeleteChildResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let deleted = ChildAllergyRecord::delete(&conn, id)
        .map_err(|e| format!("Failed to delete child: {}", e))?;
    if !deleted {
        return Err(format!("Child not found with id: {}", id));
    }

    Ok(DeleteChildResponse {
        success: true,
        deleted_id: id,
    })
}

/// Current allergy roster (active children with allergies)
pub fn load_roster(db: &Database) -> Result<Vec<ChildAllergyRecord>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    ChildAllergyRecord::allergy_roster(&conn).map_err(|e| format!("Failed to load allergy roster: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;

    #[test]
    fn test_children_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| run_migrations(conn)).unwrap();

        let ana = add_child(&db, ChildCreate {
            name: "Ana".to_string(),
            allergies: Some("Amendoim".to_string()),
        }).unwrap();
        add_child(&db, ChildCreate { name: "Bruno".to_string(), allergies: None }).unwrap();
        assert!(add_child(&db, ChildCreate { name: " ".to_string(), allergies: None }).is_err());

        let listed = list_children(&db, true).unwrap();
        assert_eq!((listed.total, listed.with_allergies), (2, 1));

        update_child(&db, ana.id, ChildUpdate { active: Some(false), ..Default::default() }).unwrap();
        assert!(load_roster(&db).unwrap().is_empty());

        delete_child(&db, ana.id).unwrap();
        assert!(update_child(&db, ana.id, ChildUpdate::default()).is_err());
    }
}
