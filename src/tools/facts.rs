//! Nutrient Fact MCP Tools
//!
//! Tools for managing the nutrient fact table.

use serde::Serialize;

use crate::db::Database;
use crate::models::{FactBasis, NutrientFact, NutrientFactCreate, NutrientFactUpdate, NutritionTotals};

/// Response for add_nutrient_fact
#[derive(Debug, Serialize)]
pub struct AddNutrientFactResponse {
    pub id: i64,
    pub name: String,
    pub basis: FactBasis,
    pub created_at: String,
}

/// Summary of a fact for list/search results
#[derive(Debug, Serialize)]
pub struct NutrientFactSummary {
    pub id: i64,
    pub name: String,
    pub basis: FactBasis,
    pub portion_grams: Option<f64>,
    pub energy: f64,
    pub protein: f64,
}

impl From<&NutrientFact> for NutrientFactSummary {
    fn from(fact: &NutrientFact) -> Self {
        Self {
            id: fact.id,
            name: fact.name.clone(),
            basis: fact.basis,
            portion_grams: fact.portion_grams,
            energy: fact.nutrition.energy,
            protein: fact.nutrition.protein,
        }
    }
}

/// Response for search_nutrient_facts
#[derive(Debug, Serialize)]
pub struct SearchNutrientFactsResponse {
    pub items: Vec<NutrientFactSummary>,
    pub total: usize,
}

/// Response for list_nutrient_facts
#[derive(Debug, Serialize)]
pub struct ListNutrientFactsResponse {
    pub items: Vec<NutrientFactSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for update_nutrient_fact
#[derive(Debug, Serialize)]
pub struct UpdateNutrientFactResponse {
    pub success: bool,
    pub fact: NutrientFact,
    /// Open menu sessions recomputed with the new values
    pub sessions_refreshed: usize,
}

/// Response for delete_nutrient_fact
#[derive(Debug, Serialize)]
pub struct DeleteNutrientFactResponse {
    pub success: bool,
    pub deleted_id: i64,
}

/// Add a new nutrient fact
pub fn add_nutrient_fact(db: &Database, data: NutrientFactCreate) -> Result<AddNutrientFactResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if NutrientFact::get_by_name(&conn, &data.name)
        .map_err(|e| format!("Database error: {}", e))?
        .is_some()
    {
        return Err(format!("A nutrient fact named '{}' already exists", data.name.trim()));
    }

    let fact = NutrientFact::create(&conn, &data)
        .map_err(|e| format!("Failed to create nutrient fact: {}", e))?;

    tracing::info!("Added nutrient fact {} '{}'", fact.id, fact.name);

    Ok(AddNutrientFactResponse {
        id: fact.id,
        name: fact.name,
        basis: fact.basis,
        created_at: fact.created_at,
    })
}

/// Search facts by name
pub fn search_nutrient_facts(db: &Database, query: &str, limit: i64) -> Result<SearchNutrientFactsResponse, String> {
    let limit = limit.min(100).max(1);
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let facts = NutrientFact::search(&conn, query, limit)
        .map_err(|e| format!("Search failed: {}", e))?;

    let items: Vec<NutrientFactSummary> = facts.iter().map(NutrientFactSummary::from).collect();
    let total = items.len();

    Ok(SearchNutrientFactsResponse { items, total })
}

pub fn get_nutrient_fact(db: &Database, id: i64) -> Result<Option<NutrientFact>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    NutrientFact::get_by_id(&conn, id).map_err(|e| format!("Failed to get nutrient fact: {}", e))
}

/// List facts with sorting and pagination
pub fn list_nutrient_facts(db: &Database, sort_by: &str, limit: i64, offset: i64) -> Result<ListNutrientFactsResponse, String> {
    let limit = limit.min(200).max(1);
    let offset = offset.max(0);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let facts = NutrientFact::list(&conn, sort_by, limit, offset)
        .map_err(|e| format!("Failed to list nutrient facts: {}", e))?;
    let total = NutrientFact::count(&conn)
        .map_err(|e| format!("Failed to count nutrient facts: {}", e))?;

    Ok(ListNutrientFactsResponse {
        items: facts.iter().map(NutrientFactSummary::from).collect(),
        total,
        limit,
        offset,
    })
}

/// Update a fact. The caller refreshes open sessions afterwards.
pub fn update_nutrient_fact(db: &Database, id: i64, data: NutrientFactUpdate) -> Result<NutrientFact, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let updated = NutrientFact::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update nutrient fact: {}", e))?;

    updated.ok_or_else(|| format!("Nutrient fact not found with id: {}", id))
}

pub fn delete_nutrient_fact(db: &Database, id: i64) -> Result<DeleteNutrientFactResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let deleted = NutrientFact::delete(&conn, id)
        .map_err(|e| format!("Failed to delete nutrient fact: {}", e))?;
    if !deleted {
        return Err(format!("Nutrient fact not found with id: {}", id));
    }

    tracing::info!("Deleted nutrient fact {}", id);

    Ok(DeleteNutrientFactResponse {
        success: true,
        deleted_id: id,
    })
}

/// Build nutrient values from optional tool arguments; missing values are 0
#[allow(clippy::too_many_arguments)]
pub fn totals_from_parts(
    energy: f64,
    protein: Option<f64>,
    lipid: Option<f64>,
    carbohydrate: Option<f64>,
    fiber: Option<f64>,
    calcium: Option<f64>,
    iron: Option<f64>,
    sodium: Option<f64>,
    vitamin_c: Option<f64>,
    vitamin_a: Option<f64>,
) -> NutritionTotals {
    NutritionTotals {
        energy,
        protein: protein.unwrap_or(0.0),
        lipid: lipid.unwrap_or(0.0),
        carbohydrate: carbohydrate.unwrap_or(0.0),
        fiber: fiber.unwrap_or(0.0),
        calcium: calcium.unwrap_or(0.0),
        iron: iron.unwrap_or(0.0),
        sodium: sodium.unwrap_or(0.0),
        vitamin_c: vitamin_c.unwrap_or(0.0),
        vitamin_a: vitamin_a.unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| run_migrations(conn)).unwrap();
        db
    }

    fn arroz() -> NutrientFactCreate {
        NutrientFactCreate {
            name: "Arroz".to_string(),
            basis: FactBasis::Per100g,
            portion_grams: Some(90.0),
            nutrition: totals_from_parts(128.0, Some(2.5), None, Some(28.1), None, None, None, None, None, None),
            notes: None,
        }
    }

    #[test]
    fn test_add_rejects_duplicate_name() {
        let db = setup();
        add_nutrient_fact(&db, arroz()).unwrap();
        let mut dup = arroz();
        dup.name = "ARROZ".to_string();
        assert!(add_nutrient_fact(&db, dup).is_err());
    }

    #[test]
    fn test_search_list_update_delete() {
        let db = setup();
        let added = add_nutrient_fact(&db, arroz()).unwrap();

        let found = search_nutrient_facts(&db, "arr", 10).unwrap();
        assert_eq!(found.total, 1);

        let listed = list_nutrient_facts(&db, "name", 500, -3).unwrap();
        assert_eq!((listed.total, listed.limit, listed.offset), (1, 200, 0));

        let updated = update_nutrient_fact(&db, added.id, NutrientFactUpdate {
            energy: Some(130.0),
            ..Default::default()
        }).unwrap();
        assert_eq!(updated.nutrition.energy, 130.0);
        assert_eq!(updated.nutrition.protein, 2.5);

        delete_nutrient_fact(&db, added.id).unwrap();
        assert!(get_nutrient_fact(&db, added.id).unwrap().is_none());
        assert!(delete_nutrient_fact(&db, added.id).is_err());
    }
}
