//! Menuplan MCP Server Implementation
//!
//! Implements the MCP server with all menu planning tools.

use std::path::PathBuf;
use std::sync::{Arc, MutexGuard};

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::db::Database;
use crate::models::{ChildCreate, ChildUpdate, FactBasis, NutrientFactCreate, NutrientFactUpdate};
use crate::tools::children;
use crate::tools::facts;
use crate::tools::menus::{self, parse_day, parse_session_key, parse_slot, SessionMap};
use crate::tools::reports;
use crate::tools::status::StatusTracker;

/// Menuplan MCP Service
#[derive(Clone)]
pub struct MenuplanService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    reports_dir: PathBuf,
    tool_router: ToolRouter<MenuplanService>,
    /// Open menu weeks keyed by (Monday, menu type)
    sessions: Arc<std::sync::Mutex<SessionMap>>,
}

impl MenuplanService {
    pub fn new(config: &Config, database: Database) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(config.database_path.clone()))),
            database,
            reports_dir: config.reports_dir.clone(),
            tool_router: Self::tool_router(),
            sessions: Arc::new(std::sync::Mutex::new(SessionMap::new())),
        }
    }

    fn lock_sessions(&self) -> Result<MutexGuard<'_, SessionMap>, McpError> {
        self.sessions
            .lock()
            .map_err(|_| McpError::internal_error("Menu session lock poisoned", None))
    }

    /// Reload facts into open weeks. The fact change is already committed,
    /// so a failure here is logged and reported as zero sessions refreshed.
    fn refresh_open_facts(&self) -> usize {
        let refreshed = self
            .lock_sessions()
            .map_err(|e| e.message.to_string())
            .and_then(|mut sessions| menus::refresh_session_facts(&self.database, &mut sessions));
        match refreshed {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Failed to refresh open menu weeks after fact change: {}", e);
                0
            }
        }
    }

    /// Reload the allergy roster into open weeks, logging failures
    fn refresh_open_roster(&self) -> usize {
        let refreshed = self
            .lock_sessions()
            .map_err(|e| e.message.to_string())
            .and_then(|mut sessions| menus::refresh_session_roster(&self.database, &mut sessions));
        match refreshed {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Failed to refresh open menu weeks after roster change: {}", e);
                0
            }
        }
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn parse_basis(basis: Option<&str>) -> Result<Option<FactBasis>, McpError> {
    match basis {
        Some(s) => FactBasis::from_str(s).map(Some).ok_or_else(|| {
            McpError::internal_error(
                format!("Unknown basis '{}', expected per_100g, per_100ml or per_unit", s),
                None,
            )
        }),
        None => Ok(None),
    }
}

// ============================================================================
// Nutrient Fact Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddNutrientFactParams {
    /// Food name, unique (case-insensitive)
    pub name: String,
    /// per_100g (default), per_100ml or per_unit
    pub basis: Option<String>,
    /// Grams in one household portion or unit
    pub portion_grams: Option<f64>,
    /// kcal
    pub energy: f64,
    /// g
    pub protein: Option<f64>,
    /// g
    pub lipid: Option<f64>,
    /// g
    pub carbohydrate: Option<f64>,
    /// g
    pub fiber: Option<f64>,
    /// mg
    pub calcium: Option<f64>,
    /// mg
    pub iron: Option<f64>,
    /// mg
    pub sodium: Option<f64>,
    /// mg
    pub vitamin_c: Option<f64>,
    /// µg
    pub vitamin_a: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchNutrientFactsParams {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

fn default_search_limit() -> i64 { 20 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IdParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListNutrientFactsParams {
    /// name (default), energy or created_at
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_sort_by() -> String { "name".to_string() }
fn default_list_limit() -> i64 { 50 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateNutrientFactParams {
    pub id: i64,
    pub name: Option<String>,
    pub basis: Option<String>,
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

// ============================================================================
// Children Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddChildParams {
    pub name: String,
    /// Free text, e.g. "Amendoim, proteína do leite"
    pub allergies: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListChildrenParams {
    /// Only active children (default false)
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateChildParams {
    pub id: i64,
    pub name: Option<String>,
    pub allergies: Option<String>,
    pub active: Option<bool>,
}

// ============================================================================
// Menu Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MealTextParams {
    /// Free meal text, e.g. "Arroz 100g, Frango grelhado 80g"
    pub text: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MenuWeekParams {
    /// Any date of the week (YYYY-MM-DD); normalized to its Monday
    pub week_start: String,
    /// infant_0_6, infant_6_24 or toddler
    pub menu_type: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct OpenMenuWeekParams {
    pub week_start: String,
    pub menu_type: String,
    /// Discard unsaved edits and re-read from the database (default false)
    #[serde(default)]
    pub reload: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetMealTextParams {
    pub week_start: String,
    pub menu_type: String,
    /// monday..friday
    pub day: String,
    /// breakfast, morning_snack, lunch, bottle, snack, pre_dinner or dinner
    pub slot: String,
    /// Meal text; empty clears the slot
    pub text: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetMealTimeParams {
    pub week_start: String,
    pub menu_type: String,
    pub day: String,
    pub slot: String,
    /// HH:MM; omit to clear
    pub time: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetDayNotesParams {
    pub week_start: String,
    pub menu_type: String,
    pub day: String,
    /// Omit to clear
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CloseMenuWeekParams {
    pub week_start: String,
    pub menu_type: String,
    /// Drop unsaved edits (default false)
    #[serde(default)]
    pub discard: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExportWeekMenuPdfParams {
    pub week_start: String,
    pub menu_type: String,
    /// Output file; defaults to the reports directory
    pub output_path: Option<String>,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl MenuplanService {
    // --- Status ---

    #[tool(description = "Get the current status of the menuplan service including build info, database status, open menu weeks and process information")]
    async fn menuplan_status(&self) -> Result<CallToolResult, McpError> {
        let open = self.lock_sessions()?.len();
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(&self.database, open);
        json_result(&status)
    }

    #[tool(description = "Get step-by-step instructions for planning a weekly menu. Call this when starting a planning session or when unsure how meal text is interpreted.")]
    fn menu_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::MENU_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(MENU_INSTRUCTIONS)]))
    }

    // --- Nutrient Facts ---

    #[tool(description = "Add a food to the nutrient fact table. Values are per 100 g, per 100 ml or per unit depending on basis.")]
    fn add_nutrient_fact(&self, Parameters(p): Parameters<AddNutrientFactParams>) -> Result<CallToolResult, McpError> {
        let data = NutrientFactCreate {
            name: p.name,
            basis: parse_basis(p.basis.as_deref())?.unwrap_or_default(),
            portion_grams: p.portion_grams,
            nutrition: facts::totals_from_parts(
                p.energy, p.protein, p.lipid, p.carbohydrate, p.fiber,
                p.calcium, p.iron, p.sodium, p.vitamin_c, p.vitamin_a,
            ),
            notes: p.notes,
        };
        let result = facts::add_nutrient_fact(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        self.refresh_open_facts();
        json_result(&result)
    }

    #[tool(description = "Search nutrient facts by name")]
    fn search_nutrient_facts(&self, Parameters(p): Parameters<SearchNutrientFactsParams>) -> Result<CallToolResult, McpError> {
        let result = facts::search_nutrient_facts(&self.database, &p.query, p.limit).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get all nutrient values of a fact")]
    fn get_nutrient_fact(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = facts::get_nutrient_fact(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(fact) => json_result(&fact),
            None => Ok(CallToolResult::success(vec![Content::text(format!(
                r#"{{"error": "Nutrient fact not found", "id": {}}}"#,
                p.id
            ))])),
        }
    }

    #[tool(description = "List nutrient facts with sorting and pagination")]
    fn list_nutrient_facts(&self, Parameters(p): Parameters<ListNutrientFactsParams>) -> Result<CallToolResult, McpError> {
        let result = facts::list_nutrient_facts(&self.database, &p.sort_by, p.limit, p.offset)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Update a nutrient fact. Open menu weeks are recomputed with the new values.")]
    fn update_nutrient_fact(&self, Parameters(p): Parameters<UpdateNutrientFactParams>) -> Result<CallToolResult, McpError> {
        let data = NutrientFactUpdate {
            name: p.name,
            basis: parse_basis(p.basis.as_deref())?,
            portion_grams: p.portion_grams,
            energy: p.energy, protein: p.protein, lipid: p.lipid, carbohydrate: p.carbohydrate,
            fiber: p.fiber, calcium: p.calcium, iron: p.iron, sodium: p.sodium,
            vitamin_c: p.vitamin_c, vitamin_a: p.vitamin_a,
            notes: p.notes,
        };
        let fact = facts::update_nutrient_fact(&self.database, p.id, data).map_err(|e| McpError::internal_error(e, None))?;
        let sessions_refreshed = self.refresh_open_facts();
        json_result(&facts::UpdateNutrientFactResponse {
            success: true,
            fact,
            sessions_refreshed,
        })
    }

    #[tool(description = "Delete a nutrient fact. Meals that used it become unresolved.")]
    fn delete_nutrient_fact(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = facts::delete_nutrient_fact(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        self.refresh_open_facts();
        json_result(&result)
    }

    // --- Children ---

    #[tool(description = "Add a child with their declared allergies (free text)")]
    fn add_child(&self, Parameters(p): Parameters<AddChildParams>) -> Result<CallToolResult, McpError> {
        let data = ChildCreate { name: p.name, allergies: p.allergies };
        let result = children::add_child(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        self.refresh_open_roster();
        json_result(&result)
    }

    #[tool(description = "List children and their allergies")]
    fn list_children(&self, Parameters(p): Parameters<ListChildrenParams>) -> Result<CallToolResult, McpError> {
        let result = children::list_children(&self.database, p.active_only).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Update a child's name, allergies or active flag. Inactive children are not checked for allergies.")]
    fn update_child(&self, Parameters(p): Parameters<UpdateChildParams>) -> Result<CallToolResult, McpError> {
        let data = ChildUpdate { name: p.name, allergies: p.allergies, active: p.active };
        let result = children::update_child(&self.database, p.id, data).map_err(|e| McpError::internal_error(e, None))?;
        self.refresh_open_roster();
        json_result(&result)
    }

    #[tool(description = "Delete a child from the roster")]
    fn delete_child(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = children::delete_child(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        self.refresh_open_roster();
        json_result(&result)
    }

    // --- Stateless meal checks ---

    #[tool(description = "Compute the nutrition of a meal text without opening a week. Returns per-ingredient contributions and unresolved ingredients; totals is null when nothing resolved.")]
    fn calculate_meal_nutrition(&self, Parameters(p): Parameters<MealTextParams>) -> Result<CallToolResult, McpError> {
        let result = menus::calculate_meal_nutrition(&self.database, &p.text).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Check a meal text against the active children's allergies. Informational only.")]
    fn check_meal_allergies(&self, Parameters(p): Parameters<MealTextParams>) -> Result<CallToolResult, McpError> {
        let result = menus::check_meal_allergies(&self.database, &p.text).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Menu weeks ---

    #[tool(description = "Open a weekly menu (Monday-Friday) for a menu type. Loads saved days, the nutrient fact table and the allergy roster.")]
    fn open_menu_week(&self, Parameters(p): Parameters<OpenMenuWeekParams>) -> Result<CallToolResult, McpError> {
        let key = parse_session_key(&p.week_start, &p.menu_type).map_err(|e| McpError::internal_error(e, None))?;
        let result = menus::open_menu_week(&self.database, &mut *self.lock_sessions()?, key, p.reload)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Set the free text of one meal slot and recompute its nutrition. Returns slot and day totals, unresolved ingredients and allergy alerts.")]
    fn set_meal_text(&self, Parameters(p): Parameters<SetMealTextParams>) -> Result<CallToolResult, McpError> {
        let key = parse_session_key(&p.week_start, &p.menu_type).map_err(|e| McpError::internal_error(e, None))?;
        let day = parse_day(&p.day).map_err(|e| McpError::internal_error(e, None))?;
        let slot = parse_slot(&p.slot).map_err(|e| McpError::internal_error(e, None))?;
        let result = menus::set_meal_text(&self.database, &mut *self.lock_sessions()?, key, day, slot, &p.text)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Set or clear the time (HH:MM) of one meal slot")]
    fn set_meal_time(&self, Parameters(p): Parameters<SetMealTimeParams>) -> Result<CallToolResult, McpError> {
        let key = parse_session_key(&p.week_start, &p.menu_type).map_err(|e| McpError::internal_error(e, None))?;
        let day = parse_day(&p.day).map_err(|e| McpError::internal_error(e, None))?;
        let slot = parse_slot(&p.slot).map_err(|e| McpError::internal_error(e, None))?;
        let result = menus::set_meal_time(&self.database, &mut *self.lock_sessions()?, key, day, slot, p.time.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Set or clear the notes of one day")]
    fn set_day_notes(&self, Parameters(p): Parameters<SetDayNotesParams>) -> Result<CallToolResult, McpError> {
        let key = parse_session_key(&p.week_start, &p.menu_type).map_err(|e| McpError::internal_error(e, None))?;
        let day = parse_day(&p.day).map_err(|e| McpError::internal_error(e, None))?;
        let result = menus::set_day_notes(&self.database, &mut *self.lock_sessions()?, key, day, p.notes.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get the five daily nutrition totals of a week (null when nothing in the day resolved)")]
    fn get_week_summary(&self, Parameters(p): Parameters<MenuWeekParams>) -> Result<CallToolResult, McpError> {
        let key = parse_session_key(&p.week_start, &p.menu_type).map_err(|e| McpError::internal_error(e, None))?;
        let result = menus::get_week_summary(&self.database, &mut *self.lock_sessions()?, key)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get allergy alerts for each day of a week")]
    fn get_week_allergy_alerts(&self, Parameters(p): Parameters<MenuWeekParams>) -> Result<CallToolResult, McpError> {
        let key = parse_session_key(&p.week_start, &p.menu_type).map_err(|e| McpError::internal_error(e, None))?;
        let result = menus::get_week_allergy_alerts(&self.database, &mut *self.lock_sessions()?, key)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Save all five days of a week in one transaction. Either every day is written or none is.")]
    fn save_menu_week(&self, Parameters(p): Parameters<MenuWeekParams>) -> Result<CallToolResult, McpError> {
        let key = parse_session_key(&p.week_start, &p.menu_type).map_err(|e| McpError::internal_error(e, None))?;
        let result = menus::save_menu_week(&self.database, &mut *self.lock_sessions()?, key)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Close a weekly menu. Refuses when there are unsaved changes unless discard=true.")]
    fn close_menu_week(&self, Parameters(p): Parameters<CloseMenuWeekParams>) -> Result<CallToolResult, McpError> {
        let key = parse_session_key(&p.week_start, &p.menu_type).map_err(|e| McpError::internal_error(e, None))?;
        let result = menus::close_menu_week(&mut *self.lock_sessions()?, key, p.discard)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Reports ---

    #[tool(description = "Export a weekly menu as PDF: meals per day, daily nutrition, an energy chart and allergy warnings")]
    fn export_week_menu_pdf(&self, Parameters(p): Parameters<ExportWeekMenuPdfParams>) -> Result<CallToolResult, McpError> {
        let key = parse_session_key(&p.week_start, &p.menu_type).map_err(|e| McpError::internal_error(e, None))?;
        let output_path = p
            .output_path
            .map(PathBuf::from)
            .unwrap_or_else(|| self.reports_dir.join(reports::default_report_name(key.0, key.1)));

        let mut sessions = self.lock_sessions()?;
        let session = menus::session_mut(&self.database, &mut sessions, key)
            .map_err(|e| McpError::internal_error(e, None))?;
        let result = reports::export_week_menu_pdf(session, &output_path)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for MenuplanService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "menuplan".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Daycare Menu Planner".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Daycare Menu Planner - weekly menus with derived nutrition and allergy checks. \
                 IMPORTANT: Call menu_instructions before planning. \
                 Facts: add/search/get/list/update/delete_nutrient_fact. \
                 Children: add_child/list_children/update_child/delete_child. \
                 Quick checks: calculate_meal_nutrition, check_meal_allergies. \
                 Weeks: open_menu_week, set_meal_text, set_meal_time, set_day_notes, \
                 get_week_summary, get_week_allergy_alerts, save_menu_week, close_menu_week. \
                 Reports: export_week_menu_pdf."
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;

    fn service() -> MenuplanService {
        let database = Database::open_in_memory().unwrap();
        database.with_conn(|conn| run_migrations(conn)).unwrap();
        let config = Config {
            database_path: PathBuf::from(":memory:"),
            reports_dir: std::env::temp_dir(),
        };
        MenuplanService::new(&config, database)
    }

    fn body(result: CallToolResult) -> serde_json::Value {
        let value = serde_json::to_value(&result).unwrap();
        let text = value["content"][0]["text"].as_str().unwrap().to_string();
        serde_json::from_str(&text).unwrap()
    }

    fn add_rice(service: &MenuplanService) -> i64 {
        let added = body(
            service
                .add_nutrient_fact(Parameters(AddNutrientFactParams {
                    name: "Arroz".to_string(),
                    basis: None,
                    portion_grams: None,
                    energy: 128.0,
                    protein: Some(2.5),
                    lipid: None,
                    carbohydrate: None,
                    fiber: None,
                    calcium: None,
                    iron: None,
                    sodium: None,
                    vitamin_c: None,
                    vitamin_a: None,
                    notes: None,
                }))
                .unwrap(),
        );
        added["id"].as_i64().unwrap()
    }

    fn week() -> MenuWeekParams {
        MenuWeekParams { week_start: "2026-10-21".to_string(), menu_type: "toddler".to_string() }
    }

    fn update_energy(id: i64, energy: f64) -> UpdateNutrientFactParams {
        UpdateNutrientFactParams {
            id,
            name: None,
            basis: None,
            portion_grams: None,
            energy: Some(energy),
            protein: None,
            lipid: None,
            carbohydrate: None,
            fiber: None,
            calcium: None,
            iron: None,
            sodium: None,
            vitamin_c: None,
            vitamin_a: None,
            notes: None,
        }
    }

    #[test]
    fn test_session_tools_share_open_week() {
        let service = service();
        let rice = add_rice(&service);

        let set = body(
            service
                .set_meal_text(Parameters(SetMealTextParams {
                    week_start: "2026-10-21".to_string(),
                    menu_type: "toddler".to_string(),
                    day: "monday".to_string(),
                    slot: "lunch".to_string(),
                    text: "Arroz 100g".to_string(),
                }))
                .unwrap(),
        );
        assert_eq!(set["totals"]["energy"].as_f64(), Some(128.0));

        let updated = body(service.update_nutrient_fact(Parameters(update_energy(rice, 130.0))).unwrap());
        assert_eq!(updated["sessions_refreshed"].as_u64(), Some(1));

        let summary = body(service.get_week_summary(Parameters(week())).unwrap());
        assert_eq!(summary["days"].as_array().unwrap().len(), 5);
        assert_eq!(summary["days"][0]["totals"]["energy"].as_f64(), Some(130.0));
        assert!(summary["days"][1]["totals"].is_null());

        let saved = body(service.save_menu_week(Parameters(week())).unwrap());
        assert_eq!(saved["outcome"]["inserted"].as_u64(), Some(1));

        let closed = body(
            service
                .close_menu_week(Parameters(CloseMenuWeekParams {
                    week_start: "2026-10-21".to_string(),
                    menu_type: "toddler".to_string(),
                    discard: false,
                }))
                .unwrap(),
        );
        assert_eq!(closed["closed"].as_bool(), Some(true));
    }

    #[test]
    fn test_committed_change_survives_failed_refresh() {
        let service = service();
        let rice = add_rice(&service);

        let sessions = service.sessions.clone();
        let _ = std::thread::spawn(move || {
            let _guard = sessions.lock().unwrap();
            panic!("poison the session lock");
        })
        .join();

        let updated = body(service.update_nutrient_fact(Parameters(update_energy(rice, 131.0))).unwrap());
        assert_eq!(updated["success"].as_bool(), Some(true));
        assert_eq!(updated["sessions_refreshed"].as_u64(), Some(0));
        assert_eq!(updated["fact"]["nutrition"]["energy"].as_f64(), Some(131.0));

        let child = service.add_child(Parameters(AddChildParams {
            name: "Ana".to_string(),
            allergies: Some("Amendoim".to_string()),
        }));
        assert!(child.is_ok());
        assert!(service.get_week_summary(Parameters(week())).is_err());
    }
}
