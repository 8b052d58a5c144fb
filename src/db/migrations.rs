//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("Applied schema migration v1");
    }

    Ok(())
}

/// Migration v1: fact table, weekly menus, children roster
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- NUTRIENT FACTS
        -- Canonical nutrient values per food
        -- ============================================
        CREATE TABLE nutrient_facts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL COLLATE NOCASE UNIQUE,
            basis TEXT NOT NULL CHECK(basis IN ('per_100g', 'per_100ml', 'per_unit')) DEFAULT 'per_100g',
            portion_grams REAL,                  -- grams in one household portion/unit

            energy REAL NOT NULL DEFAULT 0,      -- kcal
            protein REAL NOT NULL DEFAULT 0,     -- grams
            lipid REAL NOT NULL DEFAULT 0,       -- grams
            carbohydrate REAL NOT NULL DEFAULT 0, -- grams
            fiber REAL NOT NULL DEFAULT 0,       -- grams
            calcium REAL NOT NULL DEFAULT 0,     -- milligrams
            iron REAL NOT NULL DEFAULT 0,        -- milligrams
            sodium REAL NOT NULL DEFAULT 0,      -- milligrams
            vitamin_c REAL NOT NULL DEFAULT 0,   -- milligrams
            vitamin_a REAL NOT NULL DEFAULT 0,   -- micrograms

            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- WEEKLY MENUS
        -- One row per (week, weekday, menu type)
        -- ============================================
        CREATE TABLE weekly_menus (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            week_start TEXT NOT NULL,            -- ISO date of the Monday
            day_of_week INTEGER NOT NULL CHECK(day_of_week BETWEEN 1 AND 5),
            menu_type TEXT NOT NULL CHECK(menu_type IN ('infant_0_6', 'infant_6_24', 'toddler')),

            breakfast TEXT,
            breakfast_time TEXT,
            morning_snack TEXT,
            morning_snack_time TEXT,
            lunch TEXT,
            lunch_time TEXT,
            bottle TEXT,
            bottle_time TEXT,
            snack TEXT,
            snack_time TEXT,
            pre_dinner TEXT,
            pre_dinner_time TEXT,
            dinner TEXT,
            dinner_time TEXT,

            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),

            UNIQUE(week_start, day_of_week, menu_type)
        );

        CREATE INDEX idx_weekly_menus_week ON weekly_menus(week_start, menu_type);

        -- ============================================
        -- CHILDREN
        -- Roster with declared allergies
        -- ============================================
        CREATE TABLE children (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            allergies TEXT,                      -- free text, keyword matched
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_children_active ON children(active);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version, 0 for a fresh database
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let has_table: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations')",
        [],
        |row| row.get(0),
    )?;
    if !has_table {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 0);
        assert!(needs_migration(&conn).unwrap());
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!needs_migration(&conn).unwrap());
    }
}
