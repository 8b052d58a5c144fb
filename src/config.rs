//! Runtime configuration
//!
//! Everything is read from the environment; there is no config file.

use std::path::PathBuf;

/// Environment variable holding the SQLite database path
pub const DATABASE_PATH_VAR: &str = "MENUPLAN_DATABASE_PATH";

/// Environment variable holding the directory PDF reports are written to
pub const REPORTS_DIR_VAR: &str = "MENUPLAN_REPORTS_DIR";

/// Default tracing directive when RUST_LOG is not set
pub const DEFAULT_LOG_DIRECTIVE: &str = "menuplan=info";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub reports_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let database_path = std::env::var(DATABASE_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir().join("menuplan.db"));

        let reports_dir = std::env::var(REPORTS_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                database_path
                    .parent()
                    .map(|p| p.join("reports"))
                    .unwrap_or_else(|| PathBuf::from("reports"))
            });

        Self {
            database_path,
            reports_dir,
        }
    }

    /// Create the database and report directories if missing
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        if let Some(parent) = self.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&self.reports_dir)
    }
}

/// `<project root>/data`, where the project root is found by walking up from
/// target/release or target/debug when running a cargo-built binary
fn default_data_dir() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }

    path.push("data");
    path
}
