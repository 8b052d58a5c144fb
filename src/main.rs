//! Daycare Menu Planner
//!
//! An MCP server for planning weekly daycare menus.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use menuplan::build_info;
use menuplan::config::{Config, DEFAULT_LOG_DIRECTIVE};
use menuplan::db::{self, Database};
use menuplan::mcp::MenuplanService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr, stdout carries the MCP stream
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(DEFAULT_LOG_DIRECTIVE.parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let config = Config::from_env();
    eprintln!("Database path: {}", config.database_path.display());
    eprintln!("Reports directory: {}", config.reports_dir.display());
    config.ensure_dirs()?;

    eprintln!("Initializing database...");
    let database = Database::new(&config.database_path)?;

    database.with_conn(|conn| {
        if db::needs_migration(conn)? {
            eprintln!("Applying database migrations...");
        }
        db::run_migrations(conn)?;
        let version = db::get_schema_version(conn)?;
        eprintln!("Database schema version: {}", version);
        Ok(())
    })?;

    let service = MenuplanService::new(&config, database);

    let server = service.serve((stdin(), stdout())).await?;
    tracing::info!("menuplan server ready");

    server.waiting().await?;

    Ok(())
}
