//! Menuplan Tools module
//!
//! MCP tool implementations for the daycare menu planner.

pub mod children;
pub mod facts;
pub mod menus;
pub mod reports;
pub mod status;
