//! Daycare Menu Planner Library
//!
//! Weekly daycare menus with nutrition derived from free meal text,
//! allergy cross-checks and printable reports.

pub mod build_info;
pub mod config;
pub mod db;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod session;
pub mod tools;
