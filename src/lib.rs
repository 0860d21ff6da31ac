// ABOUTME: Library module for mysql-pg-table-migrator
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod commands;
pub mod config;
pub mod convert;
pub mod error;
pub mod migration;
pub mod mysql;
pub mod postgres;
pub mod utils;
