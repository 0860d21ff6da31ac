// ABOUTME: PostgreSQL destination module
// ABOUTME: Exports connection management, parameter binding and the destination writer

pub mod connection;
pub mod params;
pub mod writer;

pub use connection::connect;
pub use writer::{build_insert_sql, PgDestination};
