// ABOUTME: Error taxonomy for the table migration engine
// ABOUTME: Distinguishes config, connection, schema, query and per-table migration failures

use thiserror::Error;

/// Errors raised by the migration engine.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Required configuration is missing or invalid. Raised before any connection attempt.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A database could not be reached or refused the session
    #[error("Failed to connect to {side} database: {message}")]
    Connection { side: &'static str, message: String },

    /// A table does not exist on the source or cannot be introspected
    #[error("Schema error for table '{table}': {message}")]
    Schema { table: String, message: String },

    /// A query failed, with a description of what was being attempted
    #[error("{context}: {message}")]
    Query { context: String, message: String },

    /// A source value could not be decoded into a migratable value
    #[error("Cannot convert column '{column}' of table '{table}': {message}")]
    Conversion {
        table: String,
        column: String,
        message: String,
    },

    /// A table's copy failed and its transaction was rolled back
    #[error("Migration of table '{table}' failed: {source}")]
    Migration {
        table: String,
        #[source]
        source: Box<MigrateError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

impl MigrateError {
    pub fn config(message: impl Into<String>) -> Self {
        MigrateError::Config(message.into())
    }

    pub fn connection(side: &'static str, message: impl Into<String>) -> Self {
        MigrateError::Connection {
            side,
            message: message.into(),
        }
    }

    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Schema {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a Query error with context about where it occurred
    pub fn query(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Query {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Wrap a table-local failure so the orchestrator knows which table aborted the run
    pub fn migration(table: impl Into<String>, source: MigrateError) -> Self {
        MigrateError::Migration {
            table: table.into(),
            source: Box::new(source),
        }
    }

    /// Table whose migration failed, if this is a per-table failure
    pub fn failed_table(&self) -> Option<&str> {
        match self {
            MigrateError::Migration { table, .. } => Some(table),
            _ => None,
        }
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
