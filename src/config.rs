// ABOUTME: Connection settings for both engines and the table migration plan
// ABOUTME: Loads plans from TOML and validates destination settings before any connection

use crate::convert::ConversionRule;
use crate::error::{MigrateError, Result};
use crate::utils::validate_table_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEST_HOST_ENV: &str = "SUPABASE_DB_HOST";
pub const DEST_PORT_ENV: &str = "SUPABASE_DB_PORT";
pub const DEST_USER_ENV: &str = "SUPABASE_DB_USER";
pub const DEST_PASSWORD_ENV: &str = "SUPABASE_DB_PASSWORD";

/// Default PostgreSQL bind-parameter ceiling per statement
pub const MAX_BIND_PARAMS: usize = 65_535;

/// MySQL source settings. Defaults point at the local Docker container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3307,
            user: "root".to_string(),
            password: "root_password".to_string(),
            database: "staff_rota".to_string(),
        }
    }
}

/// PostgreSQL destination settings.
///
/// `host` and `password` have no defaults and must be supplied, usually through
/// `SUPABASE_DB_HOST` and `SUPABASE_DB_PASSWORD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationConfig {
    pub host: Option<String>,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    pub require_tls: bool,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 6543,
            user: "postgres".to_string(),
            password: None,
            database: "postgres".to_string(),
            require_tls: true,
        }
    }
}

impl DestinationConfig {
    /// Read destination settings from the `SUPABASE_DB_*` environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let port = match std::env::var(DEST_PORT_ENV) {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|_| {
                MigrateError::config(format!("{} must be a port number, got '{}'", DEST_PORT_ENV, raw))
            })?,
            Err(_) => defaults.port,
        };

        Ok(Self {
            host: non_empty_env(DEST_HOST_ENV),
            port,
            user: non_empty_env(DEST_USER_ENV).unwrap_or(defaults.user),
            password: non_empty_env(DEST_PASSWORD_ENV),
            database: defaults.database,
            require_tls: defaults.require_tls,
        })
    }

    /// Fail fast when required parameters are absent
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.host.as_deref().map_or(true, |h| h.trim().is_empty()) {
            missing.push(DEST_HOST_ENV);
        }
        if self.password.as_deref().map_or(true, str::is_empty) {
            missing.push(DEST_PASSWORD_ENV);
        }

        if !missing.is_empty() {
            return Err(MigrateError::config(format!(
                "Missing destination database settings: {}\n\
                 Please set the following environment variables:\n\
                 {}",
                missing.join(", "),
                missing
                    .iter()
                    .map(|var| format!("  {}=...", var))
                    .collect::<Vec<_>>()
                    .join("\n")
            )));
        }

        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Column-name heuristic for MySQL TINYINT(1) columns that should become booleans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BooleanHeuristic {
    pub enabled: bool,
    pub patterns: Vec<String>,
}

impl Default for BooleanHeuristic {
    fn default() -> Self {
        Self {
            enabled: true,
            patterns: vec!["is_".to_string(), "include_".to_string()],
        }
    }
}

/// One table in the migration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default)]
    pub rules: BTreeMap<String, ConversionRule>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: default_primary_key(),
            rules: BTreeMap::new(),
        }
    }

    pub fn with_rule(mut self, column: &str, rule: ConversionRule) -> Self {
        self.rules.insert(column.to_string(), rule);
        self
    }
}

/// Ordered list of tables to copy plus conversion settings.
///
/// Table order must place every table after the tables it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationPlan {
    pub tables: Vec<TableSpec>,
    pub boolean_heuristic: BooleanHeuristic,
    pub batch_size: usize,
}

impl Default for MigrationPlan {
    /// Staff rota schema, in foreign-key dependency order
    fn default() -> Self {
        use ConversionRule::{EmptyToNull, Identity};

        let tables = vec![
            TableSpec::new("config"),
            TableSpec::new("buildings"),
            TableSpec::new("departments"),
            TableSpec::new("services"),
            TableSpec::new("shifts").with_rule("type", Identity),
            TableSpec::new("staff").with_rule("status", Identity),
            TableSpec::new("staff_allocations").with_rule("area_type", Identity),
            TableSpec::new("fixed_schedules"),
            TableSpec::new("manual_assignments")
                .with_rule("shift_type", Identity)
                .with_rule("area_type", EmptyToNull),
            TableSpec::new("staff_absences").with_rule("absence_type", Identity),
            TableSpec::new("staff_contracted_hours"),
            TableSpec::new("area_operational_hours").with_rule("area_type", Identity),
        ];

        Self {
            tables,
            boolean_heuristic: BooleanHeuristic::default(),
            batch_size: 1000,
        }
    }
}

impl MigrationPlan {
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Restrict the plan to `names`, in the given order.
    ///
    /// Names already in the plan keep their primary key and rules; unknown names
    /// get a default spec.
    pub fn with_table_order(mut self, names: &[String]) -> Self {
        let mut known: Vec<TableSpec> = std::mem::take(&mut self.tables);
        self.tables = names
            .iter()
            .map(|name| match known.iter().position(|t| &t.name == name) {
                Some(idx) => known.remove(idx),
                None => TableSpec::new(name.clone()),
            })
            .collect();
        self
    }

    /// Check identifiers, duplicates and batch size
    pub fn validate(&self) -> Result<()> {
        if self.tables.is_empty() {
            return Err(MigrateError::config("Migration plan contains no tables"));
        }
        if self.batch_size == 0 {
            return Err(MigrateError::config("batch_size must be greater than zero"));
        }

        let mut seen = std::collections::HashSet::new();
        for table in &self.tables {
            validate_table_name(&table.name)?;
            validate_table_name(&table.primary_key)?;
            for column in table.rules.keys() {
                validate_table_name(column)?;
            }
            if !seen.insert(table.name.as_str()) {
                return Err(MigrateError::config(format!(
                    "Table '{}' appears more than once in the migration order",
                    table.name
                )));
            }
        }

        Ok(())
    }
}

/// Parse a migration plan from TOML text
pub fn parse_plan(contents: &str) -> Result<MigrationPlan> {
    let plan: MigrationPlan = toml::from_str(contents)?;
    plan.validate()?;
    Ok(plan)
}

/// Load a migration plan from a TOML file
pub fn load_plan_from_file(path: impl AsRef<Path>) -> Result<MigrationPlan> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        MigrateError::config(format!(
            "Failed to read migration plan '{}': {}",
            path.display(),
            e
        ))
    })?;
    tracing::debug!("Loaded migration plan from {}", path.display());
    parse_plan(&contents)
}
