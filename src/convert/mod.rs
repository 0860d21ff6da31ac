// ABOUTME: Per-cell value conversion from MySQL representations to PostgreSQL-compatible ones
// ABOUTME: Explicit per-column rules take precedence over the boolean column-name heuristic

pub mod value;

pub use value::Value;

use crate::config::{BooleanHeuristic, MigrationPlan};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a specific column's values are converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionRule {
    /// Copy as-is. Used for ENUM columns whose labels are identical on both engines.
    Identity,
    /// Empty text becomes NULL, everything else is copied
    EmptyToNull,
    /// Declared boolean column: integer 0/1 becomes false/true
    Boolean,
}

impl ConversionRule {
    pub fn apply(self, value: Value) -> Value {
        match (self, value) {
            (ConversionRule::Identity, v) => v,
            (ConversionRule::EmptyToNull, Value::Text(s)) if s.is_empty() => Value::Null,
            (ConversionRule::EmptyToNull, v) => v,
            (ConversionRule::Boolean, Value::Int(i)) if i == 0 || i == 1 => Value::Bool(i == 1),
            (ConversionRule::Boolean, v) => v,
        }
    }
}

/// Maps a source value to a destination-compatible value, given its column and table.
///
/// Conversion order:
/// 1. NULL passes through unchanged
/// 2. An explicit [`ConversionRule`] for (table, column) is applied and returned
/// 3. Integer 0/1 in a column whose lower-cased name contains one of the heuristic
///    patterns (`is_`, `include_` by default) becomes a boolean
/// 4. Anything else is returned unchanged
///
/// The heuristic matches substrings anywhere in the column name, so `has_is_flag`
/// matches `is_` too. Declare boolean columns explicitly and disable the heuristic
/// when a schema does not follow the naming convention.
#[derive(Debug, Clone, Default)]
pub struct ValueConverter {
    rules: HashMap<String, HashMap<String, ConversionRule>>,
    heuristic: BooleanHeuristic,
}

impl ValueConverter {
    pub fn new(heuristic: BooleanHeuristic) -> Self {
        Self {
            rules: HashMap::new(),
            heuristic: BooleanHeuristic {
                enabled: heuristic.enabled,
                patterns: heuristic
                    .patterns
                    .into_iter()
                    .map(|p| p.to_lowercase())
                    .collect(),
            },
        }
    }

    /// Build a converter carrying every column rule declared in the plan
    pub fn from_plan(plan: &MigrationPlan) -> Self {
        let mut converter = Self::new(plan.boolean_heuristic.clone());
        for table in &plan.tables {
            for (column, rule) in &table.rules {
                converter = converter.with_rule(&table.name, column, *rule);
            }
        }
        converter
    }

    pub fn with_rule(mut self, table: &str, column: &str, rule: ConversionRule) -> Self {
        self.rules
            .entry(table.to_string())
            .or_default()
            .insert(column.to_string(), rule);
        self
    }

    pub fn rule_for(&self, table: &str, column: &str) -> Option<ConversionRule> {
        self.rules.get(table)?.get(column).copied()
    }

    pub fn convert(&self, value: Value, column: &str, table: &str) -> Value {
        if value.is_null() {
            return value;
        }

        if let Some(rule) = self.rule_for(table, column) {
            return rule.apply(value);
        }

        match value {
            Value::Int(i) if (i == 0 || i == 1) && self.looks_boolean(column) => {
                Value::Bool(i == 1)
            }
            other => other,
        }
    }

    fn looks_boolean(&self, column: &str) -> bool {
        if !self.heuristic.enabled {
            return false;
        }
        let column = column.to_lowercase();
        self.heuristic
            .patterns
            .iter()
            .any(|pattern| column.contains(pattern.as_str()))
    }
}
