// ABOUTME: Copies one table end-to-end: introspect, fetch, convert, idempotent insert, resync
// ABOUTME: All destination work for a table runs in one transaction that rolls back on failure

use super::backend::{DestinationDatabase, SourceColumn, SourceDatabase};
use crate::config::TableSpec;
use crate::convert::{Value, ValueConverter};
use crate::error::{MigrateError, Result};

/// What happened to one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOutcome {
    pub table: String,
    /// Rows read from the source
    pub rows_found: usize,
    /// Rows newly written to the destination; duplicates are skipped
    pub rows_inserted: u64,
    /// Key value the destination generator was moved to, if it was resynced
    pub sequence_value: Option<i64>,
}

impl TableOutcome {
    pub fn no_data(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows_found: 0,
            rows_inserted: 0,
            sequence_value: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows_found == 0
    }

    /// Rows that already existed at the destination
    pub fn rows_skipped(&self) -> u64 {
        (self.rows_found as u64).saturating_sub(self.rows_inserted)
    }
}

/// Rows ready for insertion, with the column list they line up with
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedTable {
    /// Destination column list: source order minus the primary key
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Whether the source table carried the primary key column
    pub has_primary_key: bool,
}

/// Strip the primary key from a source row and convert every remaining value.
///
/// `row` must line up with `columns`.
pub fn convert_row(
    converter: &ValueConverter,
    spec: &TableSpec,
    columns: &[SourceColumn],
    row: Vec<Value>,
) -> Result<Vec<Value>> {
    if row.len() != columns.len() {
        return Err(MigrateError::schema(
            &spec.name,
            format!(
                "row has {} values but the table has {} columns",
                row.len(),
                columns.len()
            ),
        ));
    }

    Ok(columns
        .iter()
        .zip(row)
        .filter(|(column, _)| column.name != spec.primary_key)
        .map(|(column, value)| converter.convert(value, &column.name, &spec.name))
        .collect())
}

pub struct TableMigrator<'a, S, D> {
    source: &'a S,
    destination: &'a D,
    converter: &'a ValueConverter,
}

impl<'a, S, D> TableMigrator<'a, S, D>
where
    S: SourceDatabase,
    D: DestinationDatabase,
{
    pub fn new(source: &'a S, destination: &'a D, converter: &'a ValueConverter) -> Self {
        Self {
            source,
            destination,
            converter,
        }
    }

    /// Copy every row of `spec.name` from source to destination.
    ///
    /// A table with no rows succeeds without touching the destination. Rows that
    /// already exist at the destination are skipped, so re-running is safe. Any
    /// failure rolls back this table's transaction and is returned as
    /// [`MigrateError::Migration`].
    pub async fn migrate(&self, spec: &TableSpec) -> Result<TableOutcome> {
        tracing::info!("Migrating table: {}", spec.name);

        let converted = self
            .read_and_convert(spec)
            .await
            .map_err(|e| MigrateError::migration(&spec.name, e))?;

        let Some(converted) = converted else {
            tracing::warn!("  ⚠ {}: no data to migrate", spec.name);
            return Ok(TableOutcome::no_data(&spec.name));
        };

        tracing::info!("  Found {} rows", converted.rows.len());

        self.destination
            .begin()
            .await
            .map_err(|e| MigrateError::migration(&spec.name, e))?;

        match self.write(spec, &converted).await {
            Ok(outcome) => {
                tracing::info!(
                    "  ✓ {}: {} rows processed, {} inserted, {} already present",
                    spec.name,
                    outcome.rows_found,
                    outcome.rows_inserted,
                    outcome.rows_skipped()
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!("  ✗ Error migrating {}: {}", spec.name, e);
                if let Err(rollback_err) = self.destination.rollback().await {
                    tracing::warn!(
                        "Rollback of table '{}' also failed: {}",
                        spec.name,
                        rollback_err
                    );
                }
                Err(MigrateError::migration(&spec.name, e))
            }
        }
    }

    /// Read the whole source table and build converted rows.
    ///
    /// Returns `None` when the table is empty.
    async fn read_and_convert(&self, spec: &TableSpec) -> Result<Option<ConvertedTable>> {
        let columns = self.source.table_columns(&spec.name).await?;
        if columns.is_empty() {
            return Err(MigrateError::schema(
                &spec.name,
                "table does not exist on the source or has no columns",
            ));
        }

        let has_primary_key = columns.iter().any(|c| c.name == spec.primary_key);
        if !has_primary_key {
            tracing::warn!(
                "Table '{}' has no '{}' column; copying all columns without key resync",
                spec.name,
                spec.primary_key
            );
        }

        let insert_columns: Vec<String> = columns
            .iter()
            .filter(|c| c.name != spec.primary_key)
            .map(|c| c.name.clone())
            .collect();
        if insert_columns.is_empty() {
            return Err(MigrateError::schema(
                &spec.name,
                format!("table has no columns besides '{}'", spec.primary_key),
            ));
        }

        let rows = self.source.fetch_rows(&spec.name, &columns).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let rows = rows
            .into_iter()
            .map(|row| convert_row(self.converter, spec, &columns, row))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(ConvertedTable {
            columns: insert_columns,
            rows,
            has_primary_key,
        }))
    }

    async fn write(&self, spec: &TableSpec, converted: &ConvertedTable) -> Result<TableOutcome> {
        let rows_inserted = self
            .destination
            .insert_rows(&spec.name, &converted.columns, &converted.rows)
            .await?;

        let sequence_value = if converted.has_primary_key {
            let value = self
                .destination
                .resync_sequence(&spec.name, &spec.primary_key)
                .await?;
            if let Some(max) = value {
                tracing::debug!("  Reset {}.{} sequence to {}", spec.name, spec.primary_key, max);
            }
            value
        } else {
            None
        };

        self.destination.commit().await?;

        Ok(TableOutcome {
            table: spec.name.clone(),
            rows_found: converted.rows.len(),
            rows_inserted,
            sequence_value,
        })
    }
}
