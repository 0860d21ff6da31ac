// ABOUTME: PostgreSQL destination adapter: idempotent batched inserts, sequence resync, counts
// ABOUTME: Transactions are driven with explicit BEGIN/COMMIT/ROLLBACK on the single client

use super::connection;
use crate::config::{DestinationConfig, MAX_BIND_PARAMS};
use crate::convert::Value;
use crate::error::{MigrateError, Result};
use crate::migration::DestinationDatabase;
use crate::utils::{fold_pg_ident, quote_pg_ident, validate_table_name};
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::Client;

/// Build `INSERT ... VALUES (...), (...) ON CONFLICT DO NOTHING` for `row_count` rows
pub fn build_insert_sql(table: &str, columns: &[String], row_count: usize) -> String {
    let col_list = columns
        .iter()
        .map(|c| quote_pg_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let width = columns.len();
    let value_rows: Vec<String> = (0..row_count)
        .map(|row| {
            let placeholders: Vec<String> = (1..=width)
                .map(|col| format!("${}", row * width + col))
                .collect();
            format!("({})", placeholders.join(", "))
        })
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES {} ON CONFLICT DO NOTHING",
        quote_pg_ident(table),
        col_list,
        value_rows.join(", ")
    )
}

/// Rows per INSERT so a statement stays under the bind-parameter limit
pub fn rows_per_statement(column_count: usize, batch_size: usize) -> usize {
    let by_params = MAX_BIND_PARAMS / column_count.max(1);
    batch_size.min(by_params).max(1)
}

/// Single-connection PostgreSQL destination
pub struct PgDestination {
    client: Client,
    connection: JoinHandle<()>,
    batch_size: usize,
}

impl PgDestination {
    pub async fn connect(config: &DestinationConfig, batch_size: usize) -> Result<Self> {
        let (client, connection) = connection::connect(config).await?;
        Ok(Self {
            client,
            connection,
            batch_size,
        })
    }

    async fn execute_batch(&self, sql: &str, context: &str) -> Result<()> {
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| MigrateError::query(e, context))
    }
}

#[async_trait]
impl DestinationDatabase for PgDestination {
    async fn begin(&self) -> Result<()> {
        self.execute_batch("BEGIN", "starting destination transaction")
            .await
    }

    async fn insert_rows(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> Result<u64> {
        validate_table_name(table)?;
        if rows.is_empty() {
            return Ok(0);
        }

        let chunk_size = rows_per_statement(columns.len(), self.batch_size);
        let mut inserted = 0u64;

        for (chunk_idx, chunk) in rows.chunks(chunk_size).enumerate() {
            let sql = build_insert_sql(table, columns, chunk.len());
            let statement = self
                .client
                .prepare(&sql)
                .await
                .map_err(|e| MigrateError::query(e, format!("preparing insert into '{}'", table)))?;

            let params: Vec<&(dyn ToSql + Sync)> = chunk
                .iter()
                .flat_map(|row| row.iter().map(|v| v as &(dyn ToSql + Sync)))
                .collect();

            let affected = self
                .client
                .execute(&statement, &params)
                .await
                .map_err(|e| {
                    MigrateError::query(
                        e,
                        format!("inserting batch {} into '{}'", chunk_idx + 1, table),
                    )
                })?;

            tracing::debug!(
                "Inserted {}/{} rows of batch {} into '{}'",
                affected,
                chunk.len(),
                chunk_idx + 1,
                table
            );
            inserted += affected;
        }

        Ok(inserted)
    }

    async fn resync_sequence(&self, table: &str, primary_key: &str) -> Result<Option<i64>> {
        validate_table_name(table)?;
        validate_table_name(primary_key)?;

        let max_sql = format!(
            "SELECT MAX({})::bigint FROM {}",
            quote_pg_ident(primary_key),
            quote_pg_ident(table)
        );
        let row = self
            .client
            .query_one(&max_sql, &[])
            .await
            .map_err(|e| MigrateError::query(e, format!("reading max key of '{}'", table)))?;
        let Some(max_key) = row.get::<_, Option<i64>>(0) else {
            return Ok(None);
        };

        let seq_row = self
            .client
            .query_one(
                "SELECT pg_get_serial_sequence($1, $2)",
                &[&quote_pg_ident(table), &fold_pg_ident(primary_key)],
            )
            .await
            .map_err(|e| MigrateError::query(e, format!("looking up key sequence of '{}'", table)))?;
        let Some(sequence) = seq_row.get::<_, Option<String>>(0) else {
            tracing::warn!(
                "Column {}.{} has no sequence; skipping resync",
                table,
                primary_key
            );
            return Ok(None);
        };

        self.client
            .query_one("SELECT setval($1::text::regclass, $2, true)", &[&sequence, &max_key])
            .await
            .map_err(|e| MigrateError::query(e, format!("resetting sequence {}", sequence)))?;

        Ok(Some(max_key))
    }

    async fn commit(&self) -> Result<()> {
        self.execute_batch("COMMIT", "committing destination transaction")
            .await
    }

    async fn rollback(&self) -> Result<()> {
        self.execute_batch("ROLLBACK", "rolling back destination transaction")
            .await
    }

    async fn count_rows(&self, table: &str) -> Result<i64> {
        validate_table_name(table)?;

        let sql = format!("SELECT COUNT(*) FROM {}", quote_pg_ident(table));
        let row = self
            .client
            .query_one(&sql, &[])
            .await
            .map_err(|e| MigrateError::query(e, format!("counting rows in PostgreSQL table '{}'", table)))?;
        Ok(row.get::<_, i64>(0))
    }

    async fn close(self) {
        drop(self.client);
        if let Err(e) = self.connection.await {
            tracing::warn!("PostgreSQL connection task ended abnormally: {}", e);
        }
    }
}
