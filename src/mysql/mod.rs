// ABOUTME: MySQL source adapter for the migration engine
// ABOUTME: Opens a single-connection pool and exposes column introspection, full scans and counts

pub mod reader;

use crate::config::SourceConfig;
use crate::convert::Value;
use crate::error::{MigrateError, Result};
use crate::migration::{SourceColumn, SourceDatabase};
use crate::utils::{quote_mysql_ident, validate_table_name};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::Row;
use std::time::Duration;

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only MySQL source holding exactly one connection for the run
pub struct MysqlSource {
    pool: MySqlPool,
    database: String,
}

/// Connect to the MySQL source database
///
/// # Examples
///
/// ```no_run
/// # use mysql_pg_table_migrator::{config::SourceConfig, mysql::connect_mysql};
/// # async fn example() -> mysql_pg_table_migrator::error::Result<()> {
/// let source = connect_mysql(&SourceConfig::default()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn connect_mysql(config: &SourceConfig) -> Result<MysqlSource> {
    tracing::info!(
        "Connecting to MySQL source: {}:{}/{}",
        config.host,
        config.port,
        config.database
    );

    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database)
        .username(&config.user)
        .password(&config.password)
        .ssl_mode(MySqlSslMode::Preferred);

    let pool = pool_options()
        .connect_with(options)
        .await
        .map_err(|e| describe_connect_error(&e.to_string()))?;

    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await
        .map_err(|e| describe_connect_error(&e.to_string()))?;

    tracing::info!("✓ Connected to MySQL: {}", config.database);

    Ok(MysqlSource {
        pool,
        database: config.database.clone(),
    })
}

/// One connection that is never recycled, so the whole run reads through the same session
fn pool_options() -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(POOL_CONNECTION_TIMEOUT)
        .max_lifetime(None)
        .idle_timeout(None)
}

/// Turn a driver connection error into an actionable message
fn describe_connect_error(error_msg: &str) -> MigrateError {
    let message = if error_msg.contains("Access denied") {
        format!(
            "Authentication failed: Invalid username or password.\n\
             Please verify the MySQL credentials.\n\
             Error: {}",
            error_msg
        )
    } else if error_msg.contains("Unknown database") {
        format!(
            "Database does not exist: {}\n\
             Please check the source database name.",
            error_msg
        )
    } else if error_msg.contains("Connection refused") || error_msg.contains("os error 111") {
        format!(
            "Connection refused: Unable to reach MySQL server.\n\
             Please check:\n\
             - The host and port are correct\n\
             - The MySQL container is running\n\
             Error: {}",
            error_msg
        )
    } else if error_msg.contains("timed out") || error_msg.contains("timeout") {
        format!(
            "Connection timeout: MySQL server did not respond in time.\n\
             Error: {}",
            error_msg
        )
    } else {
        error_msg.to_string()
    };

    MigrateError::connection("source", message)
}

#[async_trait]
impl SourceDatabase for MysqlSource {
    async fn table_columns(&self, table: &str) -> Result<Vec<SourceColumn>> {
        validate_table_name(table)?;

        // CAST to CHAR to handle collation differences in information_schema
        let query = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR(255)) AS column_name,
                CAST(DATA_TYPE AS CHAR(255)) AS data_type,
                CAST(COLUMN_TYPE AS CHAR(255)) AS column_type
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(&self.database)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::schema(table, e.to_string()))?;

        rows.iter()
            .map(|row| {
                let name: String = row
                    .try_get("column_name")
                    .map_err(|e| MigrateError::schema(table, e.to_string()))?;
                let data_type: String = row
                    .try_get("data_type")
                    .map_err(|e| MigrateError::schema(table, e.to_string()))?;
                let column_type: String = row
                    .try_get("column_type")
                    .map_err(|e| MigrateError::schema(table, e.to_string()))?;
                Ok(SourceColumn::new(
                    name,
                    reader::normalize_type(&data_type, &column_type),
                ))
            })
            .collect()
    }

    async fn fetch_rows(&self, table: &str, columns: &[SourceColumn]) -> Result<Vec<Vec<Value>>> {
        validate_table_name(table)?;

        let query = reader::select_all_sql(table, columns);
        let rows: Vec<MySqlRow> = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::query(e, format!("reading rows from '{}'", table)))?;

        tracing::debug!("Read {} rows from MySQL table '{}'", rows.len(), table);

        rows.iter()
            .map(|row| reader::row_to_values(row, columns, table))
            .collect()
    }

    async fn count_rows(&self, table: &str) -> Result<i64> {
        validate_table_name(table)?;

        let query = format!("SELECT COUNT(*) AS cnt FROM {}", quote_mysql_ident(table));
        let row: MySqlRow = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MigrateError::query(e, format!("counting rows in MySQL table '{}'", table)))?;

        row.try_get::<i64, _>("cnt")
            .map_err(|e| MigrateError::query(e, format!("reading row count of '{}'", table)))
    }

    async fn close(self) {
        self.pool.close().await;
    }
}
