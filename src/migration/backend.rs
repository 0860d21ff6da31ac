// ABOUTME: Traits the migration engine uses to talk to the source and destination engines
// ABOUTME: MySQL and PostgreSQL adapters implement these; tests use in-memory fakes

use crate::convert::Value;
use crate::error::Result;
use async_trait::async_trait;

/// A column as introspected from the source, in ordinal order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceColumn {
    pub name: String,
    /// Lower-cased engine type name, e.g. `tinyint`, `varchar`, `datetime`
    pub data_type: String,
}

impl SourceColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Read side of a migration
#[async_trait]
pub trait SourceDatabase: Send + Sync {
    /// Column names and types of `table`, in ordinal order.
    ///
    /// An empty result means the table does not exist.
    async fn table_columns(&self, table: &str) -> Result<Vec<SourceColumn>>;

    /// Every row of `table` in a single scan, each row in `columns` order
    async fn fetch_rows(&self, table: &str, columns: &[SourceColumn]) -> Result<Vec<Vec<Value>>>;

    async fn count_rows(&self, table: &str) -> Result<i64>;

    async fn close(self);
}

/// Write side of a migration
#[async_trait]
pub trait DestinationDatabase: Send + Sync {
    async fn begin(&self) -> Result<()>;

    /// Insert rows, silently skipping any that violate a uniqueness constraint.
    ///
    /// Returns the number of rows actually inserted.
    async fn insert_rows(&self, table: &str, columns: &[String], rows: &[Vec<Value>])
        -> Result<u64>;

    /// Move the key generator of `table.primary_key` to the current maximum key.
    ///
    /// Returns the maximum key, or `None` when the table is empty or the key has
    /// no generator.
    async fn resync_sequence(&self, table: &str, primary_key: &str) -> Result<Option<i64>>;

    async fn commit(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;

    async fn count_rows(&self, table: &str) -> Result<i64>;

    async fn close(self);
}
