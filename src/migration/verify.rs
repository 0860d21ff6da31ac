// ABOUTME: Row-count reconciliation between source and destination tables
// ABOUTME: Read-only and exhaustive: every table is counted even after a mismatch

use super::backend::{DestinationDatabase, SourceDatabase};
use crate::error::Result;

/// Row counts of one table on both sides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub table: String,
    pub source_count: i64,
    pub destination_count: i64,
}

impl VerificationResult {
    pub fn matches(&self) -> bool {
        self.source_count == self.destination_count
    }
}

/// Per-table verification breakdown
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerificationSummary {
    pub results: Vec<VerificationResult>,
}

impl VerificationSummary {
    /// True only when every table's counts agree
    pub fn all_match(&self) -> bool {
        self.results.iter().all(VerificationResult::matches)
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &VerificationResult> {
        self.results.iter().filter(|r| !r.matches())
    }

    /// Log one line per table plus the overall verdict
    pub fn log(&self) {
        for result in &self.results {
            let mark = if result.matches() { "✓" } else { "✗" };
            tracing::info!(
                "  {} {}: MySQL={}, PostgreSQL={}",
                mark,
                result.table,
                result.source_count,
                result.destination_count
            );
        }
    }
}

/// Compare row counts of `tables` between source and destination
pub async fn verify_tables<S, D>(
    source: &S,
    destination: &D,
    tables: &[&str],
) -> Result<VerificationSummary>
where
    S: SourceDatabase,
    D: DestinationDatabase,
{
    tracing::info!("Verifying row counts for {} tables...", tables.len());

    let mut results = Vec::with_capacity(tables.len());
    for table in tables {
        let source_count = source.count_rows(table).await?;
        let destination_count = destination.count_rows(table).await?;

        tracing::debug!(
            "Counted {}: source={}, destination={}",
            table,
            source_count,
            destination_count
        );

        results.push(VerificationResult {
            table: table.to_string(),
            source_count,
            destination_count,
        });
    }

    Ok(VerificationSummary { results })
}
