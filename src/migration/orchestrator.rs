// ABOUTME: Drives the table migrator across the ordered table list and folds in verification
// ABOUTME: Sequential, fail-fast on the first table error, always closes both connections

use super::backend::{DestinationDatabase, SourceDatabase};
use super::table::{TableMigrator, TableOutcome};
use super::verify::{verify_tables, VerificationSummary};
use crate::config::MigrationPlan;
use crate::convert::ValueConverter;
use crate::error::Result;
use indicatif::ProgressBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    Success,
    /// Every table copied but at least one row count differs
    CompletedWithWarnings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub tables: Vec<TableOutcome>,
    pub verification: VerificationSummary,
    pub status: MigrationStatus,
}

impl MigrationReport {
    pub fn rows_inserted(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_inserted).sum()
    }
}

/// Owns the source and destination connections for one run.
pub struct Orchestrator<S, D> {
    source: S,
    destination: D,
    converter: ValueConverter,
    progress: Option<ProgressBar>,
}

impl<S, D> Orchestrator<S, D>
where
    S: SourceDatabase,
    D: DestinationDatabase,
{
    pub fn new(source: S, destination: D, converter: ValueConverter) -> Self {
        Self {
            source,
            destination,
            converter,
            progress: None,
        }
    }

    /// Advance `progress` once per finished table
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Migrate every table of `plan` in order, then verify row counts.
    ///
    /// The first failing table aborts the run; later tables are not attempted and
    /// verification is skipped. Both connections are closed whatever the outcome.
    pub async fn run(self, plan: &MigrationPlan) -> Result<MigrationReport> {
        let result = self.migrate_and_verify(plan).await;

        if let Some(progress) = &self.progress {
            match &result {
                Ok(_) => progress.finish_with_message("Migration complete"),
                Err(_) => progress.abandon_with_message("Migration aborted"),
            }
        }

        self.source.close().await;
        self.destination.close().await;
        tracing::debug!("Closed source and destination connections");

        result
    }

    async fn migrate_and_verify(&self, plan: &MigrationPlan) -> Result<MigrationReport> {
        let migrator = TableMigrator::new(&self.source, &self.destination, &self.converter);
        let mut tables = Vec::with_capacity(plan.tables.len());

        for (idx, spec) in plan.tables.iter().enumerate() {
            tracing::debug!("Table {}/{}: {}", idx + 1, plan.tables.len(), spec.name);
            if let Some(progress) = &self.progress {
                progress.set_message(format!("Migrating {}", spec.name));
            }

            let outcome = migrator.migrate(spec).await?;
            tables.push(outcome);

            if let Some(progress) = &self.progress {
                progress.inc(1);
            }
        }

        let verification =
            verify_tables(&self.source, &self.destination, &plan.table_names()).await?;

        let status = if verification.all_match() {
            MigrationStatus::Success
        } else {
            MigrationStatus::CompletedWithWarnings
        };

        Ok(MigrationReport {
            tables,
            verification,
            status,
        })
    }
}
