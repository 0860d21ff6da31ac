// ABOUTME: Migrate command - copy every planned table from MySQL to PostgreSQL
// ABOUTME: Validates settings, opens one connection per side, runs the orchestrator, logs the summary

use crate::config::{DestinationConfig, MigrationPlan, SourceConfig};
use crate::convert::ValueConverter;
use crate::migration::{MigrationReport, MigrationStatus, Orchestrator};
use crate::mysql::{self, MysqlSource};
use crate::postgres::PgDestination;
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};

/// Copy all tables of `plan` from the MySQL source to the PostgreSQL destination
///
/// Steps:
/// 1. Validates the plan and destination settings (no connection is attempted if
///    either is invalid)
/// 2. Prompts for confirmation (unless skip_confirmation is true)
/// 3. Opens one source and one destination connection
/// 4. Migrates each table in plan order, stopping at the first failure
/// 5. Verifies row counts for every table
///
/// Re-running is safe: rows that already exist at the destination are skipped.
///
/// # Errors
///
/// Returns an error if configuration is missing, either database is unreachable,
/// or any table fails to migrate. Row-count mismatches are not errors; they
/// produce a report with [`MigrationStatus::CompletedWithWarnings`].
///
/// # Examples
///
/// ```no_run
/// # use anyhow::Result;
/// # use mysql_pg_table_migrator::commands::migrate;
/// # use mysql_pg_table_migrator::config::{DestinationConfig, MigrationPlan, SourceConfig};
/// # async fn example() -> Result<()> {
/// let report = migrate(
///     &SourceConfig::default(),
///     &DestinationConfig::from_env()?,
///     &MigrationPlan::default(),
///     true,
/// )
/// .await?;
/// println!("Inserted {} rows", report.rows_inserted());
/// # Ok(())
/// # }
/// ```
pub async fn migrate(
    source_config: &SourceConfig,
    destination_config: &DestinationConfig,
    plan: &MigrationPlan,
    skip_confirmation: bool,
) -> Result<MigrationReport> {
    tracing::info!("============================================================");
    tracing::info!("MySQL to PostgreSQL Migration");
    tracing::info!("============================================================");

    plan.validate().context("Invalid migration plan")?;
    destination_config
        .validate()
        .context("Missing destination configuration")?;

    if !skip_confirmation && !confirm_migration(source_config, destination_config, plan)? {
        bail!("Migration cancelled by user");
    }

    let (source, destination) = open_connections(source_config, destination_config, plan).await?;

    let progress = ProgressBar::new(plan.tables.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("##-"),
    );

    let converter = ValueConverter::from_plan(plan);
    let report = Orchestrator::new(source, destination, converter)
        .with_progress(progress)
        .run(plan)
        .await
        .context("Migration failed")?;

    log_summary(&report);

    Ok(report)
}

/// Open the source, then the destination; close the source if the destination fails
pub(crate) async fn open_connections(
    source_config: &SourceConfig,
    destination_config: &DestinationConfig,
    plan: &MigrationPlan,
) -> Result<(MysqlSource, PgDestination)> {
    use crate::migration::SourceDatabase;

    let source = mysql::connect_mysql(source_config)
        .await
        .context("Failed to connect to source database")?;

    match PgDestination::connect(destination_config, plan.batch_size).await {
        Ok(destination) => Ok((source, destination)),
        Err(e) => {
            source.close().await;
            Err(e).context("Failed to connect to destination database")
        }
    }
}

fn log_summary(report: &MigrationReport) {
    tracing::info!("");
    tracing::info!("🔍 Verification");
    report.verification.log();
    tracing::info!("");
    tracing::info!(
        "Tables: {}, rows inserted: {}",
        report.tables.len(),
        report.rows_inserted()
    );

    match report.status {
        MigrationStatus::Success => {
            tracing::info!("✅ Migration completed successfully!");
        }
        MigrationStatus::CompletedWithWarnings => {
            tracing::warn!("⚠ Migration completed with warnings - row counts don't match");
            for mismatch in report.verification.mismatches() {
                tracing::warn!(
                    "  {}: source={}, destination={}",
                    mismatch.table,
                    mismatch.source_count,
                    mismatch.destination_count
                );
            }
        }
    }
}

fn confirm_migration(
    source: &SourceConfig,
    destination: &DestinationConfig,
    plan: &MigrationPlan,
) -> Result<bool> {
    println!();
    println!(
        "Source:      mysql://{}@{}:{}/{}",
        source.user, source.host, source.port, source.database
    );
    println!(
        "Destination: postgresql://{}@{}:{}/{}",
        destination.user,
        destination.host.as_deref().unwrap_or_default(),
        destination.port,
        destination.database
    );
    println!("{}", "─".repeat(50));
    for (idx, table) in plan.tables.iter().enumerate() {
        println!("{:>3}. {}", idx + 1, table.name);
    }
    println!("{}", "─".repeat(50));
    println!();

    print!("Copy {} tables? [y/N]: ", plan.tables.len());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read user input")?;

    Ok(input.trim().to_lowercase() == "y")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrate_without_destination_settings_fails_before_connecting() {
        // Source points at a port nothing listens on; the config check must fire first
        let source = SourceConfig {
            port: 1,
            ..SourceConfig::default()
        };
        let result = migrate(
            &source,
            &DestinationConfig::default(),
            &MigrationPlan::default(),
            true,
        )
        .await;

        let err = result.unwrap_err();
        let root = err.root_cause().to_string();
        assert!(root.contains("SUPABASE_DB_HOST"), "unexpected error: {}", root);
    }

    #[tokio::test]
    async fn test_migrate_with_empty_plan_fails() {
        let plan = MigrationPlan {
            tables: vec![],
            ..MigrationPlan::default()
        };
        let result = migrate(&SourceConfig::default(), &DestinationConfig::default(), &plan, true).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore]
    async fn test_migrate_command() {
        // Requires the MySQL container and SUPABASE_DB_* settings
        let destination = DestinationConfig::from_env().unwrap();
        let result = migrate(
            &SourceConfig::default(),
            &destination,
            &MigrationPlan::default(),
            true,
        )
        .await;

        match &result {
            Ok(report) => println!("✓ Migrate completed: {:?}", report.status),
            Err(e) => println!("Migrate command result: {:?}", e),
        }
    }
}
