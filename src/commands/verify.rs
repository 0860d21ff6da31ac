// ABOUTME: Verify command - standalone row-count health check
// ABOUTME: Compares per-table row counts between source and destination without writing anything

use super::migrate::open_connections;
use crate::config::{DestinationConfig, MigrationPlan, SourceConfig};
use crate::migration::{verify_tables, DestinationDatabase, SourceDatabase, VerificationSummary};
use anyhow::{Context, Result};

/// Compare row counts of every planned table between source and destination
///
/// Every table is checked even after a mismatch. Read-only.
///
/// # Errors
///
/// This function will return an error if:
/// - Destination settings are missing
/// - Cannot connect to source or destination database
/// - A count query fails (for example a table missing on one side)
/// - Any table's row counts differ
pub async fn verify(
    source_config: &SourceConfig,
    destination_config: &DestinationConfig,
    plan: &MigrationPlan,
) -> Result<VerificationSummary> {
    tracing::info!("Starting row-count verification...");

    plan.validate().context("Invalid migration plan")?;
    destination_config
        .validate()
        .context("Missing destination configuration")?;

    let (source, destination) = open_connections(source_config, destination_config, plan).await?;

    let result = verify_tables(&source, &destination, &plan.table_names()).await;

    source.close().await;
    destination.close().await;

    let summary = result.context("Failed to count table rows")?;

    tracing::info!("");
    tracing::info!("========================================");
    tracing::info!("Verification Summary");
    tracing::info!("========================================");
    summary.log();
    tracing::info!("========================================");

    let mismatches = summary.mismatches().count();
    if mismatches > 0 {
        tracing::error!("⚠ {} table(s) have mismatched row counts", mismatches);
        anyhow::bail!("{} table(s) failed verification", mismatches);
    }

    tracing::info!(
        "✓ All {} tables match between source and destination",
        summary.results.len()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_requires_destination_settings() {
        let result = verify(
            &SourceConfig::default(),
            &DestinationConfig::default(),
            &MigrationPlan::default(),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore]
    async fn test_verify_command() {
        // This test requires both source and destination databases
        let destination = DestinationConfig::from_env().unwrap();
        let result = verify(&SourceConfig::default(), &destination, &MigrationPlan::default()).await;

        match &result {
            Ok(summary) => println!("✓ Verified {} tables", summary.results.len()),
            Err(e) => println!("Verify command result: {:?}", e),
        }
    }
}
