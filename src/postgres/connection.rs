// ABOUTME: PostgreSQL connection utilities for the migration destination
// ABOUTME: Builds the connection config, sets up TLS, and maps driver errors to clear messages

use crate::config::DestinationConfig;
use crate::error::{MigrateError, Result};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio::task::JoinHandle;
use tokio_postgres::config::SslMode;
use tokio_postgres::Client;

/// Build a driver config from validated destination settings
pub fn pg_config(config: &DestinationConfig) -> Result<tokio_postgres::Config> {
    config.validate()?;

    let mut pg = tokio_postgres::Config::new();
    pg.host(config.host.as_deref().unwrap_or_default())
        .port(config.port)
        .user(&config.user)
        .password(config.password.as_deref().unwrap_or_default())
        .dbname(&config.database)
        .application_name("mysql-pg-table-migrator")
        .ssl_mode(if config.require_tls {
            SslMode::Require
        } else {
            SslMode::Prefer
        });

    Ok(pg)
}

/// Connect to PostgreSQL database with TLS support
///
/// Returns the client and the handle of the spawned connection task.
pub async fn connect(config: &DestinationConfig) -> Result<(Client, JoinHandle<()>)> {
    let pg = pg_config(config)?;

    // Set up TLS connector for cloud connections
    let tls_connector = TlsConnector::builder()
        .danger_accept_invalid_certs(false)
        .build()
        .map_err(|e| {
            MigrateError::connection("destination", format!("Failed to build TLS connector: {}", e))
        })?;
    let tls = MakeTlsConnector::new(tls_connector);

    tracing::info!(
        "Connecting to PostgreSQL destination: {}:{}/{}",
        config.host.as_deref().unwrap_or_default(),
        config.port,
        config.database
    );

    let (client, connection) = pg
        .connect(tls)
        .await
        .map_err(|e| describe_connect_error(&e.to_string()))?;

    // Spawn connection handler
    let handle = tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Connection error: {}", e);
        }
    });

    tracing::info!("✓ Connected to PostgreSQL destination");

    Ok((client, handle))
}

/// Parse error and provide helpful context
fn describe_connect_error(error_msg: &str) -> MigrateError {
    let message = if error_msg.contains("password authentication failed") {
        "Authentication failed: Invalid username or password.\n\
         Please verify your database credentials."
            .to_string()
    } else if error_msg.contains("database") && error_msg.contains("does not exist") {
        format!(
            "Database does not exist: {}\n\
             Please create the database first or check the database name.",
            error_msg
        )
    } else if error_msg.contains("Connection refused") || error_msg.contains("could not connect")
    {
        format!(
            "Connection refused: Unable to reach database server.\n\
             Please check:\n\
             - The host and port are correct\n\
             - The database server is running\n\
             - Firewall rules allow connections\n\
             Error: {}",
            error_msg
        )
    } else if error_msg.contains("timeout") || error_msg.contains("timed out") {
        format!(
            "Connection timeout: Database server did not respond in time.\n\
             This could indicate network issues or server overload.\n\
             Error: {}",
            error_msg
        )
    } else if error_msg.contains("SSL") || error_msg.contains("TLS") {
        format!(
            "TLS/SSL error: Failed to establish secure connection.\n\
             Please verify SSL/TLS configuration.\n\
             Error: {}",
            error_msg
        )
    } else if error_msg.contains("no pg_hba.conf entry") {
        format!(
            "Access denied: No pg_hba.conf entry for host.\n\
             The database server is not configured to accept connections from your host.\n\
             Error: {}",
            error_msg
        )
    } else {
        format!("Failed to connect to database: {}", error_msg)
    };

    MigrateError::connection("destination", message)
}
