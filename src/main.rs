// ABOUTME: CLI entry point for mysql-pg-table-migrator
// ABOUTME: Parses commands, resolves settings and routes to the command handlers

use clap::{Args, Parser, Subcommand};
use mysql_pg_table_migrator::commands;
use mysql_pg_table_migrator::config::{
    self, DestinationConfig, MigrationPlan, SourceConfig, DEST_HOST_ENV, DEST_PASSWORD_ENV,
    DEST_PORT_ENV, DEST_USER_ENV,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mysql-pg-table-migrator")]
#[command(about = "Copy MySQL tables into PostgreSQL in foreign-key order, safely re-runnable", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct ConnectionArgs {
    /// MySQL host (default: localhost)
    #[arg(long)]
    source_host: Option<String>,
    /// MySQL port (default: 3307)
    #[arg(long)]
    source_port: Option<u16>,
    /// MySQL user (default: root)
    #[arg(long)]
    source_user: Option<String>,
    /// MySQL password
    #[arg(long)]
    source_password: Option<String>,
    /// MySQL database (default: staff_rota)
    #[arg(long)]
    source_database: Option<String>,
    /// PostgreSQL host
    #[arg(long, env = DEST_HOST_ENV)]
    dest_host: Option<String>,
    /// PostgreSQL port (default: 6543)
    #[arg(long, env = DEST_PORT_ENV)]
    dest_port: Option<u16>,
    /// PostgreSQL user (default: postgres)
    #[arg(long, env = DEST_USER_ENV)]
    dest_user: Option<String>,
    /// PostgreSQL password
    #[arg(long, env = DEST_PASSWORD_ENV, hide_env_values = true)]
    dest_password: Option<String>,
    /// PostgreSQL database (default: postgres)
    #[arg(long)]
    dest_database: Option<String>,
    /// Allow a non-TLS destination connection
    #[arg(long)]
    dest_allow_plaintext: bool,
}

impl ConnectionArgs {
    fn source(&self) -> SourceConfig {
        let defaults = SourceConfig::default();
        SourceConfig {
            host: self.source_host.clone().unwrap_or(defaults.host),
            port: self.source_port.unwrap_or(defaults.port),
            user: self.source_user.clone().unwrap_or(defaults.user),
            password: self.source_password.clone().unwrap_or(defaults.password),
            database: self.source_database.clone().unwrap_or(defaults.database),
        }
    }

    fn destination(&self) -> DestinationConfig {
        let defaults = DestinationConfig::default();
        DestinationConfig {
            host: self.dest_host.clone().filter(|h| !h.trim().is_empty()),
            port: self.dest_port.unwrap_or(defaults.port),
            user: self.dest_user.clone().unwrap_or(defaults.user),
            password: self.dest_password.clone().filter(|p| !p.is_empty()),
            database: self.dest_database.clone().unwrap_or(defaults.database),
            require_tls: !self.dest_allow_plaintext,
        }
    }
}

#[derive(Args, Clone, Default)]
struct PlanArgs {
    /// Path to a migration plan TOML file (table order, key names, conversion rules)
    #[arg(long = "config")]
    config_path: Option<PathBuf>,
    /// Override the table order (comma-separated, dependencies first)
    #[arg(long, value_delimiter = ',')]
    tables: Option<Vec<String>>,
    /// Maximum rows per INSERT statement
    #[arg(long)]
    batch_size: Option<usize>,
}

impl PlanArgs {
    fn resolve(&self) -> anyhow::Result<MigrationPlan> {
        let mut plan = match &self.config_path {
            Some(path) => config::load_plan_from_file(path)?,
            None => MigrationPlan::default(),
        };
        if let Some(tables) = &self.tables {
            plan = plan.with_table_order(tables);
        }
        if let Some(batch_size) = self.batch_size {
            plan.batch_size = batch_size;
        }
        plan.validate()?;
        Ok(plan)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Copy every planned table from MySQL to PostgreSQL, then verify row counts
    Migrate {
        #[command(flatten)]
        connections: ConnectionArgs,
        #[command(flatten)]
        plan: PlanArgs,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Compare row counts between MySQL and PostgreSQL without copying anything
    Verify {
        #[command(flatten)]
        connections: ConnectionArgs,
        #[command(flatten)]
        plan: PlanArgs,
    },
    /// Print the resolved table order and conversion rules
    Plan {
        #[command(flatten)]
        plan: PlanArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate {
            connections,
            plan,
            yes,
        } => {
            let plan = plan.resolve()?;
            commands::migrate(&connections.source(), &connections.destination(), &plan, yes)
                .await
                .map(|_| ())
        }
        Commands::Verify { connections, plan } => {
            let plan = plan.resolve()?;
            commands::verify(&connections.source(), &connections.destination(), &plan)
                .await
                .map(|_| ())
        }
        Commands::Plan { plan } => {
            let plan = plan.resolve()?;
            print_plan(&plan);
            Ok(())
        }
    }
}

fn print_plan(plan: &MigrationPlan) {
    println!("Migration order ({} tables):", plan.tables.len());
    for (idx, table) in plan.tables.iter().enumerate() {
        println!("{:>3}. {} (key: {})", idx + 1, table.name, table.primary_key);
        for (column, rule) in &table.rules {
            println!("       {} -> {:?}", column, rule);
        }
    }
    if plan.boolean_heuristic.enabled {
        println!(
            "Boolean heuristic: 0/1 columns containing {}",
            plan.boolean_heuristic.patterns.join(", ")
        );
    } else {
        println!("Boolean heuristic: disabled");
    }
    println!("Batch size: {} rows", plan.batch_size);
}
