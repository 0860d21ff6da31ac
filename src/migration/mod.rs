// ABOUTME: Migration engine module
// ABOUTME: Table migrator, orchestrator and verifier over the source/destination traits

pub mod backend;
pub mod orchestrator;
pub mod table;
pub mod verify;

pub use backend::{DestinationDatabase, SourceColumn, SourceDatabase};
pub use orchestrator::{MigrationReport, MigrationStatus, Orchestrator};
pub use table::{convert_row, TableMigrator, TableOutcome};
pub use verify::{verify_tables, VerificationResult, VerificationSummary};
