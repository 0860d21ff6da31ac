// ABOUTME: Command implementations behind the CLI subcommands
// ABOUTME: Exports migrate and verify

pub mod migrate;
pub mod verify;

pub use migrate::migrate;
pub use verify::verify;
