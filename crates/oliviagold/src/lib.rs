//! Olivia Gold guard CLI
//!
//! Command implementations behind the `oliviagold-guard` binary. The entry
//! point takes its environment, status sink, connector and stdout as
//! arguments so the whole flow runs in tests without a database.

pub mod cli;

pub use cli::{run, Cli, Commands};
