//! CLI module for the Olivia Gold guard
//!
//! `check` and `plan` never mutate anything. `wipe` and `reset-schema` run
//! only behind a passing identity verdict.

pub mod check;
pub mod context;
pub mod error;
pub mod exit;
pub mod output;
pub mod plan;
pub mod reset_schema;
pub mod wipe;

use clap::{Parser, Subcommand};
use oliviagold_guard::{Connector, EnvSnapshot, RuntimeMode};
use oliviagold_logging::StatusReporter;
use std::io::Write;
use std::path::PathBuf;
use tracing::error;

pub use context::CommandContext;
pub use error::HelpfulError;
pub use exit::Outcome;

#[derive(Parser, Debug)]
#[command(
    name = "oliviagold-guard",
    version,
    about = "Refuses destructive database work unless the target is a test database"
)]
pub struct Cli {
    /// Guard config file (default: ./oliviagold-guard.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the dotenv sources (default: current directory)
    #[arg(long, global = true)]
    pub env_dir: Option<PathBuf>,

    /// Runtime mode, overriding the mode variable (development, test, production)
    #[arg(long, global = true)]
    pub mode: Option<RuntimeMode>,

    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Exit with 3 instead of 1 when validation refuses to run
    #[arg(long, global = true)]
    pub distinct_exit_codes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the environment and validate the target database
    Check {
        /// Also connect and confirm the server-reported database name
        #[arg(long)]
        live: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the deletion plan in execution order
    Plan {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete every row of every planned table, children first
    Wipe {
        /// Skip the sequence reset pass
        #[arg(long)]
        no_sequence_reset: bool,

        /// Report what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Drop and recreate a schema
    ResetSchema {
        /// Schema to drop and recreate
        #[arg(long, default_value = "public")]
        schema: String,

        /// Report what would run without running it
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Whether stdout is reserved for JSON.
    pub fn wants_json(&self) -> bool {
        match &self.command {
            Commands::Check { json, .. }
            | Commands::Plan { json }
            | Commands::Wipe { json, .. }
            | Commands::ResetSchema { json, .. } => *json,
        }
    }
}

/// Run one command and return the process exit code.
pub async fn run(
    cli: Cli,
    env: &EnvSnapshot,
    reporter: &dyn StatusReporter,
    connector: &dyn Connector,
    out: &mut dyn Write,
) -> u8 {
    let distinct = cli.distinct_exit_codes;
    let ctx = match CommandContext::load(&cli) {
        Ok(ctx) => ctx,
        Err(err) => {
            error!("Failed to load guard configuration: {:#}", err);
            error::report(&err, reporter);
            return Outcome::Failed.code(distinct);
        }
    };

    let result = match cli.command {
        Commands::Check { live, json } => {
            check::run(&ctx, check::CheckArgs { live, json }, env, reporter, connector, out).await
        }
        Commands::Plan { json } => plan::run(&ctx, json, out),
        Commands::Wipe {
            no_sequence_reset,
            dry_run,
            json,
        } => {
            let args = wipe::WipeArgs {
                reset_sequences: !no_sequence_reset,
                dry_run,
                json,
            };
            wipe::run(&ctx, args, env, reporter, connector, out).await
        }
        Commands::ResetSchema {
            schema,
            dry_run,
            json,
        } => {
            let args = reset_schema::ResetSchemaArgs {
                schema,
                dry_run,
                json,
            };
            reset_schema::run(&ctx, args, env, reporter, connector, out).await
        }
    };

    match result {
        Ok(outcome) => outcome.code(distinct),
        Err(err) => {
            error!("Command failed: {:#}", err);
            error::report(&err, reporter);
            Outcome::Failed.code(distinct)
        }
    }
}
