//! oliviagold-guard
//!
//! Validates that the configured database is a test database before any
//! wipe or schema reset runs against it.

use clap::Parser;
use oliviagold::cli::Cli;
use oliviagold_guard::{EnvSnapshot, PgConnector};
use oliviagold_logging::{init_logging, ConsoleReporter, LogConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match init_logging(LogConfig {
        app_name: "oliviagold-guard",
        verbose: cli.verbose,
    }) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Warning: failed to initialize logging: {:#}", err);
            None
        }
    };

    // JSON goes to stdout; status lines move to stderr so it stays parseable.
    let reporter = if cli.wants_json() {
        ConsoleReporter::stderr_only()
    } else {
        ConsoleReporter::new()
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("ERROR: failed to start async runtime: {}", err);
            return ExitCode::from(1);
        }
    };

    let env = EnvSnapshot::capture();
    let mut stdout = std::io::stdout();
    let code = runtime.block_on(oliviagold::run(cli, &env, &reporter, &PgConnector, &mut stdout));
    ExitCode::from(code)
}
