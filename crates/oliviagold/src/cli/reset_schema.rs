//! `reset-schema`: drop and recreate a schema through the gate.

use anyhow::Result;
use oliviagold_guard::client::is_valid_identifier;
use oliviagold_guard::{Connector, DestructiveGate, EnvSnapshot, GateOptions};
use oliviagold_logging::StatusReporter;
use std::io::Write;
use tracing::info;

use super::context::{CommandContext, Prepared};
use super::error::HelpfulError;
use super::exit::Outcome;
use super::output::write_json;
use super::wipe::{outcome_of, refused_output, GateOutput};

#[derive(Debug, Clone)]
pub struct ResetSchemaArgs {
    pub schema: String,
    pub dry_run: bool,
    pub json: bool,
}

pub async fn run(
    ctx: &CommandContext,
    args: ResetSchemaArgs,
    env: &EnvSnapshot,
    reporter: &dyn StatusReporter,
    connector: &dyn Connector,
    out: &mut dyn Write,
) -> Result<Outcome> {
    if !is_valid_identifier(&args.schema) {
        return Err(HelpfulError::invalid_schema(&args.schema).into());
    }

    let (preflight, client) = match ctx.prepare(env, reporter, connector).await? {
        Prepared::Ready { preflight, client } => (preflight, client),
        Prepared::Refused(preflight) => {
            if let Some(rejection) = preflight.verdict().rejection() {
                reporter.error(&format!("refusing to run: {}", rejection));
            }
            if args.json {
                write_json(out, &refused_output(&preflight))?;
            }
            return Ok(Outcome::Refused);
        }
    };

    info!(schema = %args.schema, dry_run = args.dry_run, "Starting schema reset");
    let options = GateOptions {
        reset_sequences: false,
        dry_run: args.dry_run,
    };
    let result = {
        let mut gate = DestructiveGate::new(client.as_ref(), reporter, options);
        gate.reset_schema(preflight.verdict(), &args.schema).await
    };
    client.disconnect().await;

    if args.json {
        write_json(
            out,
            &GateOutput {
                mode: preflight.mode(),
                connection: preflight.connection(),
                live_database: preflight.live_database(),
                verdict: preflight.verdict(),
                report: result.as_ref().ok(),
                error: result.as_ref().err().map(|e| e.to_string()),
            },
        )?;
    }
    Ok(outcome_of(&result))
}
