//! `check`: resolve and validate without touching data.

use anyhow::Result;
use oliviagold_guard::{
    ConnectionDescriptor, ConnectionSource, Connector, EnvSnapshot, RuntimeMode, Verdict,
};
use oliviagold_logging::StatusReporter;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

use super::context::{CommandContext, Prepared};
use super::error::HelpfulError;
use super::exit::Outcome;
use super::output::write_json;

#[derive(Debug, Clone, Copy)]
pub struct CheckArgs {
    pub live: bool,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct CheckOutput<'a> {
    mode: RuntimeMode,
    connection: Option<&'a ConnectionDescriptor>,
    source: &'a ConnectionSource,
    config_source: &'a PathBuf,
    config_source_found: bool,
    notes: &'a [String],
    live_database: Option<&'a str>,
    verdict: &'a Verdict,
}

pub async fn run(
    ctx: &CommandContext,
    args: CheckArgs,
    env: &EnvSnapshot,
    reporter: &dyn StatusReporter,
    connector: &dyn Connector,
    out: &mut dyn Write,
) -> Result<Outcome> {
    let preflight = if args.live {
        match ctx.prepare(env, reporter, connector).await? {
            Prepared::Ready { preflight, client } => {
                client.disconnect().await;
                preflight
            }
            Prepared::Refused(preflight) => preflight,
        }
    } else {
        ctx.preflight(env, reporter)?
    };

    let resolved = preflight.resolved();
    if args.json {
        write_json(
            out,
            &CheckOutput {
                mode: resolved.mode,
                connection: resolved.connection.as_ref(),
                source: &resolved.source,
                config_source: &resolved.config_source,
                config_source_found: resolved.config_source_found,
                notes: &resolved.notes,
                live_database: preflight.live_database(),
                verdict: preflight.verdict(),
            },
        )?;
    }

    match preflight.verdict() {
        Verdict::Unsafe(rejection) => {
            let helpful = HelpfulError::refused(rejection, resolved);
            for suggestion in &helpful.suggestions {
                reporter.info(suggestion);
            }
            Ok(Outcome::Refused)
        }
        Verdict::Safe | Verdict::SafeWithWarning(_) => {
            reporter.success("target is safe for destructive operations");
            Ok(Outcome::Success)
        }
    }
}
