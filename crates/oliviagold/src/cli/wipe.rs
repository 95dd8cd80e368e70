//! `wipe`: empty every planned table through the gate.

use anyhow::Result;
use oliviagold_guard::{
    ConnectionDescriptor, Connector, DestructiveGate, EnvSnapshot, GateError, GateOptions,
    GateReport, RuntimeMode, Verdict,
};
use oliviagold_logging::StatusReporter;
use serde::Serialize;
use std::io::Write;
use tracing::info;

use super::context::{CommandContext, Prepared};
use super::error::HelpfulError;
use super::exit::Outcome;
use super::output::write_json;

#[derive(Debug, Clone, Copy)]
pub struct WipeArgs {
    pub reset_sequences: bool,
    pub dry_run: bool,
    pub json: bool,
}

/// JSON shape shared by `wipe` and `reset-schema`.
#[derive(Debug, Serialize)]
pub(crate) struct GateOutput<'a> {
    pub mode: RuntimeMode,
    pub connection: Option<&'a ConnectionDescriptor>,
    pub live_database: Option<&'a str>,
    pub verdict: &'a Verdict,
    pub report: Option<&'a GateReport>,
    pub error: Option<String>,
}

pub async fn run(
    ctx: &CommandContext,
    args: WipeArgs,
    env: &EnvSnapshot,
    reporter: &dyn StatusReporter,
    connector: &dyn Connector,
    out: &mut dyn Write,
) -> Result<Outcome> {
    let plan = ctx.deletion_plan()?;

    let (preflight, client) = match ctx.prepare(env, reporter, connector).await? {
        Prepared::Ready { preflight, client } => (preflight, client),
        Prepared::Refused(preflight) => {
            if let Some(rejection) = preflight.verdict().rejection() {
                reporter.error(&format!("refusing to run: {}", rejection));
                let helpful = HelpfulError::refused(rejection, preflight.resolved());
                for suggestion in helpful.suggestions {
                    reporter.info(&suggestion);
                }
            }
            if args.json {
                write_json(out, &refused_output(&preflight))?;
            }
            return Ok(Outcome::Refused);
        }
    };

    info!(tables = plan.len(), dry_run = args.dry_run, "Starting wipe");
    let options = GateOptions {
        reset_sequences: args.reset_sequences,
        dry_run: args.dry_run,
    };
    let result = {
        let mut gate = DestructiveGate::new(client.as_ref(), reporter, options);
        gate.wipe(preflight.verdict(), &plan).await
    };
    client.disconnect().await;

    let outcome = outcome_of(&result);
    if args.json {
        write_json(
            out,
            &GateOutput {
                mode: preflight.mode(),
                connection: preflight.connection(),
                live_database: preflight.live_database(),
                verdict: preflight.verdict(),
                report: report_of(&result),
                error: result.as_ref().err().map(|e| e.to_string()),
            },
        )?;
    }
    Ok(outcome)
}

pub(crate) fn refused_output(preflight: &oliviagold_guard::Preflight) -> GateOutput<'_> {
    GateOutput {
        mode: preflight.mode(),
        connection: preflight.connection(),
        live_database: preflight.live_database(),
        verdict: preflight.verdict(),
        report: None,
        error: preflight.verdict().rejection().map(|r| r.to_string()),
    }
}

/// The finished report, or the partial one a failed step carries.
pub(crate) fn report_of(
    result: &std::result::Result<GateReport, GateError>,
) -> Option<&GateReport> {
    match result {
        Ok(report) => Some(report),
        Err(err) => err.partial_report(),
    }
}

pub(crate) fn outcome_of(result: &std::result::Result<GateReport, GateError>) -> Outcome {
    match result {
        Ok(_) => Outcome::Success,
        Err(err) if err.is_refusal() => Outcome::Refused,
        Err(_) => Outcome::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oliviagold_guard::testing::{RecordingClient, RecordingReporter};
    use oliviagold_guard::{DeletionPlan, GatePhase, Rejection};

    #[test]
    fn test_refusal_outcome() {
        let result = Err(GateError::Refused(Rejection::ProductionMode));
        assert_eq!(outcome_of(&result), Outcome::Refused);
        assert!(report_of(&result).is_none());
    }

    #[tokio::test]
    async fn test_failed_step_keeps_partial_report() {
        let client = RecordingClient::new("shop_test").fail_delete("orders", "boom");
        let reporter = RecordingReporter::default();
        let mut gate = DestructiveGate::new(&client, &reporter, GateOptions::default());

        let result = gate.wipe(&Verdict::Safe, &DeletionPlan::shop_default()).await;

        assert_eq!(outcome_of(&result), Outcome::Failed);
        let partial = report_of(&result).unwrap();
        assert_eq!(partial.phase, GatePhase::Deleting);
        assert!(partial.deleted.iter().all(|s| s.table != "orders"));
    }
}
