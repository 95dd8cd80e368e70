//! Destructive-operation gate.
//!
//! Per invocation the gate walks
//! `Idle -> Validating -> {Aborted | Deleting -> SequenceResetting -> Done}`.
//! `Aborted` and `Done` are terminal and there is no way back into
//! `Deleting`: a failed run needs a fresh gate.

use chrono::{DateTime, Utc};
use oliviagold_logging::StatusReporter;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::client::{DbClient, SequenceReset};
use crate::error::DbError;
use crate::identity::{Rejection, Verdict, Warning};
use crate::plan::DeletionPlan;

/// Phase of a gate invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePhase {
    Idle,
    Validating,
    Aborted,
    Deleting,
    SequenceResetting,
    Done,
}

impl GatePhase {
    pub fn can_transition_to(self, next: GatePhase) -> bool {
        matches!(
            (self, next),
            (GatePhase::Idle, GatePhase::Validating)
                | (GatePhase::Validating, GatePhase::Aborted)
                | (GatePhase::Validating, GatePhase::Deleting)
                | (GatePhase::Deleting, GatePhase::SequenceResetting)
                | (GatePhase::SequenceResetting, GatePhase::Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, GatePhase::Aborted | GatePhase::Done)
    }
}

/// Errors returned by the gate.
#[derive(Debug, Error)]
pub enum GateError {
    /// Validation failed; nothing was executed.
    #[error("refused to run: {0}")]
    Refused(Rejection),

    /// A deletion step failed. `partial` holds the steps that completed
    /// before it.
    #[error("deleting {entity} (table {table}) failed: {source}")]
    StepFailed {
        entity: String,
        table: String,
        partial: Box<GateReport>,
        #[source]
        source: DbError,
    },

    #[error("resetting schema {schema} failed: {source}")]
    SchemaResetFailed {
        schema: String,
        #[source]
        source: DbError,
    },

    #[error("invalid gate transition from {from:?} to {to:?}")]
    InvalidTransition { from: GatePhase, to: GatePhase },
}

impl GateError {
    /// Whether the gate refused to run, as opposed to running and failing.
    pub fn is_refusal(&self) -> bool {
        matches!(self, GateError::Refused(_))
    }

    /// Report of the work done before a step failed.
    pub fn partial_report(&self) -> Option<&GateReport> {
        match self {
            GateError::StepFailed { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

/// Behaviour switches for a gate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateOptions {
    /// Run the best-effort sequence reset pass after deleting.
    pub reset_sequences: bool,
    /// Report what would run without issuing any mutation.
    pub dry_run: bool,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            reset_sequences: true,
            dry_run: false,
        }
    }
}

/// One executed (or, in dry runs, planned) deletion step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub entity: String,
    pub table: String,
    pub wave: usize,
    /// `None` in dry runs.
    pub rows: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceReport {
    pub table: String,
    pub outcome: SequenceReset,
}

/// Summary of a completed gate run.
#[derive(Debug, Clone, Serialize)]
pub struct GateReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub phase: GatePhase,
    pub dry_run: bool,
    pub warning: Option<Warning>,
    pub deleted: Vec<StepReport>,
    pub sequences: Vec<SequenceReport>,
    pub schema_reset: Option<String>,
}

impl GateReport {
    fn start(dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            phase: GatePhase::Idle,
            dry_run,
            warning: None,
            deleted: Vec::new(),
            sequences: Vec::new(),
            schema_reset: None,
        }
    }

    /// Rows removed across all steps.
    pub fn total_rows(&self) -> u64 {
        self.deleted.iter().filter_map(|s| s.rows).sum()
    }
}

/// Runs destructive operations only behind a passing verdict.
pub struct DestructiveGate<'a> {
    client: &'a dyn DbClient,
    reporter: &'a dyn StatusReporter,
    options: GateOptions,
    phase: GatePhase,
}

impl<'a> DestructiveGate<'a> {
    pub fn new(
        client: &'a dyn DbClient,
        reporter: &'a dyn StatusReporter,
        options: GateOptions,
    ) -> Self {
        Self {
            client,
            reporter,
            options,
            phase: GatePhase::Idle,
        }
    }

    pub fn phase(&self) -> GatePhase {
        self.phase
    }

    /// Empty every table of `plan`, children first.
    ///
    /// The first failing step stops the run; no later step is attempted.
    pub async fn wipe(
        &mut self,
        verdict: &Verdict,
        plan: &DeletionPlan,
    ) -> Result<GateReport, GateError> {
        let mut report = GateReport::start(self.options.dry_run);
        self.validate(verdict, &mut report)?;

        self.advance(GatePhase::Deleting)?;
        for (wave, steps) in plan.waves().into_iter().enumerate() {
            debug!(wave, tables = steps.len(), "Starting deletion wave");
            for step in steps {
                if self.options.dry_run {
                    self.reporter.info(&format!(
                        "would delete all {} (table {}, wave {})",
                        step.entity, step.table, wave
                    ));
                    report.deleted.push(StepReport {
                        entity: step.entity.clone(),
                        table: step.table.clone(),
                        wave,
                        rows: None,
                    });
                    continue;
                }

                match self.client.delete_all(&step.table).await {
                    Ok(rows) => {
                        info!(entity = %step.entity, table = %step.table, rows, "Deleted rows");
                        self.reporter
                            .success(&format!("deleted {} {} rows", rows, step.entity));
                        report.deleted.push(StepReport {
                            entity: step.entity.clone(),
                            table: step.table.clone(),
                            wave,
                            rows: Some(rows),
                        });
                    }
                    Err(source) => {
                        error!(
                            entity = %step.entity,
                            table = %step.table,
                            error = %source,
                            "Deletion step failed"
                        );
                        self.reporter.error(&format!(
                            "failed to delete {} (table {}): {}",
                            step.entity, step.table, source
                        ));
                        report.phase = self.phase;
                        return Err(GateError::StepFailed {
                            entity: step.entity.clone(),
                            table: step.table.clone(),
                            partial: Box::new(report),
                            source,
                        });
                    }
                }
            }
        }

        self.advance(GatePhase::SequenceResetting)?;
        if self.options.reset_sequences && !self.options.dry_run {
            for step in plan.ordered() {
                let outcome = self.client.reset_sequence(&step.table).await;
                match &outcome {
                    SequenceReset::Reset { sequence } => self
                        .reporter
                        .info(&format!("reset sequence {} for {}", sequence, step.table)),
                    SequenceReset::Skipped(reason) => self
                        .reporter
                        .info(&format!("skipped sequence reset for {}: {}", step.table, reason)),
                    SequenceReset::Failed(err) => {
                        info!(
                            table = %step.table,
                            error = %err,
                            "Sequence reset failed, continuing"
                        );
                        self.reporter.info(&format!(
                            "sequence reset for {} failed (ignored): {}",
                            step.table, err
                        ))
                    }
                }
                report.sequences.push(SequenceReport {
                    table: step.table.clone(),
                    outcome,
                });
            }
        }

        self.finish(&mut report)?;
        let verb = if self.options.dry_run { "dry run" } else { "wipe" };
        self.reporter.success(&format!(
            "{} complete: {} tables, {} rows",
            verb,
            report.deleted.len(),
            report.total_rows()
        ));
        Ok(report)
    }

    /// Drop and recreate `schema`.
    pub async fn reset_schema(
        &mut self,
        verdict: &Verdict,
        schema: &str,
    ) -> Result<GateReport, GateError> {
        let mut report = GateReport::start(self.options.dry_run);
        self.validate(verdict, &mut report)?;

        self.advance(GatePhase::Deleting)?;
        if self.options.dry_run {
            self.reporter
                .info(&format!("would drop and recreate schema {}", schema));
        } else {
            if let Err(source) = self.client.reset_schema(schema).await {
                error!(schema, error = %source, "Schema reset failed");
                self.reporter
                    .error(&format!("failed to reset schema {}: {}", schema, source));
                return Err(GateError::SchemaResetFailed {
                    schema: schema.to_string(),
                    source,
                });
            }
            self.reporter
                .success(&format!("dropped and recreated schema {}", schema));
        }
        report.schema_reset = Some(schema.to_string());

        // A recreated schema has no sequences left to reset.
        self.advance(GatePhase::SequenceResetting)?;
        self.finish(&mut report)?;
        Ok(report)
    }

    fn validate(&mut self, verdict: &Verdict, report: &mut GateReport) -> Result<(), GateError> {
        self.advance(GatePhase::Validating)?;
        match verdict {
            Verdict::Safe => {
                self.reporter.success("database identity verified");
            }
            Verdict::SafeWithWarning(warning) => {
                warn!(%warning, "Proceeding despite warning");
                self.reporter.warning(&warning.to_string());
                report.warning = Some(warning.clone());
            }
            Verdict::Unsafe(rejection) => {
                self.advance(GatePhase::Aborted)?;
                error!(reason = rejection.kind(), "Refusing destructive operation");
                self.reporter
                    .error(&format!("refusing to run: {}", rejection));
                return Err(GateError::Refused(rejection.clone()));
            }
        }
        Ok(())
    }

    fn finish(&mut self, report: &mut GateReport) -> Result<(), GateError> {
        self.advance(GatePhase::Done)?;
        report.phase = self.phase;
        report.finished_at = Some(Utc::now());
        Ok(())
    }

    fn advance(&mut self, next: GatePhase) -> Result<(), GateError> {
        if !self.phase.can_transition_to(next) {
            return Err(GateError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        debug!(from = ?self.phase, to = ?next, "Gate transition");
        self.phase = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::DeletionStep;
    use crate::testing::{ClientCall, RecordingClient, RecordingReporter};
    use oliviagold_logging::Severity;

    fn plan() -> DeletionPlan {
        DeletionPlan::new(vec![
            DeletionStep::new("customers", "customers"),
            DeletionStep::new("orders", "orders").depends_on(&["customers"]),
            DeletionStep::new("order items", "order_items").depends_on(&["orders"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_transitions() {
        assert!(GatePhase::Idle.can_transition_to(GatePhase::Validating));
        assert!(GatePhase::Validating.can_transition_to(GatePhase::Aborted));
        assert!(!GatePhase::Idle.can_transition_to(GatePhase::Deleting));
        assert!(!GatePhase::Aborted.can_transition_to(GatePhase::Deleting));
        assert!(!GatePhase::Done.can_transition_to(GatePhase::Deleting));
        assert!(!GatePhase::SequenceResetting.can_transition_to(GatePhase::Deleting));
        assert!(GatePhase::Done.is_terminal());
        assert!(GatePhase::Aborted.is_terminal());
    }

    #[tokio::test]
    async fn test_safe_wipe_runs_in_order() {
        let client = RecordingClient::new("shop_test").with_rows("orders", 4);
        let reporter = RecordingReporter::default();
        let mut gate = DestructiveGate::new(&client, &reporter, GateOptions::default());

        let report = gate.wipe(&Verdict::Safe, &plan()).await.unwrap();

        assert_eq!(client.deleted_tables(), vec!["order_items", "orders", "customers"]);
        assert_eq!(report.phase, GatePhase::Done);
        assert_eq!(report.total_rows(), 4);
        assert_eq!(report.sequences.len(), 3);
        assert_eq!(gate.phase(), GatePhase::Done);
    }

    #[tokio::test]
    async fn test_unsafe_verdict_aborts_without_calls() {
        let client = RecordingClient::new("shop_dev");
        let reporter = RecordingReporter::default();
        let mut gate = DestructiveGate::new(&client, &reporter, GateOptions::default());

        let err = gate
            .wipe(&Verdict::Unsafe(Rejection::MissingConnection), &plan())
            .await
            .unwrap_err();

        assert!(err.is_refusal());
        assert!(client.calls().is_empty());
        assert_eq!(gate.phase(), GatePhase::Aborted);
        assert!(reporter.contains(Severity::Error, "refusing to run"));
    }

    #[tokio::test]
    async fn test_failed_step_stops_run() {
        let client =
            RecordingClient::new("shop_test").fail_delete("orders", "foreign key violation");
        let reporter = RecordingReporter::default();
        let mut gate = DestructiveGate::new(&client, &reporter, GateOptions::default());

        let err = gate.wipe(&Verdict::Safe, &plan()).await.unwrap_err();

        match &err {
            GateError::StepFailed { entity, partial, .. } => {
                assert_eq!(entity, "orders");
                assert_eq!(partial.phase, GatePhase::Deleting);
                assert!(partial.finished_at.is_none());
                let done: Vec<&str> = partial.deleted.iter().map(|s| s.table.as_str()).collect();
                assert_eq!(done, vec!["order_items"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.partial_report().is_some());
        assert!(err.to_string().contains("orders"));
        assert_eq!(client.deleted_tables(), vec!["order_items", "orders"]);
        assert!(!client.calls().iter().any(|c| matches!(c, ClientCall::ResetSequence(_))));
        assert_eq!(gate.phase(), GatePhase::Deleting);
    }

    #[tokio::test]
    async fn test_warning_proceeds() {
        let client = RecordingClient::new("shop_test");
        let reporter = RecordingReporter::default();
        let mut gate = DestructiveGate::new(&client, &reporter, GateOptions::default());
        let verdict = Verdict::SafeWithWarning(Warning::DevelopmentUsingTestDatabase {
            target: "postgres://h/shop_test".to_string(),
        });

        let report = gate.wipe(&verdict, &plan()).await.unwrap();

        assert!(report.warning.is_some());
        assert_eq!(client.deleted_tables().len(), 3);
        assert!(reporter.contains(Severity::Warning, "development mode"));
    }

    #[tokio::test]
    async fn test_sequence_failures_are_not_fatal() {
        let client = RecordingClient::new("shop_test")
            .with_sequence("orders", SequenceReset::Failed("permission denied".to_string()))
            .with_sequence(
                "customers",
                SequenceReset::Reset {
                    sequence: "public.customers_id_seq".to_string(),
                },
            );
        let reporter = RecordingReporter::default();
        let mut gate = DestructiveGate::new(&client, &reporter, GateOptions::default());

        let report = gate.wipe(&Verdict::Safe, &plan()).await.unwrap();

        let outcomes: Vec<&SequenceReset> = report.sequences.iter().map(|s| &s.outcome).collect();
        assert!(matches!(outcomes[0], SequenceReset::Skipped(_)));
        assert!(matches!(outcomes[1], SequenceReset::Failed(_)));
        assert!(matches!(outcomes[2], SequenceReset::Reset { .. }));
        assert!(reporter.contains(Severity::Info, "failed (ignored)"));
        assert!(!reporter.any(Severity::Error));
    }

    #[tokio::test]
    async fn test_sequence_pass_can_be_disabled() {
        let client = RecordingClient::new("shop_test");
        let reporter = RecordingReporter::default();
        let options = GateOptions {
            reset_sequences: false,
            ..GateOptions::default()
        };
        let mut gate = DestructiveGate::new(&client, &reporter, options);

        let report = gate.wipe(&Verdict::Safe, &plan()).await.unwrap();

        assert!(report.sequences.is_empty());
        assert_eq!(report.phase, GatePhase::Done);
    }

    #[tokio::test]
    async fn test_dry_run_issues_no_mutation() {
        let client = RecordingClient::new("shop_test");
        let reporter = RecordingReporter::default();
        let options = GateOptions {
            dry_run: true,
            ..GateOptions::default()
        };
        let mut gate = DestructiveGate::new(&client, &reporter, options);

        let report = gate.wipe(&Verdict::Safe, &plan()).await.unwrap();

        assert!(client.calls().is_empty());
        assert_eq!(report.deleted.len(), 3);
        assert!(report.deleted.iter().all(|s| s.rows.is_none()));
    }

    #[tokio::test]
    async fn test_gate_is_single_use() {
        let client = RecordingClient::new("shop_test");
        let reporter = RecordingReporter::default();
        let mut gate = DestructiveGate::new(&client, &reporter, GateOptions::default());

        gate.wipe(&Verdict::Safe, &plan()).await.unwrap();
        let err = gate.wipe(&Verdict::Safe, &plan()).await.unwrap_err();
        assert!(matches!(err, GateError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_reset_schema() {
        let client = RecordingClient::new("shop_test");
        let reporter = RecordingReporter::default();
        let mut gate = DestructiveGate::new(&client, &reporter, GateOptions::default());

        let report = gate.reset_schema(&Verdict::Safe, "public").await.unwrap();

        assert_eq!(client.calls(), vec![ClientCall::ResetSchema("public".to_string())]);
        assert_eq!(report.schema_reset.as_deref(), Some("public"));
        assert_eq!(report.phase, GatePhase::Done);
    }

    #[tokio::test]
    async fn test_reset_schema_failure() {
        let client =
            RecordingClient::new("shop_test").fail_schema_reset("must be owner of schema public");
        let reporter = RecordingReporter::default();
        let mut gate = DestructiveGate::new(&client, &reporter, GateOptions::default());

        let err = gate.reset_schema(&Verdict::Safe, "public").await.unwrap_err();

        assert!(matches!(
            err,
            GateError::SchemaResetFailed { ref schema, .. } if schema == "public"
        ));
        assert!(!err.is_refusal());
        assert!(err.partial_report().is_none());
        assert_eq!(gate.phase(), GatePhase::Deleting);
        assert_eq!(
            reporter.entries().last(),
            Some(&(
                Severity::Error,
                "failed to reset schema public: must be owner of schema public".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_reset_schema_refused() {
        let client = RecordingClient::new("shop_dev");
        let reporter = RecordingReporter::default();
        let mut gate = DestructiveGate::new(&client, &reporter, GateOptions::default());

        let err = gate
            .reset_schema(&Verdict::Unsafe(Rejection::ProductionMode), "public")
            .await
            .unwrap_err();

        assert!(err.is_refusal());
        assert!(client.calls().is_empty());
    }
}
