//! Test-runner bootstrap.
//!
//! Resolves the environment in test mode, refuses anything that is not a
//! test database, connects, and confirms the server-side database name.
//! Suites call this once before any test touches the database.

use oliviagold_guard::{
    Connector, DbClient, DbError, DeletionPlan, DestructiveGate, EnvSnapshot, GateError,
    GateOptions, GateReport, GuardConfig, GuardError, Preflight, Rejection, RuntimeMode,
};
use oliviagold_logging::StatusReporter;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] GuardError),

    #[error("refusing to run tests: {0}")]
    Refused(Rejection),

    #[error("could not connect to the test database: {0}")]
    Connect(#[from] DbError),
}

/// A validated, connected test database.
pub struct TestDatabase {
    pub client: Arc<dyn DbClient>,
    pub preflight: Preflight,
    pub plan: DeletionPlan,
}

impl TestDatabase {
    /// Empty every table of the plan through the gate.
    pub async fn reset(&self, reporter: &dyn StatusReporter) -> Result<GateReport, GateError> {
        let mut gate = DestructiveGate::new(self.client.as_ref(), reporter, GateOptions::default());
        gate.wipe(self.preflight.verdict(), &self.plan).await
    }

    pub async fn close(&self) {
        self.client.disconnect().await;
    }
}

/// Resolve in test mode, validate, connect and confirm.
///
/// The mode variable is ignored: a test runner is always in test mode.
pub async fn bootstrap_test_database(
    config: &GuardConfig,
    base_dir: &Path,
    env: &EnvSnapshot,
    connector: &dyn Connector,
    reporter: &dyn StatusReporter,
) -> Result<TestDatabase, BootstrapError> {
    let resolved = config
        .resolver(base_dir)
        .with_mode_override(Some(RuntimeMode::Test))
        .resolve(env)?;
    let plan = config.deletion_plan()?;

    let mut preflight = Preflight::run(resolved, config.validator(), reporter);
    if let Some(rejection) = preflight.verdict().rejection() {
        return Err(BootstrapError::Refused(rejection.clone()));
    }

    let Some(conn) = preflight.connection().cloned() else {
        return Err(BootstrapError::Refused(Rejection::MissingConnection));
    };
    let client = connector.connect(&conn).await?;

    if config.identity.live_check {
        let rejection = match preflight.confirm_live(client.as_ref(), reporter).await {
            Ok(verdict) => verdict.rejection().cloned(),
            Err(err) => {
                client.disconnect().await;
                return Err(err.into());
            }
        };
        if let Some(rejection) = rejection {
            client.disconnect().await;
            return Err(BootstrapError::Refused(rejection));
        }
    }

    info!(database = %conn, "Test database ready");
    reporter.success("test database ready");
    Ok(TestDatabase {
        client,
        preflight,
        plan,
    })
}
