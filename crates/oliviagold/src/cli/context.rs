//! Per-invocation command context.
//!
//! Built once from the global flags: config file, dotenv directory and mode
//! override. Commands resolve and validate through it.

use anyhow::Result;
use oliviagold_guard::{
    Connector, DbClient, DeletionPlan, EnvSnapshot, GuardConfig, Preflight, RuntimeMode,
};
use oliviagold_logging::StatusReporter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use super::error::HelpfulError;
use super::Cli;

pub struct CommandContext {
    pub config: GuardConfig,
    pub config_path: Option<PathBuf>,
    pub base_dir: PathBuf,
    pub mode_override: Option<RuntimeMode>,
}

/// A validated target, connected when validation passed.
pub enum Prepared {
    Ready {
        preflight: Preflight,
        client: Arc<dyn DbClient>,
    },
    /// Validation refused; nothing was connected.
    Refused(Preflight),
}

impl CommandContext {
    pub fn load(cli: &Cli) -> Result<Self> {
        let base_dir = cli.env_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let config = GuardConfig::load_or_default(cli.config.as_deref(), &base_dir)
            .map_err(|err| HelpfulError::config(&err, cli.config.as_deref()))?;
        debug!(base_dir = %base_dir.display(), "Loaded command context");
        Ok(Self {
            config,
            config_path: cli.config.clone(),
            base_dir,
            mode_override: cli.mode,
        })
    }

    /// Resolve the environment and evaluate the static rules.
    pub fn preflight(&self, env: &EnvSnapshot, reporter: &dyn StatusReporter) -> Result<Preflight> {
        let resolved = self
            .config
            .resolver(&self.base_dir)
            .with_mode_override(self.mode_override)
            .resolve(env)
            .map_err(|err| HelpfulError::config(&err, None))?;
        Ok(Preflight::run(resolved, self.config.validator(), reporter))
    }

    pub fn deletion_plan(&self) -> Result<DeletionPlan> {
        Ok(self
            .config
            .deletion_plan()
            .map_err(|err| HelpfulError::config(&err, self.config_path.as_deref()))?)
    }

    /// Validate, and only when that passes connect and confirm the live
    /// database name if configured to.
    pub async fn prepare(
        &self,
        env: &EnvSnapshot,
        reporter: &dyn StatusReporter,
        connector: &dyn Connector,
    ) -> Result<Prepared> {
        let mut preflight = self.preflight(env, reporter)?;
        if !preflight.verdict().is_safe() {
            return Ok(Prepared::Refused(preflight));
        }

        let Some(conn) = preflight.connection().cloned() else {
            return Err(HelpfulError::nothing_to_connect(preflight.resolved()).into());
        };
        let client = connector
            .connect(&conn)
            .await
            .map_err(|err| HelpfulError::connection_failed(&conn, &err.to_string()))?;

        if self.config.identity.live_check {
            let confirmed = preflight.confirm_live(client.as_ref(), reporter).await;
            if let Err(err) = confirmed {
                client.disconnect().await;
                return Err(HelpfulError::connection_failed(&conn, &err.to_string()).into());
            }
        }

        Ok(Prepared::Ready { preflight, client })
    }
}
