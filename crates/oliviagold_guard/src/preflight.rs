//! Resolution and validation shared by every entry point.

use oliviagold_logging::StatusReporter;
use tracing::{info, warn};

use crate::client::DbClient;
use crate::descriptor::ConnectionDescriptor;
use crate::env::{ResolvedEnvironment, RuntimeMode};
use crate::error::DbError;
use crate::identity::{IdentityValidator, Verdict};

/// A resolved environment and the verdict reached for it.
#[derive(Debug, Clone)]
pub struct Preflight {
    resolved: ResolvedEnvironment,
    validator: IdentityValidator,
    verdict: Verdict,
    live_database: Option<String>,
}

impl Preflight {
    /// Report the resolution and evaluate the static rules.
    pub fn run(
        resolved: ResolvedEnvironment,
        validator: IdentityValidator,
        reporter: &dyn StatusReporter,
    ) -> Self {
        reporter.info(&format!("runtime mode: {}", resolved.mode));
        for note in &resolved.notes {
            reporter.warning(note);
        }
        match &resolved.connection {
            Some(conn) => reporter.info(&format!("target: {} (from {})", conn, resolved.source)),
            None => reporter.info("target: none configured"),
        }

        let verdict =
            validator.evaluate_reported(resolved.mode, resolved.connection.as_ref(), reporter);
        match &verdict {
            Verdict::Safe => info!(mode = %resolved.mode, "Identity validation passed"),
            Verdict::SafeWithWarning(warning) => {
                warn!(mode = %resolved.mode, %warning, "Identity validation passed with warning");
                reporter.warning(&warning.to_string());
            }
            Verdict::Unsafe(rejection) => {
                warn!(
                    mode = %resolved.mode,
                    reason = rejection.kind(),
                    "Identity validation failed"
                );
                reporter.error(&rejection.to_string());
            }
        }

        Self {
            resolved,
            validator,
            verdict,
            live_database: None,
        }
    }

    /// Ask the server which database the connection landed on and apply
    /// the identity rules to that name.
    pub async fn confirm_live(
        &mut self,
        client: &dyn DbClient,
        reporter: &dyn StatusReporter,
    ) -> Result<&Verdict, DbError> {
        let reported = client.current_database().await?;
        let verdict = self.validator.confirm_live_reported(
            self.resolved.mode,
            &reported,
            self.verdict.clone(),
            reporter,
        );
        if let Some(rejection) = verdict.rejection() {
            if self.verdict.is_safe() {
                warn!(reported = %reported, "Live database check failed");
                reporter.error(&rejection.to_string());
            }
        }
        self.live_database = Some(reported);
        self.verdict = verdict;
        Ok(&self.verdict)
    }

    pub fn resolved(&self) -> &ResolvedEnvironment {
        &self.resolved
    }

    pub fn mode(&self) -> RuntimeMode {
        self.resolved.mode
    }

    pub fn connection(&self) -> Option<&ConnectionDescriptor> {
        self.resolved.connection.as_ref()
    }

    pub fn verdict(&self) -> &Verdict {
        &self.verdict
    }

    /// Name reported by the server, once confirmed.
    pub fn live_database(&self) -> Option<&str> {
        self.live_database.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::ConnectionSource;
    use crate::identity::Rejection;
    use crate::testing::{RecordingClient, RecordingReporter};
    use oliviagold_logging::Severity;
    use std::path::PathBuf;

    fn resolved(mode: RuntimeMode, url: Option<&str>) -> ResolvedEnvironment {
        let connection = url.and_then(ConnectionDescriptor::new);
        let source = if connection.is_some() {
            ConnectionSource::ProcessEnv {
                var: "DATABASE_URL".to_string(),
            }
        } else {
            ConnectionSource::Missing
        };
        ResolvedEnvironment {
            mode,
            connection,
            source,
            config_source: PathBuf::from(".env.test"),
            config_source_found: false,
            notes: vec!["config source .env.test not found".to_string()],
        }
    }

    #[test]
    fn test_reports_resolution_and_rules() {
        let reporter = RecordingReporter::default();
        let preflight = Preflight::run(
            resolved(RuntimeMode::Test, Some("postgres://u:secret@h/shop_test")),
            IdentityValidator::default(),
            &reporter,
        );

        assert_eq!(preflight.verdict(), &Verdict::Safe);
        assert!(reporter.contains(Severity::Info, "runtime mode: test"));
        assert!(reporter.contains(Severity::Warning, "not found"));
        assert!(reporter.contains(Severity::Success, "test marker"));
        assert!(reporter.lines().iter().all(|l| !l.contains("secret")));
    }

    #[test]
    fn test_refusal_is_reported() {
        let reporter = RecordingReporter::default();
        let preflight = Preflight::run(
            resolved(RuntimeMode::Test, None),
            IdentityValidator::default(),
            &reporter,
        );

        assert_eq!(preflight.verdict(), &Verdict::Unsafe(Rejection::MissingConnection));
        assert!(reporter.contains(Severity::Error, "requires a connection string"));
    }

    #[tokio::test]
    async fn test_live_mismatch() {
        let reporter = RecordingReporter::default();
        let mut preflight = Preflight::run(
            resolved(RuntimeMode::Test, Some("postgres://h/shop_test")),
            IdentityValidator::default(),
            &reporter,
        );
        let client = RecordingClient::new("oliviagold");

        let verdict = preflight.confirm_live(&client, &reporter).await.unwrap().clone();

        assert_eq!(
            verdict,
            Verdict::Unsafe(Rejection::LiveDatabaseMismatch {
                reported: "oliviagold".to_string()
            })
        );
        assert_eq!(preflight.live_database(), Some("oliviagold"));
        assert!(!client.mutated());
    }

    #[tokio::test]
    async fn test_live_match() {
        let reporter = RecordingReporter::default();
        let mut preflight = Preflight::run(
            resolved(RuntimeMode::Test, Some("postgres://h/shop_test")),
            IdentityValidator::default(),
            &reporter,
        );
        let client = RecordingClient::new("shop_test");

        let verdict = preflight.confirm_live(&client, &reporter).await.unwrap();
        assert_eq!(verdict, &Verdict::Safe);
    }
}
