//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use oliviagold_guard::{ConnectionDescriptor, GuardError, Rejection, ResolvedEnvironment};
use oliviagold_logging::StatusReporter;
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// Config file could not be loaded
    pub fn config(err: &GuardError, path: Option<&Path>) -> Self {
        let mut helpful = Self::new(err.to_string());
        if let Some(path) = path {
            helpful = helpful.with_context(format!("While loading {}", path.display()));
        }
        match err {
            GuardError::ConfigMissing(path) => helpful.with_suggestions([
                format!("TRY: Check the path: ls -la {}", path.display()),
                "TRY: Omit --config to use ./oliviagold-guard.toml or the built-in defaults".to_string(),
            ]),
            GuardError::ConfigParse { .. } => helpful.with_suggestions([
                "TRY: Valid sections are [environment], [identity] and [[deletion]]".to_string(),
            ]),
            GuardError::EnvFile { path, .. } => helpful.with_suggestions([
                format!("TRY: Each line of {} must be KEY=value", path.display()),
            ]),
            GuardError::Plan(_) => helpful.with_suggestions([
                "TRY: Every depends_on entry must name another [[deletion]] table".to_string(),
                "TRY: Run `oliviagold-guard plan` to inspect the order".to_string(),
            ]),
            _ => helpful,
        }
    }

    /// Validation refused to run
    pub fn refused(rejection: &Rejection, resolved: &ResolvedEnvironment) -> Self {
        let helpful = Self::new(rejection.to_string()).with_context(format!(
            "Runtime mode {}; connection from {}",
            resolved.mode, resolved.source
        ));
        match rejection {
            Rejection::MissingConnection => helpful.with_suggestions([
                format!(
                    "TRY: Add DATABASE_URL to {}",
                    resolved.config_source.display()
                ),
                "TRY: Export TEST_DATABASE_URL pointing at a *_test database".to_string(),
            ]),
            Rejection::NotATestDatabase { marker, .. } => helpful.with_suggestions([
                format!(
                    "TRY: Point the test configuration at a database whose name contains '{}'",
                    marker
                ),
            ]),
            Rejection::DevelopmentDatabaseInTestMode { .. } => helpful.with_suggestions([
                "TRY: Create a separate test database, e.g. shop_test".to_string(),
                format!(
                    "TRY: Set DATABASE_URL in {} to that database",
                    resolved.config_source.display()
                ),
            ]),
            Rejection::ProductionMode => helpful.with_suggestions([
                "TRY: Run with --mode test against a test database".to_string(),
            ]),
            Rejection::LiveDatabaseMismatch { .. } => helpful.with_suggestions([
                "TRY: Check for a proxy or alias that routes to another database".to_string(),
            ]),
        }
    }

    /// Connecting to the validated target failed
    pub fn connection_failed(target: &ConnectionDescriptor, details: &str) -> Self {
        Self::new(format!("Cannot connect to {}", target))
            .with_context(details.to_string())
            .with_suggestions([
                "TRY: Check that PostgreSQL is running and reachable".to_string(),
                "TRY: Run `oliviagold-guard check` to see the resolved target".to_string(),
            ])
    }

    /// No connection string in a mode that does not require one
    pub fn nothing_to_connect(resolved: &ResolvedEnvironment) -> Self {
        Self::new("No connection string configured")
            .with_context(format!("Runtime mode {}", resolved.mode))
            .with_suggestion(format!(
                "TRY: Set DATABASE_URL in {} or the environment",
                resolved.config_source.display()
            ))
    }

    pub fn invalid_schema(schema: &str) -> Self {
        Self::new(format!("Invalid schema name: '{}'", schema))
            .with_context("Schema names must be plain identifiers")
            .with_suggestion("TRY: --schema public")
    }

    /// Emit as status lines: the message as an error, the rest as info.
    pub fn report(&self, reporter: &dyn StatusReporter) {
        reporter.error(&self.message);
        if let Some(ctx) = &self.context {
            reporter.info(ctx);
        }
        for suggestion in &self.suggestions {
            reporter.info(suggestion);
        }
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;
        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }
        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// Report any command error, with suggestions when it carries them.
pub fn report(err: &anyhow::Error, reporter: &dyn StatusReporter) {
    match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => helpful.report(reporter),
        None => reporter.error(&format!("{:#}", err)),
    }
}
