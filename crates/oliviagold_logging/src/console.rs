//! Severity-marked status lines for operator-facing output.
//!
//! Every validation rule and every destructive step produces one line. The
//! lines are advisory; nothing parses them.

use std::fmt;
use std::io::{self, Write};

/// Severity of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    /// Prefix printed in front of the message.
    pub fn marker(&self) -> &'static str {
        match self {
            Severity::Info => "[info]",
            Severity::Success => "[ok]",
            Severity::Warning => "[warn]",
            Severity::Error => "[error]",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Render a status line.
pub fn format_status(severity: Severity, message: &str) -> String {
    format!("{} {}", severity.marker(), message)
}

/// Sink for operator status lines.
pub trait StatusReporter: Send + Sync {
    fn report(&self, severity: Severity, message: &str);

    fn info(&self, message: &str) {
        self.report(Severity::Info, message);
    }

    fn success(&self, message: &str) {
        self.report(Severity::Success, message);
    }

    fn warning(&self, message: &str) {
        self.report(Severity::Warning, message);
    }

    fn error(&self, message: &str) {
        self.report(Severity::Error, message);
    }
}

/// Writes status lines to the terminal and mirrors them into tracing.
///
/// Info and success go to stdout, warnings and errors to stderr. In
/// `stderr_only` mode everything goes to stderr so stdout stays clean for
/// JSON output.
#[derive(Debug, Clone, Default)]
pub struct ConsoleReporter {
    stderr_only: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self { stderr_only: false }
    }

    pub fn stderr_only() -> Self {
        Self { stderr_only: true }
    }
}

impl StatusReporter for ConsoleReporter {
    fn report(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info | Severity::Success => {
                tracing::info!(target: "oliviagold::status", severity = %severity, "{}", message)
            }
            Severity::Warning => {
                tracing::warn!(target: "oliviagold::status", "{}", message)
            }
            Severity::Error => {
                tracing::error!(target: "oliviagold::status", "{}", message)
            }
        }

        let line = format_status(severity, message);
        let to_stderr = self.stderr_only || matches!(severity, Severity::Warning | Severity::Error);
        // A closed pipe must not turn a status line into a failure.
        if to_stderr {
            let _ = writeln!(io::stderr().lock(), "{}", line);
        } else {
            let _ = writeln!(io::stdout().lock(), "{}", line);
        }
    }
}
