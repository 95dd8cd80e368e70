//! Runtime mode and connection resolution.
//!
//! The process environment is captured once into an [`EnvSnapshot`] at entry
//! and everything downstream works from the resolved value object.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::descriptor::ConnectionDescriptor;
use crate::error::{GuardError, Result};

/// Declared execution context of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    Development,
    Test,
    Production,
}

impl RuntimeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeMode::Development => "development",
            RuntimeMode::Test => "test",
            RuntimeMode::Production => "production",
        }
    }

    /// Parse a mode signal. Returns `None` for values naming no known mode.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Some(RuntimeMode::Development),
            "test" | "testing" => Some(RuntimeMode::Test),
            "prod" | "production" => Some(RuntimeMode::Production),
            _ => None,
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RuntimeMode::parse(s).ok_or_else(|| {
            format!(
                "unknown mode '{}' (expected development, test or production)",
                s
            )
        })
    }
}

/// Immutable copy of the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment. Non-UTF-8 entries are skipped.
    pub fn capture() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Value of `key`; empty values count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        non_empty(self.vars.get(key))
    }
}

/// Names of the variables and dotenv sources the resolver consults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentSettings {
    pub mode_var: String,
    pub database_url_var: String,
    pub test_database_url_var: String,
    pub default_source: PathBuf,
    pub test_source: PathBuf,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            mode_var: "NODE_ENV".to_string(),
            database_url_var: "DATABASE_URL".to_string(),
            test_database_url_var: "TEST_DATABASE_URL".to_string(),
            default_source: PathBuf::from(".env"),
            test_source: PathBuf::from(".env.test"),
        }
    }
}

/// Where the resolved connection string came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectionSource {
    ProcessEnv { var: String },
    File { path: PathBuf, var: String },
    Missing,
}

impl fmt::Display for ConnectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionSource::ProcessEnv { var } => write!(f, "process environment ({})", var),
            ConnectionSource::File { path, var } => write!(f, "{} ({})", path.display(), var),
            ConnectionSource::Missing => write!(f, "no source"),
        }
    }
}

/// Mode and connection for the current process, resolved once.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedEnvironment {
    pub mode: RuntimeMode,
    pub connection: Option<ConnectionDescriptor>,
    pub source: ConnectionSource,
    /// Dotenv source consulted for this mode.
    pub config_source: PathBuf,
    pub config_source_found: bool,
    /// Non-fatal observations made while resolving.
    pub notes: Vec<String>,
}

/// Load a dotenv file as a key/value map without touching the process
/// environment. A missing file is an empty map.
pub fn load_config(path: &Path) -> Result<HashMap<String, String>> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(err) if err.not_found() => {
            debug!(path = %path.display(), "Config source not present");
            return Ok(HashMap::new());
        }
        Err(err) => return Err(GuardError::env_file(path, err)),
    };

    let mut values = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|err| GuardError::env_file(path, err))?;
        values.insert(key, value);
    }
    Ok(values)
}

/// Determines the runtime mode and connection string.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentResolver {
    settings: EnvironmentSettings,
    base_dir: PathBuf,
    mode_override: Option<RuntimeMode>,
}

impl EnvironmentResolver {
    pub fn new(settings: EnvironmentSettings) -> Self {
        Self {
            settings,
            base_dir: PathBuf::new(),
            mode_override: None,
        }
    }

    /// Directory relative dotenv sources are resolved against.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Use `mode` instead of reading the mode variable.
    pub fn with_mode_override(mut self, mode: Option<RuntimeMode>) -> Self {
        self.mode_override = mode;
        self
    }

    pub fn settings(&self) -> &EnvironmentSettings {
        &self.settings
    }

    /// Dotenv source for `mode`.
    pub fn source_path(&self, mode: RuntimeMode) -> PathBuf {
        let source = match mode {
            RuntimeMode::Test => &self.settings.test_source,
            RuntimeMode::Development | RuntimeMode::Production => &self.settings.default_source,
        };
        self.base_dir.join(source)
    }

    pub fn resolve(&self, env: &EnvSnapshot) -> Result<ResolvedEnvironment> {
        let mut notes = Vec::new();
        let mode = match self.mode_override {
            Some(mode) => mode,
            None => self.mode_from(env, &mut notes),
        };

        let config_source = self.source_path(mode);
        let config_source_found = config_source.is_file();
        if !config_source_found {
            notes.push(format!(
                "config source {} not found; using the process environment only",
                config_source.display()
            ));
        }
        let file = load_config(&config_source)?;

        let (connection, source) = match mode {
            RuntimeMode::Test => self.test_connection(env, &file, &config_source),
            RuntimeMode::Development | RuntimeMode::Production => {
                self.default_connection(env, &file, &config_source)
            }
        };

        info!(
            mode = %mode,
            source = %source,
            connection = %connection.as_ref().map(|c| c.redacted()).unwrap_or_default(),
            "Resolved environment"
        );

        Ok(ResolvedEnvironment {
            mode,
            connection,
            source,
            config_source,
            config_source_found,
            notes,
        })
    }

    fn mode_from(&self, env: &EnvSnapshot, notes: &mut Vec<String>) -> RuntimeMode {
        let Some(raw) = env.get(&self.settings.mode_var) else {
            return RuntimeMode::Development;
        };
        RuntimeMode::parse(raw).unwrap_or_else(|| {
            warn!(
                var = %self.settings.mode_var,
                value = raw,
                "Unknown runtime mode, assuming development"
            );
            notes.push(format!(
                "{}='{}' is not a known mode; assuming development",
                self.settings.mode_var, raw
            ));
            RuntimeMode::Development
        })
    }

    /// Test mode: the test-specific variable wins, then the test source's
    /// primary variable, then the process environment's primary variable.
    fn test_connection(
        &self,
        env: &EnvSnapshot,
        file: &HashMap<String, String>,
        path: &Path,
    ) -> (Option<ConnectionDescriptor>, ConnectionSource) {
        let test_var = &self.settings.test_database_url_var;
        let primary_var = &self.settings.database_url_var;

        if let Some(found) = from_process(env, test_var) {
            return found;
        }
        if let Some(found) = from_file(file, path, test_var) {
            return found;
        }
        if let Some(found) = from_file(file, path, primary_var) {
            return found;
        }
        from_process(env, primary_var).unwrap_or((None, ConnectionSource::Missing))
    }

    /// Development/production: the process environment wins over the file,
    /// matching dotenv's no-override behavior.
    fn default_connection(
        &self,
        env: &EnvSnapshot,
        file: &HashMap<String, String>,
        path: &Path,
    ) -> (Option<ConnectionDescriptor>, ConnectionSource) {
        let var = &self.settings.database_url_var;
        from_process(env, var)
            .or_else(|| from_file(file, path, var))
            .unwrap_or((None, ConnectionSource::Missing))
    }
}

fn from_process(
    env: &EnvSnapshot,
    var: &str,
) -> Option<(Option<ConnectionDescriptor>, ConnectionSource)> {
    let conn = ConnectionDescriptor::new(env.get(var)?)?;
    Some((
        Some(conn),
        ConnectionSource::ProcessEnv {
            var: var.to_string(),
        },
    ))
}

fn from_file(
    file: &HashMap<String, String>,
    path: &Path,
    var: &str,
) -> Option<(Option<ConnectionDescriptor>, ConnectionSource)> {
    let conn = ConnectionDescriptor::new(non_empty(file.get(var))?)?;
    Some((
        Some(conn),
        ConnectionSource::File {
            path: path.to_path_buf(),
            var: var.to_string(),
        },
    ))
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}
