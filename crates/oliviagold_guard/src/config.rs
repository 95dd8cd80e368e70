//! TOML configuration for the guard.
//!
//! Every section is optional; an absent file means built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::env::{EnvironmentResolver, EnvironmentSettings};
use crate::error::{GuardError, Result};
use crate::identity::{IdentityRules, IdentityValidator};
use crate::plan::{DeletionPlan, DeletionStep};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_FILE: &str = "oliviagold-guard.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    pub test_marker: String,
    pub development_identifier: String,
    /// Confirm the server-reported database name after connecting.
    pub live_check: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        let rules = IdentityRules::default();
        Self {
            test_marker: rules.test_marker,
            development_identifier: rules.development_identifier,
            live_check: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuardConfig {
    pub environment: EnvironmentSettings,
    pub identity: IdentityConfig,
    /// Custom deletion steps; empty means the built-in storefront plan.
    pub deletion: Vec<DeletionStep>,
}

impl GuardConfig {
    pub fn from_toml_str(raw: &str, path: &Path) -> Result<Self> {
        let config: GuardConfig = toml::from_str(raw).map_err(|source| GuardError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(GuardError::ConfigMissing(path.to_path_buf()))
            }
            Err(err) => return Err(err.into()),
        };
        debug!(path = %path.display(), "Loaded guard config");
        Self::from_toml_str(&raw, path)
    }

    /// Load `explicit` (which must exist), else [`DEFAULT_FILE`] under
    /// `base_dir` if present, else defaults.
    pub fn load_or_default(explicit: Option<&Path>, base_dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = base_dir.join(DEFAULT_FILE);
        if candidate.is_file() {
            return Self::load(&candidate);
        }
        debug!("No guard config file, using defaults");
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    pub fn rules(&self) -> IdentityRules {
        IdentityRules::new(
            self.identity.test_marker.clone(),
            self.identity.development_identifier.clone(),
        )
    }

    pub fn validator(&self) -> IdentityValidator {
        IdentityValidator::new(self.rules())
    }

    pub fn resolver(&self, base_dir: impl Into<PathBuf>) -> EnvironmentResolver {
        EnvironmentResolver::new(self.environment.clone()).with_base_dir(base_dir)
    }

    pub fn deletion_plan(&self) -> Result<DeletionPlan> {
        if self.deletion.is_empty() {
            return Ok(DeletionPlan::shop_default());
        }
        Ok(DeletionPlan::new(self.deletion.clone())?)
    }

    fn validate(&self) -> Result<()> {
        self.rules().validate()?;
        let env = &self.environment;
        for (name, value) in [
            ("mode_var", &env.mode_var),
            ("database_url_var", &env.database_url_var),
            ("test_database_url_var", &env.test_database_url_var),
        ] {
            if value.trim().is_empty() {
                return Err(GuardError::InvalidRules(format!(
                    "environment.{} must not be empty",
                    name
                )));
            }
        }
        if !self.deletion.is_empty() {
            DeletionPlan::new(self.deletion.clone())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanError;
    use tempfile::TempDir;

    fn parse(raw: &str) -> Result<GuardConfig> {
        GuardConfig::from_toml_str(raw, Path::new("guard.toml"))
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = parse("").unwrap();
        assert_eq!(config, GuardConfig::default());
        assert!(config.identity.live_check);
        assert_eq!(config.deletion_plan().unwrap().len(), DeletionPlan::shop_default().len());
    }

    #[test]
    fn test_partial_sections() {
        let config = parse(
            r#"
            [environment]
            mode_var = "APP_ENV"
            test_source = "config/test.env"

            [identity]
            live_check = false
            "#,
        )
        .unwrap();

        assert_eq!(config.environment.mode_var, "APP_ENV");
        assert_eq!(config.environment.database_url_var, "DATABASE_URL");
        assert_eq!(config.environment.test_source, PathBuf::from("config/test.env"));
        assert!(!config.identity.live_check);
        assert_eq!(config.identity.test_marker, "_test");
    }

    #[test]
    fn test_custom_deletion_plan() {
        let config = parse(
            r#"
            [[deletion]]
            entity = "customers"
            table = "customers"

            [[deletion]]
            entity = "orders"
            table = "orders"
            depends_on = ["customers"]
            "#,
        )
        .unwrap();

        let plan = config.deletion_plan().unwrap();
        let order: Vec<&str> = plan.ordered().map(|s| s.table.as_str()).collect();
        assert_eq!(order, vec!["orders", "customers"]);
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(matches!(
            parse("[identity]\nunknown = 1\n"),
            Err(GuardError::ConfigParse { .. })
        ));
        assert!(matches!(
            parse("[identity]\ntest_marker = \"\"\n"),
            Err(GuardError::InvalidRules(_))
        ));
        assert!(matches!(
            parse("[environment]\nmode_var = \" \"\n"),
            Err(GuardError::InvalidRules(_))
        ));
        assert!(matches!(
            parse("[[deletion]]\nentity = \"a\"\ntable = \"a\"\ndepends_on = [\"b\"]\n"),
            Err(GuardError::Plan(PlanError::UnknownDependency { .. }))
        ));
    }

    #[test]
    fn test_load_or_default() {
        let dir = TempDir::new().unwrap();
        let config = GuardConfig::load_or_default(None, dir.path()).unwrap();
        assert_eq!(config, GuardConfig::default());

        std::fs::write(
            dir.path().join(DEFAULT_FILE),
            "[identity]\ndevelopment_identifier = \"olivia_dev\"\n",
        )
        .unwrap();
        let config = GuardConfig::load_or_default(None, dir.path()).unwrap();
        assert_eq!(config.identity.development_identifier, "olivia_dev");

        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            GuardConfig::load_or_default(Some(&missing), dir.path()),
            Err(GuardError::ConfigMissing(_))
        ));
    }
}
