//! Test-database safety guard for Olivia Gold maintenance operations
//!
//! Seed, reset and bulk-delete routines must never touch the development or
//! production database. This crate resolves the runtime mode and connection
//! string once, validates the target's identity, and only then lets
//! destructive statements through.
//!
//! # Usage
//!
//! ```rust,ignore
//! use oliviagold_guard::{
//!     DestructiveGate, EnvSnapshot, GateOptions, GuardConfig, PgClient, Preflight,
//! };
//!
//! let config = GuardConfig::load_or_default(None, Path::new("."))?;
//! let resolved = config.resolver(".").resolve(&EnvSnapshot::capture())?;
//! let mut preflight = Preflight::run(resolved, config.validator(), &reporter);
//!
//! let conn = preflight.connection().expect("validated");
//! let client = PgClient::connect(conn).await?;
//! preflight.confirm_live(&client, &reporter).await?;
//!
//! let mut gate = DestructiveGate::new(&client, &reporter, GateOptions::default());
//! let report = gate.wipe(preflight.verdict(), &config.deletion_plan()?).await?;
//! ```

mod error;

pub mod client;
pub mod config;
pub mod descriptor;
pub mod env;
pub mod gate;
pub mod identity;
pub mod plan;
pub mod preflight;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::{Connector, DbClient, PgClient, PgConnector, SequenceReset};
pub use config::{GuardConfig, IdentityConfig};
pub use descriptor::{redact, ConnectionDescriptor};
pub use env::{
    load_config, ConnectionSource, EnvSnapshot, EnvironmentResolver, EnvironmentSettings,
    ResolvedEnvironment, RuntimeMode,
};
pub use error::{DbError, GuardError, Result};
pub use gate::{
    DestructiveGate, GateError, GateOptions, GatePhase, GateReport, SequenceReport, StepReport,
};
pub use identity::{IdentityRules, IdentityValidator, Rejection, Rule, RuleCheck, Verdict, Warning};
pub use plan::{DeletionPlan, DeletionStep, PlanError};
pub use preflight::Preflight;
