//! Olivia Gold Test Utilities
//!
//! Bootstrap for test runners, dotenv fixtures, recording fakes
//! and a Docker-backed PostgreSQL pool.
//!
//! # Features
//!
//! - `docker-tests`: Enable tests that require Docker containers
//!
//! # Usage
//!
//! ```rust,ignore
//! use oliviagold_test_utils::{bootstrap_test_database, RecordingReporter};
//! use oliviagold_guard::{EnvSnapshot, GuardConfig, PgConnector};
//!
//! let reporter = RecordingReporter::default();
//! let db = bootstrap_test_database(
//!     &GuardConfig::default(),
//!     Path::new("."),
//!     &EnvSnapshot::capture(),
//!     &PgConnector,
//!     &reporter,
//! )
//! .await?;
//! db.reset(&reporter).await?;
//! ```

pub mod bootstrap;
pub mod config;
pub mod containers;
pub mod env;
pub mod pools;
pub mod schema;

// Re-exports for convenience
pub use bootstrap::{bootstrap_test_database, BootstrapError, TestDatabase};
pub use config::TestDbConfig;
pub use containers::lifecycle::{ensure_container_running, wait_for_healthy};
pub use env::EnvFixture;
pub use oliviagold_guard::testing::{
    ClientCall, RecordingClient, RecordingConnector, RecordingReporter,
};
pub use pools::postgres::TestPgPool;
