//! Recording fakes for tests.
//!
//! Enabled for this crate's own tests and, for downstream crates, through
//! the `testing` feature.

use async_trait::async_trait;
use oliviagold_logging::{format_status, Severity, StatusReporter};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::client::{Connector, DbClient, SequenceReset};
use crate::descriptor::ConnectionDescriptor;
use crate::error::DbError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// A call received by [`RecordingClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    CurrentDatabase,
    DeleteAll(String),
    ResetSequence(String),
    ResetSchema(String),
    Disconnect,
}

/// In-memory [`DbClient`] that records every call.
#[derive(Debug, Default)]
pub struct RecordingClient {
    database: String,
    rows: HashMap<String, u64>,
    delete_failures: HashMap<String, String>,
    sequences: HashMap<String, SequenceReset>,
    schema_failure: Option<String>,
    identity_failure: Option<String>,
    calls: Mutex<Vec<ClientCall>>,
}

impl RecordingClient {
    /// A client whose server reports `database` as its current database.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    /// Rows `delete_all(table)` reports. Unlisted tables report zero.
    pub fn with_rows(mut self, table: &str, rows: u64) -> Self {
        self.rows.insert(table.to_string(), rows);
        self
    }

    pub fn fail_delete(mut self, table: &str, message: &str) -> Self {
        self.delete_failures
            .insert(table.to_string(), message.to_string());
        self
    }

    /// Sequence outcome for `table`. Unlisted tables are skipped.
    pub fn with_sequence(mut self, table: &str, outcome: SequenceReset) -> Self {
        self.sequences.insert(table.to_string(), outcome);
        self
    }

    pub fn fail_schema_reset(mut self, message: &str) -> Self {
        self.schema_failure = Some(message.to_string());
        self
    }

    /// Fail `current_database()` with `message`.
    pub fn fail_current_database(mut self, message: &str) -> Self {
        self.identity_failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ClientCall> {
        lock(&self.calls).clone()
    }

    /// Tables `delete_all` was called on, in call order.
    pub fn deleted_tables(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                ClientCall::DeleteAll(table) => Some(table.clone()),
                _ => None,
            })
            .collect()
    }

    /// Whether any data-mutating call was received.
    pub fn mutated(&self) -> bool {
        lock(&self.calls).iter().any(|call| {
            matches!(
                call,
                ClientCall::DeleteAll(_) | ClientCall::ResetSequence(_) | ClientCall::ResetSchema(_)
            )
        })
    }

    fn record(&self, call: ClientCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl DbClient for RecordingClient {
    async fn current_database(&self) -> Result<String, DbError> {
        self.record(ClientCall::CurrentDatabase);
        match &self.identity_failure {
            Some(message) => Err(DbError::client(message.clone())),
            None => Ok(self.database.clone()),
        }
    }

    async fn delete_all(&self, table: &str) -> Result<u64, DbError> {
        self.record(ClientCall::DeleteAll(table.to_string()));
        if let Some(message) = self.delete_failures.get(table) {
            return Err(DbError::client(message.clone()));
        }
        Ok(self.rows.get(table).copied().unwrap_or(0))
    }

    async fn reset_sequence(&self, table: &str) -> SequenceReset {
        self.record(ClientCall::ResetSequence(table.to_string()));
        self.sequences
            .get(table)
            .cloned()
            .unwrap_or_else(|| SequenceReset::Skipped("no serial sequence".to_string()))
    }

    async fn reset_schema(&self, schema: &str) -> Result<(), DbError> {
        self.record(ClientCall::ResetSchema(schema.to_string()));
        match &self.schema_failure {
            Some(message) => Err(DbError::client(message.clone())),
            None => Ok(()),
        }
    }

    async fn disconnect(&self) {
        self.record(ClientCall::Disconnect);
    }
}

/// [`Connector`] handing out one shared [`RecordingClient`].
#[derive(Debug, Clone)]
pub struct RecordingConnector {
    client: Arc<RecordingClient>,
    refuse: Option<String>,
    connects: Arc<Mutex<Vec<String>>>,
}

impl RecordingConnector {
    pub fn new(client: RecordingClient) -> Self {
        Self {
            client: Arc::new(client),
            refuse: None,
            connects: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail every connection attempt with `message`.
    pub fn refusing(mut self, message: &str) -> Self {
        self.refuse = Some(message.to_string());
        self
    }

    pub fn client(&self) -> &RecordingClient {
        &self.client
    }

    /// Redacted descriptors passed to `connect`.
    pub fn connections(&self) -> Vec<String> {
        lock(&self.connects).clone()
    }
}

#[async_trait]
impl Connector for RecordingConnector {
    async fn connect(
        &self,
        connection: &ConnectionDescriptor,
    ) -> Result<Arc<dyn DbClient>, DbError> {
        lock(&self.connects).push(connection.redacted());
        if let Some(message) = &self.refuse {
            return Err(DbError::client(message.clone()));
        }
        let client: Arc<dyn DbClient> = self.client.clone();
        Ok(client)
    }
}

/// [`StatusReporter`] that keeps every line in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    lines: Mutex<Vec<(Severity, String)>>,
}

impl RecordingReporter {
    /// Every reported line in order, with its severity.
    pub fn entries(&self) -> Vec<(Severity, String)> {
        lock(&self.lines).clone()
    }

    /// Rendered lines, marker included.
    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines)
            .iter()
            .map(|(severity, message)| format_status(*severity, message))
            .collect()
    }

    /// Whether a line of `severity` contains `needle`.
    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        lock(&self.lines)
            .iter()
            .any(|(s, message)| *s == severity && message.contains(needle))
    }

    pub fn any(&self, severity: Severity) -> bool {
        lock(&self.lines).iter().any(|(s, _)| *s == severity)
    }
}

impl StatusReporter for RecordingReporter {
    fn report(&self, severity: Severity, message: &str) {
        lock(&self.lines).push((severity, message.to_string()));
    }
}
