//! In-process implementations of the port traits.
//!
//! [`StaticSecretStore`] and [`LogSink`] back local runs where no cloud
//! project is available. [`RecordingSink`] and the failure modes of
//! [`StaticSecretStore`] exist for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::info;

use crate::{
    AnalyticsSink, NormalizedRecord, Secret, SecretName, SecretStore, SecretStoreError,
    SecretVersion, SinkError,
};

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// Secret store backed by an in-memory table.
#[derive(Debug, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<(String, SecretVersion), Secret>,
    outage: Option<String>,
    fetches: AtomicUsize,
}

impl StaticSecretStore {
    /// Creates an empty store. Every lookup fails with
    /// [`SecretStoreError::NotFound`] until secrets are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose every lookup fails with
    /// [`SecretStoreError::Unavailable`].
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            outage: Some(message.into()),
            ..Self::default()
        }
    }

    /// Adds `bytes` under `name` at `version`.
    pub fn with_secret(
        mut self,
        name: &SecretName,
        version: SecretVersion,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        self.secrets
            .insert((name.as_str().to_string(), version), Secret::new(bytes));
        self
    }

    /// Number of lookups served so far, successful or not.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn fetch_secret(
        &self,
        name: &SecretName,
        version: SecretVersion,
    ) -> Result<Secret, SecretStoreError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);

        if let Some(message) = &self.outage {
            return Err(SecretStoreError::Unavailable {
                message: message.clone(),
            });
        }

        self.secrets
            .get(&(name.as_str().to_string(), version))
            .cloned()
            .ok_or_else(|| SecretStoreError::NotFound {
                name: name.to_string(),
                version: version.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Sink that writes each record to the log stream instead of a database.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl AnalyticsSink for LogSink {
    async fn deliver_record(&self, record: &NormalizedRecord) -> Result<(), SinkError> {
        info!(
            event_type = %record.event_type,
            id = %record.id,
            metadata = %record.metadata,
            time_created = %record.time_created,
            msg_id = %record.msg_id,
            source = %record.source,
            "Record delivered"
        );
        Ok(())
    }
}

/// Sink that keeps every delivered record in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<NormalizedRecord>>,
    rejection: Option<String>,
}

impl RecordingSink {
    /// Creates a sink that accepts every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink that rejects every record with `message`.
    pub fn rejecting(message: impl Into<String>) -> Self {
        Self {
            records: Mutex::default(),
            rejection: Some(message.into()),
        }
    }

    /// Returns a copy of the records delivered so far.
    pub fn records(&self) -> Vec<NormalizedRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AnalyticsSink for RecordingSink {
    async fn deliver_record(&self, record: &NormalizedRecord) -> Result<(), SinkError> {
        if let Some(message) = &self.rejection {
            return Err(SinkError::Rejected {
                msg_id: record.msg_id.clone(),
                message: message.clone(),
            });
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}
