//! # Log Sink
//!
//! Append-only structured record stream exposed to operators: one record
//! per processed item plus one terminal `Complete` record per job.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;
use crate::models::LogRecord;

/// Capability for appending log records.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn append(&self, record: LogRecord) -> Result<()>;
}

/// Sink that emits each record as a structured tracing event.
#[derive(Debug, Default, Clone)]
pub struct TracingLogSink;

impl TracingLogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LogSink for TracingLogSink {
    async fn append(&self, record: LogRecord) -> Result<()> {
        tracing::info!(
            item_id = %record.item_id,
            group_key = %record.group_key,
            status = %record.status,
            message = %record.message,
            artifact_ref = record.artifact_ref.as_ref().map(|a| a.as_str()),
            timestamp = %record.timestamp.to_rfc3339(),
            "📋 LOG_RECORD"
        );
        Ok(())
    }
}

/// In-memory sink for asserting on the record stream in tests.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl LogSink for MemoryLogSink {
    async fn append(&self, record: LogRecord) -> Result<()> {
        self.records.lock().push(record);
        Ok(())
    }
}
