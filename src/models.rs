//! # Core Data Model
//!
//! Types shared across the engine: the work item and its worklist, the
//! persisted checkpoint, trigger handles, and the append-only log record.
//!
//! ## Lifecycle
//!
//! A `Checkpoint` is created by the job controller, mutated only by the
//! batch executor, and implicitly ends once `cursor >= total`; the next
//! controller invocation simply overwrites it. A `TriggerHandle` is created
//! by the controller or executor and destroyed either by the next clear-all
//! step or by the finalization path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// One entry of work; identity is `id`, ordering is insertion order from
/// the source list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub group_key: String,
}

impl WorkItem {
    pub fn new(id: impl Into<String>, group_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group_key: group_key.into(),
        }
    }

    /// Deterministic artifact name for this item.
    ///
    /// Re-running a completed job computes the same name and finds the
    /// existing artifact, which is what makes the idempotency guard work.
    /// The digest keeps distinct items with filesystem-hostile ids from
    /// colliding after sanitization.
    pub fn artifact_name(&self) -> String {
        let digest = fnv1a(format!("{}\u{1f}{}", self.id, self.group_key).as_bytes());
        let safe_id: String = self
            .id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        format!("{safe_id}-{digest:08x}.pdf")
    }
}

/// 32-bit FNV-1a; stable across processes, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in bytes {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Opaque reference to a resolved destination container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationHandle(pub String);

impl DestinationHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Opaque reference to a stored artifact (path or URL, depending on the
/// destination implementation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef(pub String);

impl ArtifactRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Persisted progress marker enabling resumption across executions.
///
/// Invariant: `0 <= cursor <= total == worklist.len()`, and `cursor` is
/// monotonically non-decreasing over the job's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Ordered worklist, immutable once stored for a job run.
    pub worklist: Vec<WorkItem>,
    /// Index of the next unprocessed item.
    pub cursor: usize,
    /// Length of the worklist, denormalized for log readability.
    pub total: usize,
    /// Last known handle to the destination container. May go stale; the
    /// executor re-resolves by name and persists the correction.
    pub destination: DestinationHandle,
}

impl Checkpoint {
    pub fn new(worklist: Vec<WorkItem>, destination: DestinationHandle) -> Self {
        let total = worklist.len();
        Self {
            worklist,
            cursor: 0,
            total,
            destination,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.total
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.cursor)
    }
}

/// A scheduled future invocation of the batch executor.
///
/// Carries only enough to find the pending continuation again; at most one
/// handle exists for a job at any instant, enforced by clear-then-arm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerHandle {
    pub id: Uuid,
    pub fire_at: DateTime<Utc>,
}

impl TriggerHandle {
    pub fn firing_after(delay: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            fire_at: Utc::now()
                + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero()),
        }
    }
}

/// Outcome classification for one processed item (or the terminal record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Artifact was produced and stored.
    Success,
    /// Artifact already existed; no work re-done.
    Skipped,
    /// Item processing failed; the job continued with the next item.
    Error,
    /// Terminal record appended once the cursor reaches the end.
    Complete,
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordStatus::Success => write!(f, "success"),
            RecordStatus::Skipped => write!(f, "skipped"),
            RecordStatus::Error => write!(f, "error"),
            RecordStatus::Complete => write!(f, "complete"),
        }
    }
}

/// One row of the operator-visible append-only log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub item_id: String,
    pub group_key: String,
    pub status: RecordStatus,
    pub message: String,
    pub artifact_ref: Option<ArtifactRef>,
}

impl LogRecord {
    pub fn success(item: &WorkItem, artifact: ArtifactRef) -> Self {
        Self {
            timestamp: Utc::now(),
            item_id: item.id.clone(),
            group_key: item.group_key.clone(),
            status: RecordStatus::Success,
            message: format!("stored {}", artifact.as_str()),
            artifact_ref: Some(artifact),
        }
    }

    pub fn skipped(item: &WorkItem, artifact_name: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            item_id: item.id.clone(),
            group_key: item.group_key.clone(),
            status: RecordStatus::Skipped,
            message: format!("artifact {artifact_name} already exists"),
            artifact_ref: None,
        }
    }

    pub fn error(item: &WorkItem, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            item_id: item.id.clone(),
            group_key: item.group_key.clone(),
            status: RecordStatus::Error,
            message: message.into(),
            artifact_ref: None,
        }
    }

    pub fn complete(total: usize) -> Self {
        Self {
            timestamp: Utc::now(),
            item_id: String::new(),
            group_key: String::new(),
            status: RecordStatus::Complete,
            message: format!("processed {total} items"),
            artifact_ref: None,
        }
    }
}
