//! Shared fakes for unit and integration tests.
//!
//! These implement the engine's capability traits entirely in memory, with
//! small knobs for simulating the failure modes the engine must survive:
//! stale destination handles, broken resolution, and checkpoint I/O
//! failures.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::checkpoint::{CheckpointStore, InMemoryCheckpointStore};
use crate::destination::DestinationStore;
use crate::error::{BatchError, Result};
use crate::models::{ArtifactRef, Checkpoint, DestinationHandle, TriggerHandle, WorkItem};
use crate::renderer::{RenderError, RenderLayout, ReportRenderer};
use crate::trigger::TriggerScheduler;

/// Generate `n` well-formed source rows.
pub fn source_rows(n: usize) -> Vec<(String, String)> {
    (0..n)
        .map(|i| (format!("item-{i:03}"), format!("group-{}", i % 4)))
        .collect()
}

#[derive(Default)]
struct MemDestinationState {
    containers: HashMap<String, HashMap<String, Vec<u8>>>,
    broken: bool,
}

/// In-memory destination: containers are maps, handles are container
/// names. `break_resolution` makes every resolution call fail until
/// `repair` is called.
#[derive(Default)]
pub struct MemoryDestinationStore {
    state: Mutex<MemDestinationState>,
}

impl MemoryDestinationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a container for test setup, bypassing the fallibility of
    /// the trait method.
    pub async fn resolve(&self, name: &str) -> DestinationHandle {
        self.state
            .lock()
            .containers
            .entry(name.to_string())
            .or_default();
        DestinationHandle(name.to_string())
    }

    pub fn break_resolution(&self) {
        self.state.lock().broken = true;
    }

    pub fn repair(&self) {
        self.state.lock().broken = false;
    }

    /// Drop a container so a previously issued handle goes stale.
    pub fn drop_container(&self, name: &str) {
        self.state.lock().containers.remove(name);
    }

    pub fn artifact_count(&self, container: &str) -> usize {
        self.state
            .lock()
            .containers
            .get(container)
            .map_or(0, HashMap::len)
    }

    /// Pre-seed an artifact, e.g. to exercise the idempotency guard.
    pub fn insert_artifact(&self, container: &str, artifact_name: &str, bytes: &[u8]) {
        self.state
            .lock()
            .containers
            .entry(container.to_string())
            .or_default()
            .insert(artifact_name.to_string(), bytes.to_vec());
    }
}

#[async_trait]
impl DestinationStore for MemoryDestinationStore {
    async fn container_exists(&self, handle: &DestinationHandle) -> Result<bool> {
        let state = self.state.lock();
        if state.broken {
            return Err(BatchError::Destination(
                "destination service unavailable".to_string(),
            ));
        }
        Ok(state.containers.contains_key(handle.as_str()))
    }

    async fn resolve_by_name(&self, name: &str) -> Result<DestinationHandle> {
        let mut state = self.state.lock();
        if state.broken {
            return Err(BatchError::Destination(
                "destination service unavailable".to_string(),
            ));
        }
        state.containers.entry(name.to_string()).or_default();
        Ok(DestinationHandle(name.to_string()))
    }

    async fn artifact_exists(
        &self,
        handle: &DestinationHandle,
        artifact_name: &str,
    ) -> Result<bool> {
        let state = self.state.lock();
        if state.broken {
            return Err(BatchError::Destination(
                "destination service unavailable".to_string(),
            ));
        }
        Ok(state
            .containers
            .get(handle.as_str())
            .is_some_and(|c| c.contains_key(artifact_name)))
    }

    async fn store_artifact(
        &self,
        handle: &DestinationHandle,
        artifact_name: &str,
        bytes: &[u8],
    ) -> Result<ArtifactRef> {
        let mut state = self.state.lock();
        if state.broken {
            return Err(BatchError::Destination(
                "destination service unavailable".to_string(),
            ));
        }
        let container = state
            .containers
            .get_mut(handle.as_str())
            .ok_or_else(|| {
                BatchError::Destination(format!("no such container: {}", handle.as_str()))
            })?;
        container.insert(artifact_name.to_string(), bytes.to_vec());
        Ok(ArtifactRef(format!(
            "mem://{}/{artifact_name}",
            handle.as_str()
        )))
    }
}

/// Renderer stub producing fixed bytes, with optional per-render delay and
/// per-item failure injection.
#[derive(Default)]
pub struct StubRenderer {
    delay: Duration,
    fail_ids: HashSet<String>,
}

impl StubRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every render call, simulating a slow
    /// external renderer. Counts against the chunk time budget.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail rendering for these item ids.
    pub fn failing_for<'a>(mut self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        self.fail_ids = ids.into_iter().map(str::to_string).collect();
        self
    }
}

#[async_trait]
impl ReportRenderer for StubRenderer {
    async fn render(
        &self,
        item: &WorkItem,
        _layout: &RenderLayout,
    ) -> std::result::Result<Vec<u8>, RenderError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_ids.contains(&item.id) {
            return Err(RenderError::Transient(format!(
                "renderer quota exhausted for {}",
                item.id
            )));
        }
        Ok(format!("%PDF-1.4 stub for {}", item.id).into_bytes())
    }
}

#[derive(Default)]
struct ManualSchedulerState {
    pending: Option<TriggerHandle>,
    armed_delays: Vec<Duration>,
    clear_calls: usize,
}

/// Scheduler fake that records arms and clears without any timers; tests
/// drive continuations by calling `run_chunk` themselves.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualSchedulerState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay ever armed, in order.
    pub fn armed_delays(&self) -> Vec<Duration> {
        self.state.lock().armed_delays.clone()
    }

    pub fn clear_calls(&self) -> usize {
        self.state.lock().clear_calls
    }
}

#[async_trait]
impl TriggerScheduler for ManualScheduler {
    async fn clear_all(&self) {
        let mut state = self.state.lock();
        state.pending = None;
        state.clear_calls += 1;
    }

    async fn arm_after(&self, delay: Duration) -> Result<TriggerHandle> {
        let handle = TriggerHandle::firing_after(delay);
        let mut state = self.state.lock();
        state.pending = Some(handle.clone());
        state.armed_delays.push(delay);
        Ok(handle)
    }

    fn pending(&self) -> Option<TriggerHandle> {
        self.state.lock().pending.clone()
    }
}

/// Checkpoint store wrapper with injectable load/save failures.
#[derive(Default)]
pub struct FlakyCheckpointStore {
    inner: InMemoryCheckpointStore,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
}

impl FlakyCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CheckpointStore for FlakyCheckpointStore {
    async fn load(&self) -> Result<Option<Checkpoint>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(BatchError::Checkpoint(
                "simulated load failure".to_string(),
            ));
        }
        self.inner.load().await
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(BatchError::Checkpoint(
                "simulated save failure".to_string(),
            ));
        }
        self.inner.save(checkpoint).await
    }
}
