//! # Item Processor
//!
//! Executes one work item's side-effecting artifact production with an
//! idempotency guard and failure isolation.
//!
//! ## Overview
//!
//! `process` never lets a failure escape: every outcome, including renderer
//! and destination errors, is converted into a [`LogRecord`] so the chunk
//! continues with the next item. The idempotency guard checks for an
//! artifact under the item's deterministic name before doing any work,
//! which makes re-running an already-completed job a no-op for previously
//! produced artifacts.

use std::sync::Arc;
use std::time::Duration;

use crate::destination::DestinationStore;
use crate::logging::log_item_operation;
use crate::models::{ArtifactRef, DestinationHandle, LogRecord, WorkItem};
use crate::renderer::{RenderLayout, ReportRenderer};

/// Outcome of one item attempt, before it is folded into a `LogRecord`.
enum ItemOutcome {
    Produced(ArtifactRef),
    AlreadyExists(String),
}

/// Processes a single work item: idempotency check, render, store.
pub struct ItemProcessor {
    renderer: Arc<dyn ReportRenderer>,
    destination: Arc<dyn DestinationStore>,
    layout: RenderLayout,
    pacing_delay: Duration,
}

impl ItemProcessor {
    pub fn new(
        renderer: Arc<dyn ReportRenderer>,
        destination: Arc<dyn DestinationStore>,
        layout: RenderLayout,
    ) -> Self {
        Self {
            renderer,
            destination,
            layout,
            pacing_delay: Duration::ZERO,
        }
    }

    /// Insert a pacing delay before each render call. The delay counts
    /// against the chunk's wall-clock budget.
    pub fn with_pacing(mut self, pacing_delay: Duration) -> Self {
        self.pacing_delay = pacing_delay;
        self
    }

    /// Process one item against the destination container. Infallible by
    /// contract: failures become `Error` records.
    pub async fn process(&self, item: &WorkItem, destination: &DestinationHandle) -> LogRecord {
        match self.attempt(item, destination).await {
            Ok(ItemOutcome::Produced(artifact)) => {
                log_item_operation("process", &item.id, &item.group_key, "success", None);
                LogRecord::success(item, artifact)
            }
            Ok(ItemOutcome::AlreadyExists(name)) => {
                log_item_operation("process", &item.id, &item.group_key, "skipped", Some(&name));
                LogRecord::skipped(item, &name)
            }
            Err(message) => {
                log_item_operation(
                    "process",
                    &item.id,
                    &item.group_key,
                    "error",
                    Some(&message),
                );
                LogRecord::error(item, message)
            }
        }
    }

    async fn attempt(
        &self,
        item: &WorkItem,
        destination: &DestinationHandle,
    ) -> std::result::Result<ItemOutcome, String> {
        let artifact_name = item.artifact_name();

        let exists = self
            .destination
            .artifact_exists(destination, &artifact_name)
            .await
            .map_err(|e| e.to_string())?;
        if exists {
            return Ok(ItemOutcome::AlreadyExists(artifact_name));
        }

        // Pacing sits directly in front of the quota-limited render call.
        if !self.pacing_delay.is_zero() {
            tokio::time::sleep(self.pacing_delay).await;
        }

        let bytes = self
            .renderer
            .render(item, &self.layout)
            .await
            .map_err(|e| e.to_string())?;

        let artifact = self
            .destination
            .store_artifact(destination, &artifact_name, &bytes)
            .await
            .map_err(|e| e.to_string())?;

        Ok(ItemOutcome::Produced(artifact))
    }
}
