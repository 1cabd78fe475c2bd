//! # Job Controller
//!
//! Builds the initial worklist (full or sampled), resets the checkpoint
//! and triggers, and arms the first continuation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use crate::checkpoint::CheckpointStore;
use crate::config::BatchConfig;
use crate::destination::DestinationStore;
use crate::error::{BatchError, Result};
use crate::models::{Checkpoint, WorkItem};
use crate::orchestration::sampler::sample_items;
use crate::trigger::TriggerScheduler;

/// Starts a job run: fresh checkpoint at cursor zero, singleton trigger
/// armed after the kickoff delay.
pub struct JobController {
    config: BatchConfig,
    checkpoints: Arc<dyn CheckpointStore>,
    triggers: Arc<dyn TriggerScheduler>,
    destination: Arc<dyn DestinationStore>,
}

impl JobController {
    pub fn new(
        config: BatchConfig,
        checkpoints: Arc<dyn CheckpointStore>,
        triggers: Arc<dyn TriggerScheduler>,
        destination: Arc<dyn DestinationStore>,
    ) -> Self {
        Self {
            config,
            checkpoints,
            triggers,
            destination,
        }
    }

    /// Start a run over the given source rows. With `sample_size`, a
    /// uniform sample without replacement is drawn instead of the full
    /// list (dry-run mode). Failures surface synchronously; nothing is
    /// written to the log sink.
    pub async fn start(
        &self,
        source_rows: Vec<(String, String)>,
        sample_size: Option<usize>,
    ) -> Result<()> {
        self.start_with_rng(source_rows, sample_size, &mut StdRng::from_entropy())
            .await
    }

    /// `start` with a caller-supplied RNG so sampled runs are
    /// deterministic under a seeded generator.
    pub async fn start_with_rng<R: Rng + ?Sized>(
        &self,
        source_rows: Vec<(String, String)>,
        sample_size: Option<usize>,
        rng: &mut R,
    ) -> Result<()> {
        if source_rows.is_empty() {
            return Err(BatchError::Configuration(
                "source list is missing or empty".to_string(),
            ));
        }

        let mut worklist = build_worklist(source_rows);
        if worklist.is_empty() {
            return Err(BatchError::Configuration(
                "source list contains no well-formed rows".to_string(),
            ));
        }
        if let Some(sample_size) = sample_size {
            worklist = sample_items(worklist, sample_size, rng);
        }

        let destination = self
            .destination
            .resolve_by_name(&self.config.destination_name)
            .await?;

        let checkpoint = Checkpoint::new(worklist, destination);
        self.checkpoints.save(&checkpoint).await?;

        self.triggers.clear_all().await;
        self.triggers.arm_after(self.config.kickoff_delay).await?;

        tracing::info!(
            total = checkpoint.total,
            sampled = sample_size.is_some(),
            destination = %checkpoint.destination.as_str(),
            "🚀 JOB_START: worklist checkpointed, kickoff continuation armed"
        );
        Ok(())
    }
}

/// Rows with an empty id or group key are excluded before worklist
/// construction; ordering is insertion order from the source.
fn build_worklist(source_rows: Vec<(String, String)>) -> Vec<WorkItem> {
    source_rows
        .into_iter()
        .filter(|(id, group_key)| !id.trim().is_empty() && !group_key.trim().is_empty())
        .map(|(id, group_key)| WorkItem::new(id, group_key))
        .collect()
}
