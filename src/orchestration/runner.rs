//! # Job Runner
//!
//! Hosts a job end to end: wires the controller, executor, and the
//! continuation channel together and exposes the manual entry points.
//!
//! ## Overview
//!
//! The engine itself is re-entrant only through continuations; `BatchJob`
//! is the in-process host that receives fired continuations and invokes
//! the executor, modeling the external scheduler of the deployment
//! environment. Each received continuation is one independent execution
//! resuming from persisted state.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::checkpoint::CheckpointStore;
use crate::config::BatchConfig;
use crate::destination::DestinationStore;
use crate::error::Result;
use crate::logging::log_error;
use crate::orchestration::controller::JobController;
use crate::orchestration::executor::{BatchExecutor, ChunkOutcome};
use crate::orchestration::processor::ItemProcessor;
use crate::renderer::{RenderLayout, ReportRenderer};
use crate::sink::LogSink;
use crate::trigger::{Continuation, TokioTriggerScheduler, TriggerScheduler};

/// An assembled job host: controller + executor + continuation loop.
pub struct BatchJob {
    controller: JobController,
    executor: Arc<BatchExecutor>,
    triggers: Arc<TokioTriggerScheduler>,
    continuations: mpsc::Receiver<Continuation>,
}

impl BatchJob {
    /// Assemble a job host from its capabilities.
    pub fn new(
        config: BatchConfig,
        checkpoints: Arc<dyn CheckpointStore>,
        destination: Arc<dyn DestinationStore>,
        renderer: Arc<dyn ReportRenderer>,
        layout: RenderLayout,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        let (triggers, continuations) = TokioTriggerScheduler::channel(8);
        let triggers = Arc::new(triggers);

        let processor = ItemProcessor::new(renderer, Arc::clone(&destination), layout)
            .with_pacing(config.pacing_delay);
        let controller = JobController::new(
            config.clone(),
            Arc::clone(&checkpoints),
            triggers.clone() as Arc<dyn TriggerScheduler>,
            Arc::clone(&destination),
        );
        let executor = Arc::new(BatchExecutor::new(
            config,
            checkpoints,
            triggers.clone() as Arc<dyn TriggerScheduler>,
            destination,
            processor,
            sink,
        ));

        Self {
            controller,
            executor,
            triggers,
            continuations,
        }
    }

    /// Manual entry point: start a run over the full source list.
    pub async fn start_full_run(&self, source_rows: Vec<(String, String)>) -> Result<()> {
        self.controller.start(source_rows, None).await
    }

    /// Manual entry point: start a sampled dry run of `sample_size` items.
    pub async fn start_sample_run(
        &self,
        source_rows: Vec<(String, String)>,
        sample_size: usize,
    ) -> Result<()> {
        self.controller.start(source_rows, Some(sample_size)).await
    }

    /// Manual entry point: force progress without waiting for the next
    /// scheduled continuation.
    pub async fn force_run_chunk(&self) -> Result<ChunkOutcome> {
        self.executor.run_chunk().await
    }

    /// The currently pending continuation, if any.
    pub fn pending_trigger(&self) -> Option<crate::models::TriggerHandle> {
        self.triggers.pending()
    }

    /// Receive continuations and run chunks until the job finalizes.
    ///
    /// Chunk-level failures are logged and absorbed here: the executor has
    /// already re-armed a retry continuation, so the loop simply waits for
    /// it to fire.
    pub async fn run_until_complete(&mut self) -> Result<ChunkOutcome> {
        loop {
            let Some(_continuation) = self.continuations.recv().await else {
                // Scheduler dropped; treat as a finished host.
                return Ok(ChunkOutcome::NothingToResume);
            };
            match self.executor.run_chunk().await {
                Ok(outcome @ ChunkOutcome::Completed { .. }) => return Ok(outcome),
                Ok(ChunkOutcome::NothingToResume) => return Ok(ChunkOutcome::NothingToResume),
                Ok(_) => {}
                Err(e) => {
                    log_error("batch_job", "run_until_complete", &e.to_string(), None);
                }
            }
        }
    }
}
