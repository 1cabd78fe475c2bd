//! # Batch Executor
//!
//! Processes one chunk of the worklist per invocation, persisting progress
//! and either finalizing the job or re-arming its continuation.
//!
//! ## Overview
//!
//! Each continuation invokes [`BatchExecutor::run_chunk`], which walks the
//! worklist from the checkpoint cursor until the chunk-size cap or the
//! wall-clock time budget is reached, whichever comes first. The chunk-size
//! cap bounds throughput per window for rate-limit safety; the time budget
//! keeps a single execution inside its bounded window. What happens next is
//! chosen by the pure [`continuation_decision`] step and applied through
//! the injected trigger scheduler.
//!
//! ## Error policy
//!
//! Item failures never escalate: the processor converts them into `Error`
//! records. Chunk-level failures (checkpoint I/O, unrecoverable
//! destination) abort only the current chunk; before surfacing them the
//! executor re-arms a retry continuation so the job resumes from the last
//! persisted cursor instead of stranding. There is no bounded retry count:
//! a persistently broken resource shows up as repeated absence of progress
//! in the log.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::checkpoint::CheckpointStore;
use crate::config::BatchConfig;
use crate::destination::DestinationStore;
use crate::error::Result;
use crate::logging::{log_chunk_operation, log_error};
use crate::models::{Checkpoint, LogRecord};
use crate::orchestration::processor::ItemProcessor;
use crate::sink::LogSink;
use crate::trigger::TriggerScheduler;

/// What the engine does after a chunk: schedule another continuation or
/// finalize the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationDecision {
    ArmAfter(Duration),
    Finalize,
}

/// Result of one `run_chunk` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// No checkpoint exists; nothing to resume.
    NothingToResume,
    /// A full or final-partial chunk was processed and a cooldown
    /// continuation armed.
    Progressed { processed: usize, cursor: usize },
    /// The time budget fired; progress persisted and a longer continuation
    /// armed so external quota can recover.
    Interrupted { processed: usize, cursor: usize },
    /// The cursor reached the end; terminal record appended, no
    /// continuation pending.
    Completed { total: usize },
}

/// Pure decision step: given the post-chunk checkpoint and whether the
/// budget fired, pick the continuation.
pub fn continuation_decision(
    config: &BatchConfig,
    checkpoint: &Checkpoint,
    interrupted: bool,
) -> ContinuationDecision {
    if interrupted {
        ContinuationDecision::ArmAfter(config.interrupted_delay)
    } else if checkpoint.is_complete() {
        ContinuationDecision::Finalize
    } else {
        ContinuationDecision::ArmAfter(config.cooldown_delay)
    }
}

/// Chunk execution engine; one instance per job host.
pub struct BatchExecutor {
    config: BatchConfig,
    checkpoints: Arc<dyn CheckpointStore>,
    triggers: Arc<dyn TriggerScheduler>,
    destination: Arc<dyn DestinationStore>,
    processor: ItemProcessor,
    sink: Arc<dyn LogSink>,
}

impl BatchExecutor {
    pub fn new(
        config: BatchConfig,
        checkpoints: Arc<dyn CheckpointStore>,
        triggers: Arc<dyn TriggerScheduler>,
        destination: Arc<dyn DestinationStore>,
        processor: ItemProcessor,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            config,
            checkpoints,
            triggers,
            destination,
            processor,
            sink,
        }
    }

    /// Process the next chunk of the worklist.
    pub async fn run_chunk(&self) -> Result<ChunkOutcome> {
        // A stray duplicate trigger must not double-process this chunk.
        self.triggers.clear_all().await;

        let loaded = match self.checkpoints.load().await {
            Ok(loaded) => loaded,
            Err(e) => {
                self.rearm_for_retry(&e).await;
                return Err(e);
            }
        };
        let Some(mut checkpoint) = loaded else {
            tracing::debug!("no checkpoint found; nothing to resume");
            return Ok(ChunkOutcome::NothingToResume);
        };

        if let Err(e) = self.ensure_destination(&mut checkpoint).await {
            self.rearm_for_retry(&e).await;
            return Err(e);
        }

        let started = Instant::now();
        let mut cursor = checkpoint.cursor;
        let mut processed = 0usize;
        let mut interrupted = false;

        while cursor < checkpoint.total {
            if started.elapsed() > self.config.time_budget {
                interrupted = true;
                break;
            }
            let record = self
                .processor
                .process(&checkpoint.worklist[cursor], &checkpoint.destination)
                .await;
            self.append_record(record).await;
            cursor += 1;
            processed += 1;
            if processed >= self.config.chunk_size {
                break;
            }
        }

        checkpoint.cursor = cursor;
        if let Err(e) = self.checkpoints.save(&checkpoint).await {
            self.rearm_for_retry(&e).await;
            return Err(e);
        }

        match continuation_decision(&self.config, &checkpoint, interrupted) {
            ContinuationDecision::Finalize => {
                self.append_record(LogRecord::complete(checkpoint.total)).await;
                self.triggers.clear_all().await;
                log_chunk_operation(
                    "run_chunk",
                    cursor,
                    checkpoint.total,
                    processed,
                    "completed",
                    None,
                );
                Ok(ChunkOutcome::Completed {
                    total: checkpoint.total,
                })
            }
            ContinuationDecision::ArmAfter(delay) => {
                self.triggers.clear_all().await;
                self.triggers.arm_after(delay).await?;
                let status = if interrupted { "interrupted" } else { "progressed" };
                log_chunk_operation("run_chunk", cursor, checkpoint.total, processed, status, None);
                if interrupted {
                    Ok(ChunkOutcome::Interrupted { processed, cursor })
                } else {
                    Ok(ChunkOutcome::Progressed { processed, cursor })
                }
            }
        }
    }

    /// Step-3 recovery: a stale destination handle is re-resolved by name
    /// and the corrected handle persisted. Only a failed recovery aborts
    /// the chunk.
    async fn ensure_destination(&self, checkpoint: &mut Checkpoint) -> Result<()> {
        let accessible = self
            .destination
            .container_exists(&checkpoint.destination)
            .await
            .unwrap_or(false);
        if accessible {
            return Ok(());
        }

        let handle = self
            .destination
            .resolve_by_name(&self.config.destination_name)
            .await?;
        if handle != checkpoint.destination {
            tracing::warn!(
                stale = %checkpoint.destination.as_str(),
                resolved = %handle.as_str(),
                "destination handle was stale; re-resolved by name"
            );
            checkpoint.destination = handle;
            self.checkpoints.save(checkpoint).await?;
        }
        Ok(())
    }

    async fn append_record(&self, record: LogRecord) {
        let item_id = record.item_id.clone();
        if let Err(e) = self.sink.append(record).await {
            log_error("batch_executor", "append_record", &e.to_string(), Some(&item_id));
        }
    }

    /// On a chunk-level failure the firing trigger is already cleared, so
    /// without a new continuation the job would strand. Arm the retry
    /// before surfacing the error; keep the original error if arming also
    /// fails.
    async fn rearm_for_retry(&self, cause: &crate::error::BatchError) {
        log_error("batch_executor", "run_chunk", &cause.to_string(), None);
        self.triggers.clear_all().await;
        if let Err(arm_err) = self.triggers.arm_after(self.config.cooldown_delay).await {
            log_error(
                "batch_executor",
                "rearm_for_retry",
                &arm_err.to_string(),
                None,
            );
        }
    }
}
