#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Batchrun Core
//!
//! Resumable chunked-batch execution engine for worklists too large to
//! finish inside one bounded execution window.
//!
//! ## Overview
//!
//! A job is split into chunks. Each chunk runs inside a bounded window,
//! persists its progress to a checkpoint, and re-arms a single scheduled
//! continuation so the job resumes automatically until complete. Items are
//! processed strictly in worklist order, each behind an idempotency guard
//! that makes re-runs of completed work a no-op, and each with its failure
//! isolated to an `Error` log record.
//!
//! ## Architecture
//!
//! Every external effect sits behind an injected capability trait:
//! checkpoint persistence ([`checkpoint::CheckpointStore`]), continuation
//! scheduling ([`trigger::TriggerScheduler`]), artifact storage
//! ([`destination::DestinationStore`]), artifact production
//! ([`renderer::ReportRenderer`]), and the operator log
//! ([`sink::LogSink`]). The orchestration core is therefore fully testable
//! with in-memory fakes and a paused clock.
//!
//! ## Concurrency model
//!
//! Execution is single-threaded, cooperative, and re-entrant only through
//! externally scheduled continuations; "suspension" means the execution
//! ends and a later, independent one resumes from persisted state. The
//! clear-then-arm convention on the trigger scheduler is the sole
//! concurrency control: at most one continuation is pending at any
//! instant. Within one process the scheduler serializes clear and arm;
//! across independent processes sharing a checkpoint file a narrow race
//! window remains an accepted limitation.
//!
//! ## Module Organization
//!
//! - [`models`] - work items, checkpoints, trigger handles, log records
//! - [`checkpoint`] - durable progress persistence
//! - [`trigger`] - singleton continuation scheduling
//! - [`destination`] - artifact container resolution and storage
//! - [`renderer`] - the external artifact-production seam
//! - [`sink`] - append-only operator log
//! - [`orchestration`] - controller, batch executor, item processor
//! - [`config`] - tunables (chunk size, time budget, delay tiers)
//! - [`error`] - structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use batchrun_core::checkpoint::FileCheckpointStore;
//! use batchrun_core::destination::FsDestinationStore;
//! use batchrun_core::renderer::RenderLayout;
//! use batchrun_core::sink::TracingLogSink;
//! use batchrun_core::test_helpers::StubRenderer;
//! use batchrun_core::{BatchConfig, BatchJob};
//!
//! # async fn example(rows: Vec<(String, String)>) -> batchrun_core::Result<()> {
//! let mut job = BatchJob::new(
//!     BatchConfig::default(),
//!     Arc::new(FileCheckpointStore::new("checkpoint.json")),
//!     Arc::new(FsDestinationStore::new("exports")),
//!     Arc::new(StubRenderer::new()),
//!     RenderLayout::default(),
//!     Arc::new(TracingLogSink::new()),
//! );
//! job.start_full_run(rows).await?;
//! job.run_until_complete().await?;
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod config;
pub mod destination;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod renderer;
pub mod sink;
pub mod test_helpers;
pub mod trigger;

pub use config::BatchConfig;
pub use error::{BatchError, Result};
pub use models::{
    ArtifactRef, Checkpoint, DestinationHandle, LogRecord, RecordStatus, TriggerHandle, WorkItem,
};
pub use orchestration::{
    continuation_decision, BatchExecutor, BatchJob, ChunkOutcome, ContinuationDecision,
    ItemProcessor, JobController,
};
pub use trigger::{Continuation, TokioTriggerScheduler, TriggerScheduler};
