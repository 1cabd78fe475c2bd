//! End-to-end behavior of the chunked-batch engine against in-memory
//! fakes: chunk accounting, idempotent re-runs, failure recovery, and the
//! singleton-trigger invariant.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use batchrun_core::checkpoint::{CheckpointStore, InMemoryCheckpointStore};
use batchrun_core::orchestration::{BatchExecutor, ChunkOutcome, JobController};
use batchrun_core::renderer::RenderLayout;
use batchrun_core::sink::MemoryLogSink;
use batchrun_core::test_helpers::{
    source_rows, FlakyCheckpointStore, ManualScheduler, MemoryDestinationStore, StubRenderer,
};
use batchrun_core::trigger::TriggerScheduler;
use batchrun_core::{BatchConfig, BatchError, ItemProcessor, RecordStatus, WorkItem};

const DESTINATION: &str = "reports";

fn test_config() -> BatchConfig {
    BatchConfig {
        destination_name: DESTINATION.to_string(),
        chunk_size: 15,
        time_budget: Duration::from_secs(600),
        kickoff_delay: Duration::from_secs(1),
        cooldown_delay: Duration::from_secs(60),
        interrupted_delay: Duration::from_secs(300),
        pacing_delay: Duration::ZERO,
    }
}

struct Harness {
    config: BatchConfig,
    checkpoints: Arc<dyn CheckpointStore>,
    triggers: Arc<ManualScheduler>,
    destination: Arc<MemoryDestinationStore>,
    sink: Arc<MemoryLogSink>,
    controller: JobController,
    executor: BatchExecutor,
}

impl Harness {
    fn new(config: BatchConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(InMemoryCheckpointStore::new()),
            StubRenderer::new(),
        )
    }

    fn with_parts(
        config: BatchConfig,
        checkpoints: Arc<dyn CheckpointStore>,
        renderer: StubRenderer,
    ) -> Self {
        let triggers = Arc::new(ManualScheduler::new());
        let destination = Arc::new(MemoryDestinationStore::new());
        let sink = Arc::new(MemoryLogSink::new());

        let controller = JobController::new(
            config.clone(),
            Arc::clone(&checkpoints),
            triggers.clone(),
            destination.clone(),
        );
        let processor = ItemProcessor::new(
            Arc::new(renderer),
            destination.clone(),
            RenderLayout::default(),
        );
        let executor = BatchExecutor::new(
            config.clone(),
            Arc::clone(&checkpoints),
            triggers.clone(),
            destination.clone(),
            processor,
            sink.clone(),
        );

        Self {
            config,
            checkpoints,
            triggers,
            destination,
            sink,
            controller,
            executor,
        }
    }

    async fn cursor(&self) -> usize {
        self.checkpoints.load().await.unwrap().unwrap().cursor
    }
}

#[tokio::test]
async fn thirty_seven_items_complete_in_three_chunks() {
    let harness = Harness::new(test_config());
    harness.controller.start(source_rows(37), None).await.unwrap();

    assert_eq!(harness.cursor().await, 0);
    assert!(harness.triggers.pending().is_some(), "kickoff trigger armed");

    let first = harness.executor.run_chunk().await.unwrap();
    assert_eq!(
        first,
        ChunkOutcome::Progressed {
            processed: 15,
            cursor: 15
        }
    );
    assert!(harness.triggers.pending().is_some());

    let second = harness.executor.run_chunk().await.unwrap();
    assert_eq!(
        second,
        ChunkOutcome::Progressed {
            processed: 15,
            cursor: 30
        }
    );

    let third = harness.executor.run_chunk().await.unwrap();
    assert_eq!(third, ChunkOutcome::Completed { total: 37 });
    assert!(
        harness.triggers.pending().is_none(),
        "terminal state arms no further continuation"
    );

    let records = harness.sink.records();
    assert_eq!(records.len(), 38, "37 item records plus one terminal");
    assert!(records[..37]
        .iter()
        .all(|r| r.status == RecordStatus::Success));
    assert_eq!(records[37].status, RecordStatus::Complete);
    assert_eq!(harness.destination.artifact_count(DESTINATION), 37);

    // A fourth invocation has a complete checkpoint: it finalizes again
    // without reprocessing anything.
    let fourth = harness.executor.run_chunk().await.unwrap();
    assert_eq!(fourth, ChunkOutcome::Completed { total: 37 });
    assert_eq!(harness.destination.artifact_count(DESTINATION), 37);
}

#[tokio::test]
async fn chunk_completions_use_the_cooldown_delay() {
    let harness = Harness::new(test_config());
    harness.controller.start(source_rows(20), None).await.unwrap();

    harness.executor.run_chunk().await.unwrap();

    let delays = harness.triggers.armed_delays();
    assert_eq!(
        delays,
        vec![harness.config.kickoff_delay, harness.config.cooldown_delay]
    );
}

#[tokio::test]
async fn preexisting_artifact_is_skipped_and_cursor_advances() {
    let harness = Harness::new(test_config());
    let rows = source_rows(3);

    // Pre-seed the artifact for the first item under its deterministic name.
    let first = WorkItem::new(rows[0].0.clone(), rows[0].1.clone());
    harness
        .destination
        .insert_artifact(DESTINATION, &first.artifact_name(), b"%PDF-1.4 old");

    harness.controller.start(rows, None).await.unwrap();
    let outcome = harness.executor.run_chunk().await.unwrap();
    assert_eq!(outcome, ChunkOutcome::Completed { total: 3 });

    let records = harness.sink.records();
    assert_eq!(records[0].status, RecordStatus::Skipped);
    assert!(records[0].artifact_ref.is_none());
    assert_eq!(records[1].status, RecordStatus::Success);
    assert_eq!(records[2].status, RecordStatus::Success);

    // The seeded artifact was not re-produced.
    assert_eq!(harness.destination.artifact_count(DESTINATION), 3);
    assert_eq!(harness.cursor().await, 3);
}

#[tokio::test]
async fn item_failures_are_isolated_and_never_abort_the_chunk() {
    let harness = Harness::with_parts(
        test_config(),
        Arc::new(InMemoryCheckpointStore::new()),
        StubRenderer::new().failing_for(["item-001", "item-003"]),
    );
    harness.controller.start(source_rows(5), None).await.unwrap();

    let outcome = harness.executor.run_chunk().await.unwrap();
    assert_eq!(outcome, ChunkOutcome::Completed { total: 5 });

    let statuses: Vec<_> = harness.sink.records().iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            RecordStatus::Success,
            RecordStatus::Error,
            RecordStatus::Success,
            RecordStatus::Error,
            RecordStatus::Success,
            RecordStatus::Complete,
        ]
    );
    assert_eq!(harness.destination.artifact_count(DESTINATION), 3);
}

#[tokio::test]
async fn stale_destination_handle_is_recovered_without_failing_the_chunk() {
    let harness = Harness::new(test_config());
    harness.controller.start(source_rows(5), None).await.unwrap();

    // Invalidate the stored handle between executions.
    harness.destination.drop_container(DESTINATION);

    let outcome = harness.executor.run_chunk().await.unwrap();
    assert_eq!(outcome, ChunkOutcome::Completed { total: 5 });
    assert_eq!(harness.destination.artifact_count(DESTINATION), 5);
}

#[tokio::test]
async fn unresolvable_destination_aborts_the_chunk_and_resumes_at_the_persisted_cursor() {
    let harness = Harness::new(test_config());
    harness.controller.start(source_rows(20), None).await.unwrap();

    harness.executor.run_chunk().await.unwrap();
    assert_eq!(harness.cursor().await, 15);

    // Handle goes stale and resolution itself is down: recovery fails.
    harness.destination.drop_container(DESTINATION);
    harness.destination.break_resolution();

    let err = harness.executor.run_chunk().await.unwrap_err();
    assert!(matches!(err, BatchError::Destination(_)));
    assert_eq!(harness.cursor().await, 15, "cursor did not move");
    assert!(
        harness.triggers.pending().is_some(),
        "a retry continuation is armed so the job is not stranded"
    );

    harness.destination.repair();
    let outcome = harness.executor.run_chunk().await.unwrap();
    assert_eq!(outcome, ChunkOutcome::Completed { total: 20 });
    // Only the remaining five items were processed; the dropped container
    // took the first chunk's artifacts with it.
    assert_eq!(harness.destination.artifact_count(DESTINATION), 5);
}

#[tokio::test]
async fn checkpoint_save_failure_aborts_and_idempotency_covers_the_replay() {
    let checkpoints = Arc::new(FlakyCheckpointStore::new());
    let harness = Harness::with_parts(test_config(), checkpoints.clone(), StubRenderer::new());
    harness.controller.start(source_rows(20), None).await.unwrap();

    checkpoints.fail_saves(true);
    let err = harness.executor.run_chunk().await.unwrap_err();
    assert!(matches!(err, BatchError::Checkpoint(_)));
    assert_eq!(harness.cursor().await, 0, "persisted cursor unchanged");
    assert!(harness.triggers.pending().is_some());

    // The replayed chunk finds the already-produced artifacts and skips them.
    checkpoints.fail_saves(false);
    harness.executor.run_chunk().await.unwrap();
    assert_eq!(harness.cursor().await, 15);

    let replayed: Vec<_> = harness.sink.records()[15..30]
        .iter()
        .map(|r| r.status)
        .collect();
    assert!(replayed.iter().all(|s| *s == RecordStatus::Skipped));
    assert_eq!(harness.destination.artifact_count(DESTINATION), 15);
}

#[tokio::test]
async fn sampling_more_than_available_takes_everything() {
    let harness = Harness::new(test_config());
    harness
        .controller
        .start_with_rng(source_rows(3), Some(5), &mut StdRng::seed_from_u64(11))
        .await
        .unwrap();

    let checkpoint = harness.checkpoints.load().await.unwrap().unwrap();
    assert_eq!(checkpoint.total, 3);

    let mut ids: Vec<_> = checkpoint.worklist.iter().map(|i| i.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3, "no duplicates");
}

#[tokio::test]
async fn sampled_run_processes_only_the_sample() {
    let harness = Harness::new(test_config());
    harness
        .controller
        .start_with_rng(source_rows(40), Some(5), &mut StdRng::seed_from_u64(11))
        .await
        .unwrap();

    let outcome = harness.executor.run_chunk().await.unwrap();
    assert_eq!(outcome, ChunkOutcome::Completed { total: 5 });
    assert_eq!(harness.destination.artifact_count(DESTINATION), 5);
}

#[tokio::test]
async fn empty_source_is_a_synchronous_configuration_error() {
    let harness = Harness::new(test_config());

    let err = harness.controller.start(Vec::new(), None).await.unwrap_err();
    assert!(matches!(err, BatchError::Configuration(_)));
    assert!(harness.triggers.pending().is_none(), "job never started");
    assert!(harness.sink.is_empty(), "failure is not reported via the log");
}

#[tokio::test]
async fn all_malformed_rows_is_a_synchronous_configuration_error() {
    let harness = Harness::new(test_config());
    let rows = vec![
        (String::new(), "g".to_string()),
        ("x".to_string(), String::new()),
    ];

    let err = harness.controller.start(rows, None).await.unwrap_err();
    assert!(matches!(err, BatchError::Configuration(_)));
}

#[tokio::test]
async fn run_chunk_without_a_checkpoint_is_a_silent_noop() {
    let harness = Harness::new(test_config());

    let outcome = harness.executor.run_chunk().await.unwrap();
    assert_eq!(outcome, ChunkOutcome::NothingToResume);
    assert!(harness.triggers.pending().is_none());
    assert!(harness.sink.is_empty());
}

#[tokio::test(start_paused = true)]
async fn time_budget_interrupts_the_chunk_and_arms_the_long_delay() {
    let config = BatchConfig {
        time_budget: Duration::from_millis(2500),
        ..test_config()
    };
    let harness = Harness::with_parts(
        config.clone(),
        Arc::new(InMemoryCheckpointStore::new()),
        StubRenderer::new().with_delay(Duration::from_secs(1)),
    );
    harness.controller.start(source_rows(10), None).await.unwrap();

    // Each render takes 1s of virtual time; the budget check fires after
    // the third item, before a fourth can start.
    let outcome = harness.executor.run_chunk().await.unwrap();
    assert_eq!(
        outcome,
        ChunkOutcome::Interrupted {
            processed: 3,
            cursor: 3
        }
    );
    assert_eq!(harness.cursor().await, 3);
    assert_eq!(
        harness.triggers.armed_delays().last(),
        Some(&config.interrupted_delay)
    );

    // The interrupted job resumes exactly where it left off.
    let resumed = harness.executor.run_chunk().await.unwrap();
    assert_eq!(
        resumed,
        ChunkOutcome::Interrupted {
            processed: 3,
            cursor: 6
        }
    );
}

#[tokio::test]
async fn restarting_a_job_overwrites_the_old_checkpoint() {
    let harness = Harness::new(test_config());
    harness.controller.start(source_rows(20), None).await.unwrap();
    harness.executor.run_chunk().await.unwrap();
    assert_eq!(harness.cursor().await, 15);

    harness.controller.start(source_rows(8), None).await.unwrap();
    let checkpoint = harness.checkpoints.load().await.unwrap().unwrap();
    assert_eq!(checkpoint.cursor, 0);
    assert_eq!(checkpoint.total, 8);
}
