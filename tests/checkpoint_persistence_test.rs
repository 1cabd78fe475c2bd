//! Durability across process restarts: a job interrupted in one execution
//! resumes from its file-backed checkpoint in a fresh, independent one.

use std::sync::Arc;
use std::time::Duration;

use batchrun_core::checkpoint::{CheckpointStore, FileCheckpointStore};
use batchrun_core::destination::FsDestinationStore;
use batchrun_core::orchestration::{BatchExecutor, ChunkOutcome, JobController};
use batchrun_core::renderer::RenderLayout;
use batchrun_core::sink::MemoryLogSink;
use batchrun_core::test_helpers::{source_rows, ManualScheduler, StubRenderer};
use batchrun_core::{BatchConfig, ItemProcessor, RecordStatus};

fn test_config(destination_name: &str) -> BatchConfig {
    BatchConfig {
        destination_name: destination_name.to_string(),
        chunk_size: 10,
        time_budget: Duration::from_secs(600),
        kickoff_delay: Duration::from_secs(1),
        cooldown_delay: Duration::from_secs(60),
        interrupted_delay: Duration::from_secs(300),
        pacing_delay: Duration::ZERO,
    }
}

/// Build a fresh "process": new store and executor instances over the same
/// on-disk state.
fn build(
    config: &BatchConfig,
    checkpoint_path: &std::path::Path,
    destination_root: &std::path::Path,
) -> (JobController, BatchExecutor, Arc<MemoryLogSink>) {
    let checkpoints: Arc<dyn CheckpointStore> =
        Arc::new(FileCheckpointStore::new(checkpoint_path));
    let destination = Arc::new(FsDestinationStore::new(destination_root));
    let triggers = Arc::new(ManualScheduler::new());
    let sink = Arc::new(MemoryLogSink::new());

    let controller = JobController::new(
        config.clone(),
        Arc::clone(&checkpoints),
        triggers.clone(),
        destination.clone(),
    );
    let processor = ItemProcessor::new(
        Arc::new(StubRenderer::new()),
        destination.clone(),
        RenderLayout::default(),
    );
    let executor = BatchExecutor::new(
        config.clone(),
        checkpoints,
        triggers,
        destination,
        processor,
        sink.clone(),
    );
    (controller, executor, sink)
}

#[tokio::test]
async fn job_resumes_across_process_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint_path = dir.path().join("checkpoint.json");
    let destination_root = dir.path().join("exports");
    let config = test_config("quarterly");

    // Execution one: start the job, process a single chunk, then "crash".
    {
        let (controller, executor, _sink) = build(&config, &checkpoint_path, &destination_root);
        controller.start(source_rows(25), None).await.unwrap();
        let outcome = executor.run_chunk().await.unwrap();
        assert_eq!(
            outcome,
            ChunkOutcome::Progressed {
                processed: 10,
                cursor: 10
            }
        );
    }

    // Execution two: independent instances over the same files.
    let (_, executor, sink) = build(&config, &checkpoint_path, &destination_root);
    let second = executor.run_chunk().await.unwrap();
    assert_eq!(
        second,
        ChunkOutcome::Progressed {
            processed: 10,
            cursor: 20
        }
    );
    let third = executor.run_chunk().await.unwrap();
    assert_eq!(third, ChunkOutcome::Completed { total: 25 });

    let records = sink.records();
    assert!(records[..15]
        .iter()
        .all(|r| r.status == RecordStatus::Success));
    assert_eq!(records.last().unwrap().status, RecordStatus::Complete);

    let artifact_count = std::fs::read_dir(destination_root.join("quarterly"))
        .unwrap()
        .count();
    assert_eq!(artifact_count, 25);
}

#[tokio::test]
async fn rerunning_a_completed_job_produces_no_new_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint_path = dir.path().join("checkpoint.json");
    let destination_root = dir.path().join("exports");
    let config = test_config("quarterly");
    let rows = source_rows(8);

    {
        let (controller, executor, _sink) = build(&config, &checkpoint_path, &destination_root);
        controller.start(rows.clone(), None).await.unwrap();
        assert_eq!(
            executor.run_chunk().await.unwrap(),
            ChunkOutcome::Completed { total: 8 }
        );
    }

    // A fresh full run over the same source: every item hits the
    // idempotency guard.
    let (controller, executor, sink) = build(&config, &checkpoint_path, &destination_root);
    controller.start(rows, None).await.unwrap();
    assert_eq!(
        executor.run_chunk().await.unwrap(),
        ChunkOutcome::Completed { total: 8 }
    );

    assert!(sink.records()[..8]
        .iter()
        .all(|r| r.status == RecordStatus::Skipped));
    let artifact_count = std::fs::read_dir(destination_root.join("quarterly"))
        .unwrap()
        .count();
    assert_eq!(artifact_count, 8);
}
