//! # Orchestration Engine
//!
//! The resumable chunked-batch core: controller, executor, and per-item
//! processing.
//!
//! ## Core Components
//!
//! - **JobController**: builds the worklist (full or sampled), resets the
//!   checkpoint, and arms the first continuation
//! - **BatchExecutor**: processes one chunk per continuation, bounded by
//!   chunk size and the wall-clock time budget, then re-arms or finalizes
//! - **ItemProcessor**: one item's idempotency-guarded artifact production
//!   with failure isolation
//! - **BatchJob**: in-process host wiring the continuation channel to the
//!   executor, exposing the manual entry points
//!
//! ## Control flow
//!
//! Controller → checkpoint store (init) → trigger manager (arm) →
//! continuation → executor → checkpoint store (read/write) + item
//! processor (×N) → trigger manager (re-arm or clear).

pub mod controller;
pub mod executor;
pub mod processor;
pub mod runner;
pub mod sampler;

pub use controller::JobController;
pub use executor::{continuation_decision, BatchExecutor, ChunkOutcome, ContinuationDecision};
pub use processor::ItemProcessor;
pub use runner::BatchJob;
pub use sampler::sample_items;
