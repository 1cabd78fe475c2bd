//! # Trigger Manager
//!
//! Arms and cancels the single future continuation of the job.
//!
//! ## Overview
//!
//! A continuation is a scheduled re-invocation of the batch executor. The
//! system-wide invariant is that at most one continuation is pending at any
//! instant; callers enforce it by preceding every `arm_after` with
//! `clear_all`, and [`TokioTriggerScheduler`] additionally serializes both
//! operations through its pending slot, which closes the clear/arm race
//! within a single process. Across independent processes sharing a
//! checkpoint file the race window remains an accepted risk.
//!
//! The scheduler delivers fired continuations as [`Continuation`] messages
//! on an mpsc channel; the receiving side (see
//! [`crate::orchestration::runner`]) decides what a continuation means.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::logging::log_trigger_operation;
use crate::models::TriggerHandle;

/// Message delivered when an armed continuation fires.
#[derive(Debug, Clone)]
pub struct Continuation {
    pub trigger: TriggerHandle,
}

/// Capability for scheduling the job's single continuation.
#[async_trait]
pub trait TriggerScheduler: Send + Sync {
    /// Cancel every pending continuation. No-op if none exist.
    async fn clear_all(&self);

    /// Schedule a continuation after `delay`. Callers clear first; the
    /// implementation may additionally drop any stray pending trigger.
    async fn arm_after(&self, delay: Duration) -> Result<TriggerHandle>;

    /// The currently pending continuation, if any.
    fn pending(&self) -> Option<TriggerHandle>;
}

struct PendingTrigger {
    handle: TriggerHandle,
    task: JoinHandle<()>,
}

/// Timer-backed scheduler: each armed continuation is a tokio task that
/// sleeps for the delay and then sends on the continuation channel.
pub struct TokioTriggerScheduler {
    continuations: mpsc::Sender<Continuation>,
    pending: Arc<Mutex<Option<PendingTrigger>>>,
}

impl TokioTriggerScheduler {
    pub fn new(continuations: mpsc::Sender<Continuation>) -> Self {
        Self {
            continuations,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Convenience constructor pairing the scheduler with the receiving
    /// end of its continuation channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Continuation>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl TriggerScheduler for TokioTriggerScheduler {
    async fn clear_all(&self) {
        let removed = self.pending.lock().take();
        if let Some(pending) = removed {
            pending.task.abort();
            log_trigger_operation(
                "clear_all",
                Some(&pending.handle.id.to_string()),
                None,
                "cleared",
            );
        }
    }

    async fn arm_after(&self, delay: Duration) -> Result<TriggerHandle> {
        let handle = TriggerHandle::firing_after(delay);
        let sender = self.continuations.clone();
        let slot = Arc::clone(&self.pending);
        let fired = handle.clone();

        let mut pending = self.pending.lock();
        // A stray trigger here means a caller skipped clear_all; dropping it
        // preserves the singleton invariant instead of double-firing.
        if let Some(stray) = pending.take() {
            stray.task.abort();
        }
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let still_pending = {
                let mut slot = slot.lock();
                match slot.as_ref() {
                    Some(p) if p.handle.id == fired.id => {
                        slot.take();
                        true
                    }
                    _ => false,
                }
            };
            if still_pending {
                // Receiver gone means the job host shut down; nothing to do.
                let _ = sender.send(Continuation { trigger: fired }).await;
            }
        });
        *pending = Some(PendingTrigger {
            handle: handle.clone(),
            task,
        });
        drop(pending);

        log_trigger_operation(
            "arm_after",
            Some(&handle.id.to_string()),
            Some(delay.as_millis() as u64),
            "armed",
        );
        Ok(handle)
    }

    fn pending(&self) -> Option<TriggerHandle> {
        self.pending.lock().as_ref().map(|p| p.handle.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn armed_trigger_fires_once() {
        let (scheduler, mut rx) = TokioTriggerScheduler::channel(4);
        let handle = scheduler.arm_after(Duration::from_secs(30)).await.unwrap();

        let continuation = rx.recv().await.unwrap();
        assert_eq!(continuation.trigger.id, handle.id);
        assert!(scheduler.pending().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_trigger_never_fires() {
        let (scheduler, mut rx) = TokioTriggerScheduler::channel(4);
        scheduler.arm_after(Duration::from_secs(30)).await.unwrap();
        scheduler.clear_all().await;

        let fired = tokio::time::timeout(Duration::from_secs(120), rx.recv()).await;
        assert!(fired.is_err(), "cleared trigger must not deliver");
        assert!(scheduler.pending().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_the_pending_trigger() {
        let (scheduler, mut rx) = TokioTriggerScheduler::channel(4);
        scheduler.arm_after(Duration::from_secs(30)).await.unwrap();
        let second = scheduler.arm_after(Duration::from_secs(60)).await.unwrap();

        assert_eq!(scheduler.pending().map(|h| h.id), Some(second.id));

        let continuation = rx.recv().await.unwrap();
        assert_eq!(continuation.trigger.id, second.id);

        let extra = tokio::time::timeout(Duration::from_secs(300), rx.recv()).await;
        assert!(extra.is_err(), "replaced trigger must not deliver");
    }

    #[tokio::test]
    async fn clear_all_is_idempotent() {
        let (scheduler, _rx) = TokioTriggerScheduler::channel(4);
        scheduler.clear_all().await;
        scheduler.clear_all().await;
        assert!(scheduler.pending().is_none());
    }
}
