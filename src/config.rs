use crate::error::{BatchError, Result};
use std::time::Duration;

/// Tunables for chunk execution and continuation scheduling.
///
/// The three delay tiers exist for different reasons: `kickoff_delay` is
/// short enough that a start appears immediate to the caller but still
/// returns control first; `cooldown_delay` spaces successive chunks to keep
/// pressure off rate-limited external resources; `interrupted_delay` is the
/// longer pause taken after a chunk hits its time budget, giving external
/// quota time to recover before resuming.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Human-readable name of the destination container, used for
    /// lookup-else-create resolution.
    pub destination_name: String,
    /// Hard cap on items processed per chunk, independent of the time budget.
    pub chunk_size: usize,
    /// Maximum wall-clock duration a single chunk may run before it must
    /// checkpoint and yield.
    pub time_budget: Duration,
    /// Delay before the first continuation after a job start.
    pub kickoff_delay: Duration,
    /// Delay between successive normal chunk completions.
    pub cooldown_delay: Duration,
    /// Delay after a chunk is cut short by the time budget.
    pub interrupted_delay: Duration,
    /// Pacing inserted by the item processor around quota-limited calls.
    pub pacing_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            destination_name: "batch-exports".to_string(),
            chunk_size: 15,
            time_budget: Duration::from_secs(240),
            kickoff_delay: Duration::from_secs(5),
            cooldown_delay: Duration::from_secs(60),
            interrupted_delay: Duration::from_secs(300),
            pacing_delay: Duration::from_millis(200),
        }
    }
}

impl BatchConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("BATCHRUN_DESTINATION") {
            config.destination_name = name;
        }

        if let Ok(chunk_size) = std::env::var("BATCHRUN_CHUNK_SIZE") {
            config.chunk_size = chunk_size.parse().map_err(|e| {
                BatchError::Configuration(format!("Invalid chunk_size: {e}"))
            })?;
        }

        if let Ok(budget) = std::env::var("BATCHRUN_TIME_BUDGET_SECS") {
            config.time_budget = Duration::from_secs(budget.parse().map_err(|e| {
                BatchError::Configuration(format!("Invalid time_budget: {e}"))
            })?);
        }

        if let Ok(cooldown) = std::env::var("BATCHRUN_COOLDOWN_SECS") {
            config.cooldown_delay = Duration::from_secs(cooldown.parse().map_err(|e| {
                BatchError::Configuration(format!("Invalid cooldown_delay: {e}"))
            })?);
        }

        if let Ok(interrupted) = std::env::var("BATCHRUN_INTERRUPTED_SECS") {
            config.interrupted_delay = Duration::from_secs(interrupted.parse().map_err(
                |e| BatchError::Configuration(format!("Invalid interrupted_delay: {e}")),
            )?);
        }

        if let Ok(pacing) = std::env::var("BATCHRUN_PACING_MS") {
            config.pacing_delay = Duration::from_millis(pacing.parse().map_err(|e| {
                BatchError::Configuration(format!("Invalid pacing_delay: {e}"))
            })?);
        }

        Ok(config)
    }
}
