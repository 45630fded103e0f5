//! Rollout error types.

use thiserror::Error;

use rollgate_core::TaskId;
use rollgate_health::GateError;

/// Errors that abort a run. Partial progress is never rolled back.
#[derive(Debug, Error)]
pub enum RolloutError {
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("failed to run deploy client for task {task}: {source}")]
    Spawn {
        task: TaskId,
        #[source]
        source: std::io::Error,
    },

    #[error("run cancelled after {completed} task(s)")]
    Cancelled { completed: usize },
}

pub type RolloutResult<T> = Result<T, RolloutError>;
