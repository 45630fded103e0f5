//! Rolling executor — drives the run state machine.
//!
//! ```text
//! Configuring → Gating → Executing(0) → Gating → Settling → Executing(1) → … → Done
//!                  └──────────────┴──────────────┴─────────→ Aborted
//! ```
//!
//! Tasks run strictly one after another. The executor borrows the
//! exclusion set mutably for the whole run, so nothing else can change it
//! while a task is in flight.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use rollgate_core::{NodeId, OperationKind, RunConfiguration, TaskId};
use rollgate_health::{ExclusionSet, HealthGate, HealthOracle, cancelled};

use crate::deploy::{DeployRequest, Deployer};
use crate::error::{RolloutError, RolloutResult};
use crate::parse::stopped_node;

/// Current phase of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    /// Not started yet.
    Configuring,
    /// Waiting for the health gate to pass.
    Gating,
    /// Deploy client running for task `index` of `total`.
    Executing {
        task: TaskId,
        index: usize,
        total: usize,
    },
    /// Healthy again after a task; waiting out the settle interval.
    Settling { task: TaskId },
    /// Every task completed.
    Done,
    /// Stopped early. Completed tasks are not rolled back.
    Aborted { reason: String },
}

/// What happened to one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub task: TaskId,
    pub exit_status: Option<i32>,
    /// Node a stop took down and added to the exclusion set.
    pub stopped_node: Option<NodeId>,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub cluster: String,
    pub operation: OperationKind,
    pub tasks: Vec<TaskOutcome>,
    /// Exclusion set at the end of the run.
    pub excluded: Vec<String>,
}

/// Runs tasks one at a time between health gates.
pub struct RollingExecutor<O, D> {
    gate: HealthGate<O>,
    deployer: D,
    settle_interval: Duration,
    shutdown: watch::Receiver<bool>,
    phase: RunPhase,
}

impl<O: HealthOracle, D: Deployer> RollingExecutor<O, D> {
    /// Create an executor with a 10s settle interval.
    pub fn new(gate: HealthGate<O>, deployer: D, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            gate,
            deployer,
            settle_interval: Duration::from_secs(10),
            shutdown,
            phase: RunPhase::Configuring,
        }
    }

    pub fn with_settle_interval(mut self, interval: Duration) -> Self {
        self.settle_interval = interval;
        self
    }

    pub fn phase(&self) -> &RunPhase {
        &self.phase
    }

    pub fn gate(&self) -> &HealthGate<O> {
        &self.gate
    }

    pub fn deployer(&self) -> &D {
        &self.deployer
    }

    /// Run every configured task in order.
    ///
    /// Gates once before the first task so that nothing is attempted on a
    /// cluster that is already broken.
    pub async fn run(
        &mut self,
        config: &RunConfiguration,
        exclusions: &mut ExclusionSet,
    ) -> RolloutResult<RunSummary> {
        info!(
            cluster = %config.cluster,
            operation = %config.operation,
            job = %config.job,
            tasks = config.tasks.len(),
            "starting rolling operation"
        );

        self.preflight(exclusions).await?;

        let mut outcomes = Vec::with_capacity(config.tasks.len());
        for (index, &task) in config.tasks.iter().enumerate() {
            if *self.shutdown.borrow() {
                return Err(self.abort(RolloutError::Cancelled { completed: index }));
            }
            outcomes.push(self.run_task(config, task, index, exclusions).await?);
        }

        self.phase = RunPhase::Done;
        info!(cluster = %config.cluster, tasks = outcomes.len(), "completed successfully");

        Ok(RunSummary {
            cluster: config.cluster.clone(),
            operation: config.operation,
            tasks: outcomes,
            excluded: exclusions
                .hosts()
                .cloned()
                .chain(exclusions.tables().map(|t| format!("table {t}")))
                .collect(),
        })
    }

    /// Gate before any task is touched.
    pub async fn preflight(&mut self, exclusions: &ExclusionSet) -> RolloutResult<()> {
        self.gate_step(exclusions).await
    }

    /// Operate on one task, then gate and settle.
    pub async fn run_task(
        &mut self,
        config: &RunConfiguration,
        task: TaskId,
        index: usize,
        exclusions: &mut ExclusionSet,
    ) -> RolloutResult<TaskOutcome> {
        self.phase = RunPhase::Executing {
            task,
            index,
            total: config.tasks.len(),
        };

        let request = DeployRequest::for_task(config, task);
        info!(%task, command = %request.command_line(), "start to operate on task");

        let deployed = self.deployer.deploy(&request).await;
        let result = match deployed {
            Ok(result) => result,
            Err(source) => return Err(self.abort(RolloutError::Spawn { task, source })),
        };

        info!(%task, status = ?result.exit_status, "operate status");
        for line in result.output.lines() {
            info!(%task, "{line}");
        }
        if !result.success() {
            warn!(%task, status = ?result.exit_status, "deploy client exited unsuccessfully; relying on health gate");
        }

        let stopped = if config.operation.takes_node_down() {
            match stopped_node(&result.output) {
                Some(node) => {
                    if exclusions.add_host(node.clone()) {
                        info!(%task, %node, "node stopped, excluded from health gate");
                    }
                    Some(node)
                }
                None => {
                    warn!(%task, "no stopped tablet server found in deploy output");
                    None
                }
            }
        } else {
            None
        };

        self.gate_step(exclusions).await?;

        self.phase = RunPhase::Settling { task };
        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            _ = tokio::time::sleep(self.settle_interval) => {}
            _ = cancelled(&mut shutdown) => {
                return Err(self.abort(RolloutError::Cancelled { completed: index + 1 }));
            }
        }
        info!(%task, "==========================");

        Ok(TaskOutcome {
            task,
            exit_status: result.exit_status,
            stopped_node: stopped,
        })
    }

    async fn gate_step(&mut self, exclusions: &ExclusionSet) -> RolloutResult<()> {
        self.phase = RunPhase::Gating;
        let gated = self.gate.wait_until_healthy(exclusions).await;
        gated.map_err(|e| self.abort(e.into()))
    }

    fn abort(&mut self, err: RolloutError) -> RolloutError {
        error!(error = %err, "rolling operation aborted");
        self.phase = RunPhase::Aborted {
            reason: err.to_string(),
        };
        err
    }
}
