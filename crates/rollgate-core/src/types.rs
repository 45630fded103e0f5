//! Shared types used across rollgate crates.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ConfigError;

/// Host of a cluster server, without port. Compared by exact string match.
pub type NodeId = String;

/// Index of one server instance within a deploy job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(pub u32);

impl FromStr for TaskId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(TaskId)
            .map_err(|_| ConfigError::InvalidTask(s.trim().to_string()))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maintenance action applied to one task at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Stop,
    Restart,
    RollingUpdate,
}

impl OperationKind {
    /// Name passed to the deploy client.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Stop => "stop",
            OperationKind::Restart => "restart",
            OperationKind::RollingUpdate => "rolling_update",
        }
    }

    /// Whether the deploy output names the node that was taken down.
    ///
    /// Only a stop leaves its node down for the rest of the run.
    pub fn takes_node_down(&self) -> bool {
        matches!(self, OperationKind::Stop)
    }
}

impl FromStr for OperationKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "stop" => Ok(OperationKind::Stop),
            "restart" => Ok(OperationKind::Restart),
            "rolling_update" => Ok(OperationKind::RollingUpdate),
            other => Err(ConfigError::UnknownOperation(other.to_string())),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generation of the deploy client installed on the operator host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployGeneration {
    /// `.cfg` cluster configs.
    Minos1,
    /// `.yaml` cluster configs; rolling updates need `--confirm_install`.
    Minos2,
}

impl DeployGeneration {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployGeneration::Minos1 => "minos1.0",
            DeployGeneration::Minos2 => "minos2.0",
        }
    }

    /// File extension of the per-cluster config this generation reads.
    pub fn config_extension(&self) -> &'static str {
        match self {
            DeployGeneration::Minos1 => "cfg",
            DeployGeneration::Minos2 => "yaml",
        }
    }
}

impl FromStr for DeployGeneration {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minos1.0" | "minos1" | "1" => Ok(DeployGeneration::Minos1),
            "minos2.0" | "minos2" | "2" => Ok(DeployGeneration::Minos2),
            other => Err(ConfigError::UnknownGeneration(other.to_string())),
        }
    }
}

impl fmt::Display for DeployGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one deploy client invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    /// Exit code, or `None` if the process was killed by a signal.
    pub exit_status: Option<i32>,
    /// Merged stdout and stderr.
    pub output: String,
}

impl OperationResult {
    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }
}
