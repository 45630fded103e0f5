//! Deploy client invocation.
//!
//! One request per task:
//!
//! ```text
//! <client>/deploy <operation> <service> <cluster> --job <job> --task <id> --skip_confirm <flags...>
//! ```
//!
//! `--skip_confirm` is always passed: the operator already confirmed the
//! run once, so the client's own per-task prompt is bypassed.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use rollgate_core::{OperationResult, RunConfiguration, TaskId};

/// A fully resolved deploy client command for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub task: TaskId,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl DeployRequest {
    pub fn for_task(config: &RunConfiguration, task: TaskId) -> Self {
        let mut args = vec![
            config.operation.as_str().to_string(),
            config.service.clone(),
            config.cluster.clone(),
            "--job".to_string(),
            config.job.clone(),
            "--task".to_string(),
            task.to_string(),
            "--skip_confirm".to_string(),
        ];
        args.extend(config.flags.iter().cloned());

        Self {
            task,
            program: config.deploy_client.deploy_binary(),
            args,
        }
    }

    /// The command as an operator would type it.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Runs deploy requests.
///
/// An `Err` means the client could not be run at all. A client that runs
/// and exits non-zero is an `Ok` result; the health gate decides whether
/// the step was safe.
pub trait Deployer {
    fn deploy(
        &self,
        request: &DeployRequest,
    ) -> impl Future<Output = std::io::Result<OperationResult>> + Send;
}

/// Deployer that spawns the deploy client as a child process.
///
/// On unix the client runs in its own process group, so an interrupt aimed
/// at the controller lets the current task finish.
#[derive(Debug, Clone, Default)]
pub struct ProcessDeployer;

impl Deployer for ProcessDeployer {
    async fn deploy(&self, request: &DeployRequest) -> std::io::Result<OperationResult> {
        debug!(command = %request.command_line(), "spawning deploy client");

        let mut command = Command::new(&request.program);
        command.args(&request.args).stdin(Stdio::null());
        // Own process group: a terminal Ctrl-C must not reach a client mid-task.
        #[cfg(unix)]
        command.process_group(0);

        let output = command.output().await?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }

        Ok(OperationResult {
            exit_status: output.status.code(),
            output: text,
        })
    }
}
