//! Run configuration.
//!
//! `RunSettings` is the raw, everything-optional form read from a
//! `rollgate.toml` file and from command-line flags. `RunConfiguration` is
//! the validated bundle the controller consumes; once built it is never
//! mutated.
//!
//! ```toml
//! cluster = "c3prc-hadoop"
//! masters = "m1:7051,m2:7051,m3:7051"
//! operation = "rolling_update"
//! tasks = "0..5"
//! flags = "--update_config"
//! known_unhealthy_hosts = ["10.0.0.9"]
//! poll_interval = "5s"
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::discovery::{DeployClient, discover_deploy_client, resolve_kudu_binary};
use crate::error::{ConfigError, ConfigResult};
use crate::types::{DeployGeneration, NodeId, OperationKind, TaskId};

const DEFAULT_SERVICE: &str = "kudu";
const DEFAULT_JOB: &str = "tablet_server";

/// Upper bound on the number of tasks one range expression may expand to.
pub const MAX_RANGE_TASKS: u32 = 10_000;

/// Task list as written by the operator.
///
/// Either one expression (`"0..5"`, `"1,3,7-9"`) or an array whose items
/// are integers or expressions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TaskList {
    Expr(String),
    Items(Vec<TaskItem>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TaskItem {
    Id(i64),
    Expr(String),
}

impl TaskList {
    /// Resolve into ordered task ids. Any non-integer entry fails the whole list.
    pub fn resolve(&self) -> ConfigResult<Vec<TaskId>> {
        let tasks = match self {
            TaskList::Expr(expr) => parse_task_expr(expr)?,
            TaskList::Items(items) => {
                let mut tasks = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        TaskItem::Id(id) => {
                            let id = u32::try_from(*id)
                                .map_err(|_| ConfigError::InvalidTask(id.to_string()))?;
                            tasks.push(TaskId(id));
                        }
                        TaskItem::Expr(expr) => tasks.extend(parse_task_expr(expr)?),
                    }
                }
                tasks
            }
        };

        if tasks.is_empty() {
            return Err(ConfigError::Missing("tasks"));
        }
        Ok(tasks)
    }
}

/// Parse a comma-separated task expression.
///
/// Each item is an id (`3`), a half-open range (`0..5` → 0,1,2,3,4) or an
/// inclusive range (`7-9` → 7,8,9).
pub fn parse_task_expr(expr: &str) -> ConfigResult<Vec<TaskId>> {
    let mut tasks = Vec::new();
    for token in expr.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if let Some((start, end)) = token.split_once("..") {
            let (start, end) = range_bounds(token, start, end)?;
            check_range_len(token, end - start)?;
            tasks.extend((start..end).map(TaskId));
        } else if let Some((start, end)) = token.split_once('-').filter(|(s, _)| !s.is_empty()) {
            let (start, end) = range_bounds(token, start, end)?;
            check_range_len(token, (end - start).saturating_add(1))?;
            tasks.extend((start..=end).map(TaskId));
        } else {
            tasks.push(token.parse()?);
        }
    }
    Ok(tasks)
}

fn range_bounds(token: &str, start: &str, end: &str) -> ConfigResult<(u32, u32)> {
    let bad = || ConfigError::InvalidRange(token.to_string());
    let start = start.trim().parse::<u32>().map_err(|_| bad())?;
    let end = end.trim().parse::<u32>().map_err(|_| bad())?;
    if end < start {
        return Err(bad());
    }
    Ok((start, end))
}

fn check_range_len(token: &str, len: u32) -> ConfigResult<()> {
    if len > MAX_RANGE_TASKS {
        return Err(ConfigError::RangeTooLarge {
            range: token.to_string(),
            max: MAX_RANGE_TASKS,
        });
    }
    Ok(())
}

/// Parse a duration string like "5s", "500ms", "2m", or bare seconds.
pub fn parse_duration(s: &str) -> ConfigResult<Duration> {
    let s = s.trim();
    let bad = || ConfigError::InvalidDuration(s.to_string());
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().map(Duration::from_millis).map_err(|_| bad())
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| bad())
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
            .ok_or_else(bad)
    } else {
        s.parse::<u64>().map(Duration::from_secs).map_err(|_| bad())
    }
}

/// Raw run settings from a TOML file or the command line.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSettings {
    pub cluster: Option<String>,
    /// Service tag passed to the deploy client. Default: `kudu`.
    pub service: Option<String>,
    /// Job within the service. Default: `tablet_server`.
    pub job: Option<String>,
    pub operation: Option<String>,
    pub tasks: Option<TaskList>,
    /// Master RPC addresses, passed to the health tool verbatim.
    pub masters: Option<String>,
    /// Extra deploy client flags, whitespace separated.
    pub flags: Option<String>,
    pub known_unhealthy_hosts: Vec<String>,
    pub known_unhealthy_tables: Vec<String>,
    pub kudu_bin: Option<PathBuf>,
    pub deploy_client_dir: Option<PathBuf>,
    pub deploy_generation: Option<String>,
    pub poll_interval: Option<String>,
    pub settle_interval: Option<String>,
    pub gate_timeout: Option<String>,
}

impl RunSettings {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Layer `overrides` on top of `self`. Known-unhealthy lists accumulate.
    pub fn merge(self, overrides: RunSettings) -> RunSettings {
        let mut hosts = self.known_unhealthy_hosts;
        hosts.extend(overrides.known_unhealthy_hosts);
        let mut tables = self.known_unhealthy_tables;
        tables.extend(overrides.known_unhealthy_tables);

        RunSettings {
            cluster: overrides.cluster.or(self.cluster),
            service: overrides.service.or(self.service),
            job: overrides.job.or(self.job),
            operation: overrides.operation.or(self.operation),
            tasks: overrides.tasks.or(self.tasks),
            masters: overrides.masters.or(self.masters),
            flags: overrides.flags.or(self.flags),
            known_unhealthy_hosts: hosts,
            known_unhealthy_tables: tables,
            kudu_bin: overrides.kudu_bin.or(self.kudu_bin),
            deploy_client_dir: overrides.deploy_client_dir.or(self.deploy_client_dir),
            deploy_generation: overrides.deploy_generation.or(self.deploy_generation),
            poll_interval: overrides.poll_interval.or(self.poll_interval),
            settle_interval: overrides.settle_interval.or(self.settle_interval),
            gate_timeout: overrides.gate_timeout.or(self.gate_timeout),
        }
    }

    /// The cluster name, rejected if blank.
    pub fn cluster(&self) -> ConfigResult<&str> {
        required(self.cluster.as_deref(), "cluster")
    }

    /// Use the explicitly configured deploy client, or discover one.
    pub fn resolve_deploy_client(&self) -> ConfigResult<DeployClient> {
        match (&self.deploy_client_dir, &self.deploy_generation) {
            (Some(dir), Some(generation)) => {
                Ok(DeployClient::new(generation.parse::<DeployGeneration>()?, dir.clone()))
            }
            (Some(_), None) => Err(ConfigError::Missing("deploy_generation")),
            (None, Some(_)) => Err(ConfigError::Missing("deploy_client_dir")),
            (None, None) => discover_deploy_client(self.cluster()?),
        }
    }
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> ConfigResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

/// Polling and settling intervals of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Delay between health checks while the cluster is unhealthy.
    pub poll_interval: Duration,
    /// Extra delay after each task once the cluster is healthy again.
    pub settle_interval: Duration,
    /// Give up waiting for health after this long. `None` waits forever.
    pub gate_timeout: Option<Duration>,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            settle_interval: Duration::from_secs(10),
            gate_timeout: None,
        }
    }
}

/// Validated, operator-confirmed parameters of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfiguration {
    pub cluster: String,
    pub service: String,
    pub job: String,
    pub operation: OperationKind,
    pub tasks: Vec<TaskId>,
    pub deploy_client: DeployClient,
    /// Extra deploy flags, including those implied by the operation.
    pub flags: Vec<String>,
    pub master_addresses: String,
    pub kudu_bin: PathBuf,
    pub known_unhealthy_hosts: BTreeSet<NodeId>,
    pub known_unhealthy_tables: BTreeSet<String>,
    pub timing: Timing,
}

impl RunConfiguration {
    /// Validate `settings` into a run configuration.
    pub fn from_settings(settings: &RunSettings, deploy_client: DeployClient) -> ConfigResult<Self> {
        let cluster = settings.cluster()?.to_string();
        let master_addresses = required(settings.masters.as_deref(), "masters")?.to_string();
        let service = match &settings.service {
            Some(s) => required(Some(s.as_str()), "service")?.to_string(),
            None => DEFAULT_SERVICE.to_string(),
        };
        let job = match &settings.job {
            Some(j) => required(Some(j.as_str()), "job")?.to_string(),
            None => DEFAULT_JOB.to_string(),
        };
        let operation: OperationKind = required(settings.operation.as_deref(), "operation")?.parse()?;
        let tasks = settings
            .tasks
            .as_ref()
            .ok_or(ConfigError::Missing("tasks"))?
            .resolve()?;

        let flags = effective_flags(
            operation,
            deploy_client.generation,
            settings.flags.as_deref().unwrap_or(""),
        );

        let mut timing = Timing::default();
        if let Some(s) = &settings.poll_interval {
            timing.poll_interval = parse_duration(s)?;
        }
        if let Some(s) = &settings.settle_interval {
            timing.settle_interval = parse_duration(s)?;
        }
        if let Some(s) = &settings.gate_timeout {
            timing.gate_timeout = Some(parse_duration(s)?);
        }

        Ok(Self {
            cluster,
            service,
            job,
            operation,
            tasks,
            deploy_client,
            flags,
            master_addresses,
            kudu_bin: resolve_kudu_binary(settings.kudu_bin.as_deref()),
            known_unhealthy_hosts: non_blank(&settings.known_unhealthy_hosts),
            known_unhealthy_tables: non_blank(&settings.known_unhealthy_tables),
            timing,
        })
    }

    /// Task ids joined for display.
    pub fn task_list(&self) -> String {
        self.tasks
            .iter()
            .map(TaskId::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn non_blank(items: &[String]) -> BTreeSet<String> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extra deploy flags with the ones implied by `operation` appended.
///
/// A rolling update always ships a new package; the second client
/// generation additionally refuses to install without `--confirm_install`.
pub fn effective_flags(operation: OperationKind, generation: DeployGeneration, extra: &str) -> Vec<String> {
    let mut flags: Vec<String> = extra.split_whitespace().map(str::to_string).collect();
    if operation == OperationKind::RollingUpdate {
        if !flags.iter().any(|f| f == "--update_package") {
            flags.push("--update_package".to_string());
        }
        if generation == DeployGeneration::Minos2 && !flags.iter().any(|f| f == "--confirm_install") {
            flags.push("--confirm_install".to_string());
        }
    }
    flags
}
