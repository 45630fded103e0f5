//! Cluster health report and the ksck JSON model it is parsed from.

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;

use rollgate_core::NodeId;

/// Health value the tool reports for a fully healthy entity.
pub const HEALTHY: &str = "HEALTHY";

/// One entity the health tool reported as not healthy.
///
/// Hosts and tables are kept apart so a table can never be excused by a
/// host exclusion with the same spelling, or the other way round.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnhealthyEntity {
    /// A master or tablet server, by host (port stripped).
    Host(NodeId),
    /// A table, by name.
    Table(String),
    /// The health tool could not produce a trustworthy report.
    Unknown,
}

impl fmt::Display for UnhealthyEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnhealthyEntity::Host(host) => f.write_str(host),
            UnhealthyEntity::Table(name) => write!(f, "table {name}"),
            UnhealthyEntity::Unknown => f.write_str("<health check failed>"),
        }
    }
}

/// Snapshot of unhealthy entities from one oracle call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterHealthReport {
    unhealthy: BTreeSet<UnhealthyEntity>,
}

impl ClusterHealthReport {
    /// A report with nothing unhealthy.
    pub fn healthy() -> Self {
        Self::default()
    }

    /// The report produced when the health tool is unusable.
    pub fn unknown() -> Self {
        Self::from_entities([UnhealthyEntity::Unknown])
    }

    pub fn from_entities(entities: impl IntoIterator<Item = UnhealthyEntity>) -> Self {
        Self {
            unhealthy: entities.into_iter().collect(),
        }
    }

    /// Parse the compact JSON output of `kudu cluster ksck`.
    ///
    /// `master_summaries` and `tserver_summaries` are required;
    /// `table_summaries` is optional. Unknown keys are ignored.
    pub fn from_ksck_json(json: &str) -> Result<Self, serde_json::Error> {
        let ksck: KsckReport = serde_json::from_str(json)?;

        let masters = ksck.master_summaries.iter();
        let tservers = ksck.tserver_summaries.iter();
        let hosts = masters
            .chain(tservers)
            .filter(|s| s.health != HEALTHY)
            .map(|s| UnhealthyEntity::Host(host_of(&s.address).to_string()));

        let tables = ksck
            .table_summaries
            .iter()
            .flatten()
            .filter(|t| t.health != HEALTHY)
            .map(|t| UnhealthyEntity::Table(t.name.clone()));

        Ok(Self::from_entities(hosts.chain(tables)))
    }

    pub fn unhealthy(&self) -> impl Iterator<Item = &UnhealthyEntity> {
        self.unhealthy.iter()
    }

    pub fn is_healthy(&self) -> bool {
        self.unhealthy.is_empty()
    }

    /// Whether the health tool failed to produce a report.
    pub fn is_unknown(&self) -> bool {
        self.unhealthy.contains(&UnhealthyEntity::Unknown)
    }

    pub fn len(&self) -> usize {
        self.unhealthy.len()
    }
}

/// Host part of a `host:port` address.
pub fn host_of(address: &str) -> &str {
    address.split(':').next().unwrap_or(address)
}

#[derive(Debug, Deserialize)]
struct KsckReport {
    master_summaries: Vec<ServerSummary>,
    tserver_summaries: Vec<ServerSummary>,
    #[serde(default)]
    table_summaries: Option<Vec<TableSummary>>,
}

#[derive(Debug, Deserialize)]
struct ServerSummary {
    address: String,
    health: String,
}

#[derive(Debug, Deserialize)]
struct TableSummary {
    name: String,
    health: String,
}
