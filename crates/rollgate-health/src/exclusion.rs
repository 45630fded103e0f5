//! Exclusion set — entities allowed to be unhealthy during a run.
//!
//! Seeded from the operator's known-unhealthy hosts and tables, then grown
//! by the executor each time a stop takes a node down. There is no way to
//! remove an entry: within one run, maintenance only accumulates.

use std::collections::BTreeSet;

use rollgate_core::{NodeId, RunConfiguration};

use crate::report::{ClusterHealthReport, UnhealthyEntity};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    hosts: BTreeSet<NodeId>,
    tables: BTreeSet<String>,
}

impl ExclusionSet {
    pub fn new(
        hosts: impl IntoIterator<Item = NodeId>,
        tables: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut set = Self::default();
        for host in hosts {
            set.add_host(host);
        }
        for table in tables {
            set.add_table(table);
        }
        set
    }

    /// Seed from the operator-approved known-unhealthy lists.
    pub fn from_config(config: &RunConfiguration) -> Self {
        Self::new(
            config.known_unhealthy_hosts.iter().cloned(),
            config.known_unhealthy_tables.iter().cloned(),
        )
    }

    /// Whether `entity` may be unhealthy without blocking the run.
    ///
    /// `Unknown` is never excluded.
    pub fn contains(&self, entity: &UnhealthyEntity) -> bool {
        match entity {
            UnhealthyEntity::Host(host) => self.hosts.contains(host),
            UnhealthyEntity::Table(name) => self.tables.contains(name),
            UnhealthyEntity::Unknown => false,
        }
    }

    /// Add a host. Returns false for a blank host or one already present.
    pub fn add_host(&mut self, host: impl Into<NodeId>) -> bool {
        let host = host.into();
        if host.trim().is_empty() {
            return false;
        }
        self.hosts.insert(host)
    }

    /// Add a table. Returns false for a blank name or one already present.
    pub fn add_table(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if name.trim().is_empty() {
            return false;
        }
        self.tables.insert(name)
    }

    /// Entries in `report` that are not excluded.
    pub fn unexcluded<'a>(&self, report: &'a ClusterHealthReport) -> Vec<&'a UnhealthyEntity> {
        report.unhealthy().filter(|e| !self.contains(e)).collect()
    }

    pub fn is_superset(&self, other: &ExclusionSet) -> bool {
        self.hosts.is_superset(&other.hosts) && self.tables.is_superset(&other.tables)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &NodeId> {
        self.hosts.iter()
    }

    pub fn tables(&self) -> impl Iterator<Item = &String> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.hosts.len() + self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.tables.is_empty()
    }

    /// Hosts and tables joined for display.
    pub fn describe(&self) -> String {
        self.hosts
            .iter()
            .cloned()
            .chain(self.tables.iter().map(|t| format!("table {t}")))
            .collect::<Vec<_>>()
            .join(",")
    }
}
