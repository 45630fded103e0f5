//! Health gate — block until everything unhealthy is excluded.
//!
//! The gate polls the oracle at a fixed interval with no backoff and no
//! retry cap. A cluster that stays unhealthy keeps the gate waiting; that
//! is normal operation, not an error. The wait ends early only when the
//! shutdown signal fires or an optional overall timeout expires.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use rollgate_core::Timing;

use crate::exclusion::ExclusionSet;
use crate::oracle::HealthOracle;

/// Why the gate stopped waiting without the cluster becoming healthy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("health gate cancelled")]
    Cancelled,

    #[error("cluster still unhealthy after {waited:?}: {unhealthy}")]
    TimedOut { waited: Duration, unhealthy: String },
}

/// Blocks a run until the cluster is healthy modulo the exclusion set.
pub struct HealthGate<O> {
    oracle: O,
    poll_interval: Duration,
    timeout: Option<Duration>,
    shutdown: watch::Receiver<bool>,
}

impl<O: HealthOracle> HealthGate<O> {
    /// Create a gate with a 5s poll interval and no timeout.
    pub fn new(oracle: O, shutdown: watch::Receiver<bool>) -> Self {
        let timing = Timing::default();
        Self {
            oracle,
            poll_interval: timing.poll_interval,
            timeout: timing.gate_timeout,
            shutdown,
        }
    }

    /// Take poll interval and timeout from the run's timing.
    pub fn with_timing(mut self, timing: &Timing) -> Self {
        self.poll_interval = timing.poll_interval;
        self.timeout = timing.gate_timeout;
        self
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Wait until every unhealthy entity the oracle reports is excluded.
    ///
    /// Returns as soon as one report is fully covered by `exclusions`,
    /// without sleeping if the first report already is.
    pub async fn wait_until_healthy(&self, exclusions: &ExclusionSet) -> Result<(), GateError> {
        let started = Instant::now();
        let mut shutdown = self.shutdown.clone();
        let mut polls: u64 = 0;

        info!("waiting for cluster to be healthy");

        loop {
            if *shutdown.borrow() {
                return Err(GateError::Cancelled);
            }

            let report = tokio::select! {
                report = self.oracle.check_health() => report,
                _ = cancelled(&mut shutdown) => return Err(GateError::Cancelled),
            };
            polls += 1;

            let blocking = exclusions.unexcluded(&report);
            if blocking.is_empty() {
                debug!(polls, excluded = report.len(), "cluster healthy");
                return Ok(());
            }

            if report.is_unknown() {
                warn!(polls, "health check gave no usable report, waiting for it to recover");
            } else {
                for entity in &blocking {
                    warn!(node = %entity, "unhealthy node");
                }
            }

            let mut wait = self.poll_interval;
            if let Some(timeout) = self.timeout {
                let waited = started.elapsed();
                if waited >= timeout {
                    let unhealthy = blocking
                        .iter()
                        .map(|e| e.to_string())
                        .collect::<Vec<_>>()
                        .join(",");
                    return Err(GateError::TimedOut { waited, unhealthy });
                }
                wait = wait.min(timeout - waited);
            }

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancelled(&mut shutdown) => return Err(GateError::Cancelled),
            }
        }
    }
}

/// Resolves once the shutdown flag is set. Never resolves if the sender
/// is dropped without setting it.
pub async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ClusterHealthReport, UnhealthyEntity};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted reports, repeating the last one forever.
    struct ScriptedOracle {
        reports: Mutex<VecDeque<ClusterHealthReport>>,
        calls: AtomicUsize,
    }

    impl ScriptedOracle {
        fn new(reports: impl IntoIterator<Item = ClusterHealthReport>) -> Self {
            Self {
                reports: Mutex::new(reports.into_iter().collect()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl HealthOracle for ScriptedOracle {
        async fn check_health(&self) -> ClusterHealthReport {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut reports = self.reports.lock().unwrap();
            if reports.len() > 1 {
                reports.pop_front().unwrap()
            } else {
                reports.front().cloned().unwrap_or_default()
            }
        }
    }

    fn host(h: &str) -> UnhealthyEntity {
        UnhealthyEntity::Host(h.to_string())
    }

    fn unhealthy(hosts: &[&str]) -> ClusterHealthReport {
        ClusterHealthReport::from_entities(hosts.iter().map(|h| host(h)))
    }

    fn timing(poll_secs: u64, timeout_secs: Option<u64>) -> Timing {
        Timing {
            poll_interval: Duration::from_secs(poll_secs),
            settle_interval: Duration::ZERO,
            gate_timeout: timeout_secs.map(Duration::from_secs),
        }
    }

    fn gate(oracle: ScriptedOracle) -> (HealthGate<ScriptedOracle>, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (HealthGate::new(oracle, rx), tx)
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_cluster_passes_without_delay() {
        let (gate, _tx) = gate(ScriptedOracle::new([ClusterHealthReport::healthy()]));
        let start = Instant::now();

        gate.wait_until_healthy(&ExclusionSet::default()).await.unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(gate.oracle().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn excluded_host_passes_immediately() {
        let (gate, _tx) = gate(ScriptedOracle::new([unhealthy(&["10.0.0.3"])]));
        let exclusions = ExclusionSet::new(["10.0.0.3".to_string()], []);
        let start = Instant::now();

        gate.wait_until_healthy(&exclusions).await.unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(gate.oracle().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_unexcluded_node_recovers() {
        let oracle = ScriptedOracle::new([
            unhealthy(&["10.0.0.3", "10.0.0.4"]),
            unhealthy(&["10.0.0.4"]),
            unhealthy(&["10.0.0.3"]),
        ]);
        let (gate, _tx) = gate(oracle);
        let exclusions = ExclusionSet::new(["10.0.0.3".to_string()], []);
        let start = Instant::now();

        gate.wait_until_healthy(&exclusions).await.unwrap();

        assert_eq!(gate.oracle().calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_interval_is_fixed() {
        let oracle = ScriptedOracle::new([
            unhealthy(&["a"]),
            unhealthy(&["a"]),
            unhealthy(&["a"]),
            unhealthy(&["a"]),
            ClusterHealthReport::healthy(),
        ]);
        let (gate, _tx) = gate(oracle);
        let gate = gate.with_timing(&timing(2, None));
        let start = Instant::now();

        gate.wait_until_healthy(&ExclusionSet::default()).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_report_blocks_indefinitely() {
        let (gate, _tx) = gate(ScriptedOracle::new([ClusterHealthReport::unknown()]));
        let exclusions = ExclusionSet::new(["<health check failed>".to_string()], []);

        let waited = tokio::time::timeout(
            Duration::from_secs(3600),
            gate.wait_until_healthy(&exclusions),
        )
        .await;

        assert!(waited.is_err(), "gate must not pass on an unknown report");
        assert!(gate.oracle().calls() > 700);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_the_wait() {
        let (gate, tx) = gate(ScriptedOracle::new([ClusterHealthReport::unknown()]));
        let exclusions = ExclusionSet::default();

        let cancel = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            tx.send(true).unwrap();
        };
        let (result, ()) = tokio::join!(gate.wait_until_healthy(&exclusions), cancel);

        assert_eq!(result, Err(GateError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn already_cancelled_gate_does_not_poll() {
        let (gate, tx) = gate(ScriptedOracle::new([ClusterHealthReport::healthy()]));
        tx.send(true).unwrap();

        let result = gate.wait_until_healthy(&ExclusionSet::default()).await;

        assert_eq!(result, Err(GateError::Cancelled));
        assert_eq!(gate.oracle().calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_reports_remaining_nodes() {
        let (gate, _tx) = gate(ScriptedOracle::new([unhealthy(&["10.0.0.5"])]));
        let gate = gate.with_timing(&timing(5, Some(12)));
        let start = Instant::now();

        let err = gate
            .wait_until_healthy(&ExclusionSet::default())
            .await
            .unwrap_err();

        match err {
            GateError::TimedOut { waited, unhealthy } => {
                assert_eq!(waited, Duration::from_secs(12));
                assert_eq!(unhealthy, "10.0.0.5");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(start.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn timing_applies_to_gate() {
        let (gate, _tx) = gate(ScriptedOracle::new([unhealthy(&["x"])]));
        let gate = gate.with_timing(&timing(1, Some(3)));

        let err = gate
            .wait_until_healthy(&ExclusionSet::default())
            .await
            .unwrap_err();

        assert!(matches!(err, GateError::TimedOut { .. }));
        // Checks at 0s, 1s, 2s and 3s.
        assert_eq!(gate.oracle().calls(), 4);
    }
}
