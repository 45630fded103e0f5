//! Health oracle — asks the cluster health tool what is unhealthy.
//!
//! The production oracle shells out to `kudu cluster ksck` with consensus
//! checks disabled and only the master, tablet server, and table summary
//! sections requested. Exit code 0 means healthy; exit code 1 means the
//! check ran to completion and found problems. Both produce a report worth
//! parsing. Anything else collapses into `ClusterHealthReport::unknown()`.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::report::ClusterHealthReport;

/// Exit codes after which the ksck report can be trusted.
const TRUSTED_EXIT_CODES: [i32; 2] = [0, 1];

/// Source of cluster health reports.
///
/// Implementations never fail: an unusable health source is reported as
/// `UnhealthyEntity::Unknown` so that the gate blocks instead of passing.
pub trait HealthOracle {
    fn check_health(&self) -> impl Future<Output = ClusterHealthReport> + Send;
}

/// Oracle backed by the `kudu cluster ksck` command.
#[derive(Debug, Clone)]
pub struct KsckOracle {
    kudu_bin: PathBuf,
    masters: String,
}

impl KsckOracle {
    /// `masters` is passed to ksck verbatim: a comma-separated address
    /// list, or an `@cluster` alias.
    pub fn new(kudu_bin: impl Into<PathBuf>, masters: impl Into<String>) -> Self {
        Self {
            kudu_bin: kudu_bin.into(),
            masters: masters.into(),
        }
    }

    /// Arguments passed to the `kudu` binary.
    pub fn args(&self) -> Vec<String> {
        vec![
            "cluster".to_string(),
            "ksck".to_string(),
            self.masters.clone(),
            "-consensus=false".to_string(),
            "-ksck_format=json_compact".to_string(),
            "-color=never".to_string(),
            "-sections=MASTER_SUMMARIES,TSERVER_SUMMARIES,TABLE_SUMMARIES".to_string(),
        ]
    }
}

impl HealthOracle for KsckOracle {
    async fn check_health(&self) -> ClusterHealthReport {
        let output = Command::new(&self.kudu_bin)
            .args(self.args())
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) => interpret(output.status.code(), &output.stdout),
            Err(e) => {
                warn!(bin = %self.kudu_bin.display(), error = %e, "failed to run health check");
                ClusterHealthReport::unknown()
            }
        }
    }
}

/// Turn a ksck exit code and stdout into a report.
pub fn interpret(exit_code: Option<i32>, stdout: &[u8]) -> ClusterHealthReport {
    let Some(code) = exit_code.filter(|c| TRUSTED_EXIT_CODES.contains(c)) else {
        warn!(?exit_code, "health check exited abnormally");
        return ClusterHealthReport::unknown();
    };

    let text = String::from_utf8_lossy(stdout);
    match ClusterHealthReport::from_ksck_json(text.trim()) {
        Ok(report) => {
            debug!(code, unhealthy = report.len(), "health check report parsed");
            report
        }
        Err(e) => {
            warn!(code, error = %e, "health check output is not a ksck report");
            ClusterHealthReport::unknown()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::UnhealthyEntity;

    const REPORT: &str = r#"{"master_summaries":[{"address":"m1:7051","health":"HEALTHY"}],"tserver_summaries":[{"address":"ts1:7050","health":"UNAVAILABLE"}]}"#;

    #[test]
    fn ksck_arguments() {
        let oracle = KsckOracle::new("/opt/kudu/kudu", "m1:7051,m2:7051");
        let args = oracle.args();
        assert_eq!(&args[..3], ["cluster", "ksck", "m1:7051,m2:7051"]);
        assert!(args.contains(&"-consensus=false".to_string()));
        assert!(args.contains(&"-ksck_format=json_compact".to_string()));
        assert!(args.contains(&"-color=never".to_string()));
        assert!(
            args.iter()
                .any(|a| a == "-sections=MASTER_SUMMARIES,TSERVER_SUMMARIES,TABLE_SUMMARIES")
        );
    }

    #[test]
    fn trusted_exit_codes_are_parsed() {
        for code in [0, 1] {
            let report = interpret(Some(code), REPORT.as_bytes());
            assert_eq!(
                report.unhealthy().cloned().collect::<Vec<_>>(),
                vec![UnhealthyEntity::Host("ts1".into())]
            );
        }
    }

    #[test]
    fn other_exit_codes_are_unknown() {
        assert!(interpret(Some(2), REPORT.as_bytes()).is_unknown());
        assert!(interpret(None, REPORT.as_bytes()).is_unknown());
    }

    #[test]
    fn garbage_output_is_unknown() {
        assert!(interpret(Some(0), b"Network error: could not connect").is_unknown());
    }

    #[tokio::test]
    async fn missing_binary_is_unknown() {
        let oracle = KsckOracle::new("/nonexistent/kudu", "m1:7051");
        assert!(oracle.check_health().await.is_unknown());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn abandoned_check_kills_the_health_tool() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let kudu = dir.path().join("kudu");
        std::fs::write(
            &kudu,
            format!("#!/bin/sh\nsleep 2\ntouch '{}'\n", marker.display()),
        )
        .unwrap();
        std::fs::set_permissions(&kudu, std::fs::Permissions::from_mode(0o755)).unwrap();

        let oracle = KsckOracle::new(&kudu, "m1:7051");
        let abandoned =
            tokio::time::timeout(Duration::from_millis(200), oracle.check_health()).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!marker.exists(), "health tool kept running after the check was dropped");
    }
}
