//! Extraction of the stopped node from deploy client output.
//!
//! The deploy client reports a successful tablet server stop as
//!
//! ```text
//! Stop task 3 of tablet_server on host-7.cluster.local(0) success
//! ```
//!
//! Only that line shape is recognised. Anything else yields `None`.

use std::sync::LazyLock;

use regex::Regex;

use rollgate_core::NodeId;

static STOP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Stop task [0-9]+ of tablet_server on ([0-9a-z.-]+)\(0\).+")
        .expect("stop line pattern is valid")
});

/// The host of the first tablet server the output reports as stopped.
pub fn stopped_node(output: &str) -> Option<NodeId> {
    STOP_LINE
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_host() {
        let output = "Stop task 3 of tablet_server on host-7.cluster.local(0) ...";
        assert_eq!(stopped_node(output).as_deref(), Some("host-7.cluster.local"));
    }

    #[test]
    fn finds_line_inside_longer_output() {
        let output = "\
Stopping task 12 of tablet_server ...
Stop task 12 of tablet_server on 10.38.1.17(0) success
Cleaning up";
        assert_eq!(stopped_node(output).as_deref(), Some("10.38.1.17"));
    }

    #[test]
    fn other_jobs_are_ignored() {
        let output = "Stop task 0 of master on host-1(0) success";
        assert_eq!(stopped_node(output), None);
    }

    #[test]
    fn no_match_is_none() {
        assert_eq!(stopped_node(""), None);
        assert_eq!(stopped_node("Restart task 3 of tablet_server on host-7(0) ok"), None);
        // Nothing after the instance marker.
        assert_eq!(stopped_node("Stop task 3 of tablet_server on host-7(0)"), None);
        // Instance other than 0.
        assert_eq!(stopped_node("Stop task 3 of tablet_server on host-7(1) ok"), None);
    }
}
