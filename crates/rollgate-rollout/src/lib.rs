//! rollgate-rollout — sequential rolling maintenance with health gates.
//!
//! Tasks are operated on one at a time. Before the first task and after
//! every task the health gate must pass; a stop additionally adds the
//! stopped node to the exclusion set so the gate does not wait for a node
//! the run itself took down.
//!
//! # Components
//!
//! - **`deploy`** — Deploy client invocation (`deploy <op> <service> <cluster> ...`)
//! - **`parse`** — Extraction of the stopped node from deploy output
//! - **`executor`** — The run loop and its phase state machine

pub mod deploy;
pub mod error;
pub mod executor;
pub mod parse;

pub use deploy::{DeployRequest, Deployer, ProcessDeployer};
pub use error::{RolloutError, RolloutResult};
pub use executor::{RollingExecutor, RunPhase, RunSummary, TaskOutcome};
pub use parse::stopped_node;
