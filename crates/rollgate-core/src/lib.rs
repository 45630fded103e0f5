//! rollgate-core — shared types and run configuration.
//!
//! Everything a rolling maintenance run needs to know before it touches
//! the cluster: which deploy client to drive, which tasks to operate on,
//! and which nodes are allowed to be unhealthy from the start.

pub mod config;
pub mod discovery;
pub mod error;
pub mod types;

pub use config::{RunConfiguration, RunSettings, TaskList, Timing, parse_duration};
pub use discovery::{DeployClient, discover_deploy_client, resolve_kudu_binary};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
