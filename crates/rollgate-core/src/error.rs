//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that invalidate a run before any task is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required parameter: {0}")]
    Missing(&'static str),

    #[error("{0} is not a valid integer task id")]
    InvalidTask(String),

    #[error("invalid task range: {0}")]
    InvalidRange(String),

    #[error("task range {range} spans more than {max} tasks")]
    RangeTooLarge { range: String, max: u32 },

    #[error("unknown operation: {0} (expected stop, restart or rolling_update)")]
    UnknownOperation(String),

    #[error("unknown deploy client generation: {0} (expected minos1.0 or minos2.0)")]
    UnknownGeneration(String),

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error(
        "no deploy client found for cluster {cluster}. You should set these environment variables:\n\
         * MINOS_CONFIG_FILE\n\
         * MINOS_CLIENT_DIR\n\
         * MINOS2_CONFIG_FILE\n\
         * MINOS2_CLIENT_DIR\n\
         and check the cluster name"
    )]
    DeployClientNotFound { cluster: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
