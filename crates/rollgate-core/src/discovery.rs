//! Deploy client and health tool discovery.
//!
//! The deploy client is located from environment variables, one pair per
//! client generation. A generation is usable for a cluster only if its
//! per-cluster config file and its `deploy` binary both exist:
//!
//! ```text
//! $MINOS_CONFIG_FILE  → <dir>/xiaomi-config/conf/kudu/kudu-<cluster>.cfg
//! $MINOS_CLIENT_DIR   → <client>/deploy
//! $MINOS2_CONFIG_FILE → <dir>/xiaomi-config/conf/kudu/kudu-<cluster>.yaml
//! $MINOS2_CLIENT_DIR  → <client>/deploy
//! ```
//!
//! The first generation wins when both are present.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::types::DeployGeneration;

pub const MINOS_CONFIG_FILE: &str = "MINOS_CONFIG_FILE";
pub const MINOS_CLIENT_DIR: &str = "MINOS_CLIENT_DIR";
pub const MINOS2_CONFIG_FILE: &str = "MINOS2_CONFIG_FILE";
pub const MINOS2_CLIENT_DIR: &str = "MINOS2_CLIENT_DIR";
pub const KUDU_HOME: &str = "KUDU_HOME";

/// Location and generation of the deploy client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployClient {
    pub generation: DeployGeneration,
    pub dir: PathBuf,
}

impl DeployClient {
    pub fn new(generation: DeployGeneration, dir: impl Into<PathBuf>) -> Self {
        Self {
            generation,
            dir: dir.into(),
        }
    }

    /// Path of the `deploy` executable.
    pub fn deploy_binary(&self) -> PathBuf {
        self.dir.join("deploy")
    }
}

/// Locate the deploy client for `cluster` from the process environment.
pub fn discover_deploy_client(cluster: &str) -> ConfigResult<DeployClient> {
    discover_with(cluster, |key| std::env::var(key).ok())
}

/// Locate the deploy client using `env` to read environment variables.
pub fn discover_with<F>(cluster: &str, env: F) -> ConfigResult<DeployClient>
where
    F: Fn(&str) -> Option<String>,
{
    let candidates = [
        (DeployGeneration::Minos1, MINOS_CONFIG_FILE, MINOS_CLIENT_DIR),
        (DeployGeneration::Minos2, MINOS2_CONFIG_FILE, MINOS2_CLIENT_DIR),
    ];

    for (generation, config_var, client_var) in candidates {
        let (Some(config_file), Some(client_dir)) = (env(config_var), env(client_var)) else {
            debug!(%generation, "deploy client environment not set");
            continue;
        };

        let cluster_config = cluster_config_path(Path::new(&config_file), generation, cluster);
        let client = DeployClient::new(generation, client_dir);

        if cluster_config.exists() && client.deploy_binary().exists() {
            debug!(
                %generation,
                config = %cluster_config.display(),
                client = %client.dir.display(),
                "deploy client found"
            );
            return Ok(client);
        }

        debug!(
            %generation,
            config = %cluster_config.display(),
            deploy = %client.deploy_binary().display(),
            "deploy client incomplete for cluster"
        );
    }

    Err(ConfigError::DeployClientNotFound {
        cluster: cluster.to_string(),
    })
}

/// Per-cluster config file that sits next to the deploy client's main config.
fn cluster_config_path(config_file: &Path, generation: DeployGeneration, cluster: &str) -> PathBuf {
    let base = config_file.parent().unwrap_or_else(|| Path::new(""));
    base.join("xiaomi-config")
        .join("conf")
        .join("kudu")
        .join(format!("kudu-{cluster}.{}", generation.config_extension()))
}

/// Resolve the `kudu` binary used for health checks.
///
/// Search order: explicit path, `$KUDU_HOME/kudu`, then `kudu` on `$PATH`.
pub fn resolve_kudu_binary(explicit: Option<&Path>) -> PathBuf {
    resolve_kudu_binary_with(explicit, |key| std::env::var(key).ok())
}

fn resolve_kudu_binary_with<F>(explicit: Option<&Path>, env: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match env(KUDU_HOME) {
        Some(home) if !home.trim().is_empty() => PathBuf::from(home).join("kudu"),
        _ => PathBuf::from("kudu"),
    }
}
