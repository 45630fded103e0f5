use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::error;

use rollgate_core::{RunSettings, TaskList};

mod commands;
mod confirm;

#[derive(Parser)]
#[command(
    name = "rollgate",
    about = "Health-gated rolling maintenance for Kudu clusters",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stop, restart or rolling-update tasks one at a time.
    ///
    /// Every value is echoed for confirmation first. Before the first task
    /// and after each task the run waits until every unhealthy node is
    /// either known-unhealthy or was stopped by this run.
    Run {
        #[command(flatten)]
        run: RunArgs,
        /// Skip the confirmation prompts.
        #[arg(short, long)]
        yes: bool,
        /// Summary format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Print the resolved configuration and deploy commands without running.
    Plan {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Run one health check and report what is unhealthy.
    Check {
        #[command(flatten)]
        run: RunArgs,
    },
}

/// Run parameters. Flags override values from `--config`.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// TOML file with run settings.
    #[arg(short, long, env = "ROLLGATE_CONFIG")]
    pub config: Option<PathBuf>,
    /// Cluster name in the deploy client config.
    #[arg(long)]
    pub cluster: Option<String>,
    /// Service tag passed to the deploy client (default: kudu).
    #[arg(long)]
    pub service: Option<String>,
    /// Job to operate on (default: tablet_server).
    #[arg(long)]
    pub job: Option<String>,
    /// stop, restart or rolling_update.
    #[arg(long)]
    pub operation: Option<String>,
    /// Tasks, e.g. "0..5" or "1,3,7-9".
    #[arg(long)]
    pub tasks: Option<String>,
    /// Master RPC addresses, or an @cluster alias.
    #[arg(long, env = "KUDU_MASTERS")]
    pub masters: Option<String>,
    /// Extra deploy client flags, e.g. "--update_config".
    #[arg(long, allow_hyphen_values = true)]
    pub flags: Option<String>,
    /// Host allowed to be unhealthy from the start. Repeatable.
    #[arg(long = "known-unhealthy", value_delimiter = ',')]
    pub known_unhealthy_hosts: Vec<String>,
    /// Table allowed to be unhealthy from the start. Repeatable.
    #[arg(long = "known-unhealthy-table", value_delimiter = ',')]
    pub known_unhealthy_tables: Vec<String>,
    /// Path to the kudu binary (default: $KUDU_HOME/kudu).
    #[arg(long)]
    pub kudu_bin: Option<PathBuf>,
    /// Deploy client directory; skips environment discovery.
    #[arg(long)]
    pub deploy_client_dir: Option<PathBuf>,
    /// Deploy client generation: minos1.0 or minos2.0.
    #[arg(long)]
    pub deploy_generation: Option<String>,
    /// Delay between health checks while unhealthy (default: 5s).
    #[arg(long)]
    pub poll_interval: Option<String>,
    /// Delay after each task once healthy (default: 10s).
    #[arg(long)]
    pub settle_interval: Option<String>,
    /// Abort if the cluster stays unhealthy this long (default: wait forever).
    #[arg(long)]
    pub gate_timeout: Option<String>,
}

impl RunArgs {
    /// Settings from `--config`, overridden by flags.
    pub fn load_settings(self) -> anyhow::Result<RunSettings> {
        let base = match &self.config {
            Some(path) => RunSettings::from_file(path)?,
            None => RunSettings::default(),
        };
        Ok(base.merge(self.into_settings()))
    }

    fn into_settings(self) -> RunSettings {
        RunSettings {
            cluster: self.cluster,
            service: self.service,
            job: self.job,
            operation: self.operation,
            tasks: self.tasks.map(TaskList::Expr),
            masters: self.masters,
            flags: self.flags,
            known_unhealthy_hosts: self.known_unhealthy_hosts,
            known_unhealthy_tables: self.known_unhealthy_tables,
            kudu_bin: self.kudu_bin,
            deploy_client_dir: self.deploy_client_dir,
            deploy_generation: self.deploy_generation,
            poll_interval: self.poll_interval,
            settle_interval: self.settle_interval,
            gate_timeout: self.gate_timeout,
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let result = match cli.command {
        Commands::Run { run, yes, format } => commands::run::run(run, yes, &format).await,
        Commands::Plan { run } => commands::plan::plan(run),
        Commands::Check { run } => commands::check::check(run).await,
    };

    if let Err(e) = &result {
        error!("{e:#}");
    }
    result
}
