use std::io;

use tokio::sync::watch;
use tracing::{info, warn};

use rollgate_health::{ExclusionSet, HealthGate, KsckOracle};
use rollgate_rollout::{ProcessDeployer, RollingExecutor, RunSummary};

use crate::RunArgs;
use crate::confirm::{Confirmer, confirm_configuration};

pub async fn run(args: RunArgs, yes: bool, format: &str) -> anyhow::Result<()> {
    let settings = args.load_settings()?;

    let config = {
        let stdin = io::stdin();
        let mut confirmer = Confirmer::new(stdin.lock(), io::stderr()).assume_yes(yes);
        confirm_configuration(&settings, &mut confirmer)?
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current step");
            let _ = shutdown_tx.send(true);
        }
    });

    let oracle = KsckOracle::new(&config.kudu_bin, &config.master_addresses);
    let gate = HealthGate::new(oracle, shutdown_rx.clone()).with_timing(&config.timing);
    let mut executor = RollingExecutor::new(gate, ProcessDeployer, shutdown_rx)
        .with_settle_interval(config.timing.settle_interval);

    let mut exclusions = ExclusionSet::from_config(&config);
    info!(excluded = %exclusions.describe(), "initial exclusion set");

    let summary = executor.run(&config, &mut exclusions).await?;
    print_summary(&summary, format)
}

fn print_summary(summary: &RunSummary, format: &str) -> anyhow::Result<()> {
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        _ => {
            println!(
                "✓ {} on {}: {} task(s) completed",
                summary.operation,
                summary.cluster,
                summary.tasks.len()
            );
            for outcome in &summary.tasks {
                let status = outcome
                    .exit_status
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                match &outcome.stopped_node {
                    Some(node) => println!("  task {:<5} exit {status:<6} stopped {node}", outcome.task),
                    None => println!("  task {:<5} exit {status}", outcome.task),
                }
            }
            if !summary.excluded.is_empty() {
                println!("  excluded: {}", summary.excluded.join(","));
            }
        }
    }
    Ok(())
}
