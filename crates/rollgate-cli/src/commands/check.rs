use anyhow::{Context, bail};

use rollgate_core::resolve_kudu_binary;
use rollgate_health::{ExclusionSet, HealthOracle, KsckOracle};

use crate::RunArgs;

pub async fn check(args: RunArgs) -> anyhow::Result<()> {
    let settings = args.load_settings()?;
    let masters = settings
        .masters
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .context("masters are required for a health check")?;

    let oracle = KsckOracle::new(resolve_kudu_binary(settings.kudu_bin.as_deref()), masters);
    let exclusions = ExclusionSet::new(
        settings.known_unhealthy_hosts.iter().cloned(),
        settings.known_unhealthy_tables.iter().cloned(),
    );

    let report = oracle.check_health().await;
    if report.is_healthy() {
        println!("✓ cluster is healthy");
        return Ok(());
    }

    for entity in report.unhealthy() {
        let marker = if exclusions.contains(entity) { "excluded" } else { "blocking" };
        println!("  {marker:<9} {entity}");
    }

    let blocking = exclusions.unexcluded(&report);
    if !blocking.is_empty() {
        bail!("{} unhealthy entit(ies) would block a run", blocking.len());
    }
    println!("✓ only known-unhealthy entities are unhealthy");
    Ok(())
}
