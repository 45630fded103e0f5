use rollgate_core::RunConfiguration;
use rollgate_health::ExclusionSet;
use rollgate_rollout::DeployRequest;

use crate::RunArgs;

pub fn plan(args: RunArgs) -> anyhow::Result<()> {
    let settings = args.load_settings()?;
    let client = settings.resolve_deploy_client()?;
    let config = RunConfiguration::from_settings(&settings, client)?;

    println!("cluster:    {}", config.cluster);
    println!(
        "client:     {} ({})",
        config.deploy_client.dir.display(),
        config.deploy_client.generation
    );
    println!("masters:    {}", config.master_addresses);
    println!("job:        {}", config.job);
    println!("operation:  {}", config.operation);
    println!("tasks:      {}", config.task_list());
    println!("excluded:   {}", ExclusionSet::from_config(&config).describe());
    println!(
        "timing:     poll {:?}, settle {:?}, timeout {}",
        config.timing.poll_interval,
        config.timing.settle_interval,
        config
            .timing
            .gate_timeout
            .map(|t| format!("{t:?}"))
            .unwrap_or_else(|| "none".to_string())
    );
    println!();

    for &task in &config.tasks {
        println!("{}", DeployRequest::for_task(&config, task).command_line());
    }

    Ok(())
}
