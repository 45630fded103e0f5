//! Operator confirmation of run parameters.
//!
//! Every resolved value is echoed back and must be acknowledged with `y`
//! (or an empty answer) before anything touches the cluster.

use std::io::{BufRead, Write};

use anyhow::{Context, bail};

use rollgate_core::{RunConfiguration, RunSettings};

/// Asks yes/no questions on a line-oriented terminal.
pub struct Confirmer<R, W> {
    input: R,
    output: W,
    assume_yes: bool,
}

impl<R: BufRead, W: Write> Confirmer<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            assume_yes: false,
        }
    }

    /// Answer every question with yes, still echoing the values.
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    /// Echo `value` and wait for the operator's answer.
    ///
    /// Blank values are rejected unless `allow_empty`. End of input is a no.
    pub fn confirm(&mut self, message: &str, value: &str, allow_empty: bool) -> anyhow::Result<()> {
        if value.trim().is_empty() && !allow_empty {
            bail!("You should provide a valid parameter: {message}");
        }

        write!(self.output, "{message}: {value}? (y/n) ")?;
        if self.assume_yes {
            writeln!(self.output, "y")?;
            return Ok(());
        }
        self.output.flush()?;

        let mut answer = String::new();
        let read = self
            .input
            .read_line(&mut answer)
            .context("failed to read confirmation")?;
        if read == 0 {
            bail!("aborted by operator: no answer for {message}");
        }

        match answer.trim().to_lowercase().as_str() {
            "" | "y" => Ok(()),
            _ => bail!("aborted by operator at {message}"),
        }
    }
}

/// Validate `settings` and confirm each resolved value in turn.
pub fn confirm_configuration<R: BufRead, W: Write>(
    settings: &RunSettings,
    confirmer: &mut Confirmer<R, W>,
) -> anyhow::Result<RunConfiguration> {
    let cluster = settings.cluster()?;
    confirmer.confirm("Please confirm the cluster name", cluster, false)?;

    let client = settings.resolve_deploy_client()?;
    let config = RunConfiguration::from_settings(settings, client)?;

    confirmer.confirm(
        "Please confirm the deploy client generation",
        config.deploy_client.generation.as_str(),
        false,
    )?;
    confirmer.confirm(
        "Please confirm the deploy client path",
        &config.deploy_client.dir.display().to_string(),
        false,
    )?;
    confirmer.confirm("Please confirm the master addresses", &config.master_addresses, false)?;
    confirmer.confirm("Please confirm the job", &config.job, false)?;
    confirmer.confirm("Please confirm the tasks", &config.task_list(), false)?;
    confirmer.confirm("Please confirm the operation", config.operation.as_str(), false)?;
    confirmer.confirm("Please confirm the extra flags", &config.flags.join(" "), true)?;

    let known: Vec<String> = config
        .known_unhealthy_hosts
        .iter()
        .cloned()
        .chain(config.known_unhealthy_tables.iter().map(|t| format!("table {t}")))
        .collect();
    confirmer.confirm(
        "Please confirm the known unhealthy nodes",
        &known.join(","),
        true,
    )?;

    Ok(config)
}
