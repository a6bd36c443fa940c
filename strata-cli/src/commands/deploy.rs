//! The `deploy` command: create one stack and wait for it to settle.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tabled::{settings::Style, Table, Tabled};

use strata_core::{AwsCliBackend, Capability, StackDeployer, StackRequest};

use crate::signal;

pub async fn deploy(
    name: &str,
    template_url: &str,
    capabilities: &[String],
    region: &str,
) -> Result<()> {
    let mut request = StackRequest::new(name, template_url);
    for token in capabilities {
        request = request.with_capability(parse_capability(token)?);
    }

    let backend = Arc::new(AwsCliBackend::new(region)?);
    let deployer = StackDeployer::new(backend);
    let mut cancel = signal::shutdown_signal();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.set_message(format!("Creating stack '{}' (this may take a while)...", name));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = deployer.deploy(&request, &mut cancel).await;
    spinner.finish_and_clear();
    let outcome = outcome?;

    if !outcome.succeeded() {
        println!("{} Stack failed: {}", "✗".red().bold(), name.bold());
        bail!("Stack {} ended in a failure state", name);
    }

    println!("{} Stack created: {}", "✓".green().bold(), name.bold());

    if !outcome.outputs.is_empty() {
        #[derive(Tabled)]
        struct OutputRow {
            #[tabled(rename = "OUTPUT")]
            key: String,
            #[tabled(rename = "VALUE")]
            value: String,
        }

        let rows: Vec<OutputRow> = outcome
            .outputs
            .iter()
            .map(|o| OutputRow { key: o.key.clone(), value: o.value.clone() })
            .collect();

        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!();
        println!("{}", table);
    }

    Ok(())
}

fn parse_capability(token: &str) -> Result<Capability> {
    match token {
        "CAPABILITY_IAM" => Ok(Capability::Iam),
        "CAPABILITY_NAMED_IAM" => Ok(Capability::NamedIam),
        "CAPABILITY_AUTO_EXPAND" => Ok(Capability::AutoExpand),
        other => bail!("Unknown capability token: {}", other),
    }
}
