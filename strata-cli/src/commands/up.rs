//! The `up` command: run the whole pipeline.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use strata_core::{
    AwsCliBackend, FailurePolicy, InMemoryCloud, Orchestrator, PipelineConfig, RunReport,
    RunStatus, Severity,
};

use crate::prompt::ConsolePrompt;
use crate::signal;

/// Run every configured stage, then wiring and the smoke test.
pub async fn up(config_path: Option<&str>, dry_run: bool, keep_going: bool) -> Result<()> {
    let mut config = match config_path {
        Some(path) => PipelineConfig::load_from(Path::new(path))?,
        None => PipelineConfig::load()?,
    };
    config.validate()?;

    println!(
        "{} Running {} stage(s) in {}{}",
        "→".cyan().bold(),
        config.stages.len(),
        config.region.bold(),
        if dry_run { " (dry run)".dimmed().to_string() } else { String::new() }
    );
    for stage in &config.stages {
        println!("  {} {} {}", "•".dimmed(), stage.stack_name.bold(), stage.template_url.dimmed());
    }
    println!();

    let confirm = Arc::new(ConsolePrompt);
    let policy = FailurePolicy { halt_on_stack_failure: !keep_going, halt_on_wiring_failure: false };
    let mut cancel = signal::shutdown_signal();

    let report = if dry_run {
        let cloud = Arc::new(InMemoryCloud::new());
        for stage in &config.stages {
            cloud.script_statuses(&stage.stack_name, &["CREATE_IN_PROGRESS", "CREATE_COMPLETE"]);
        }
        // No real backend to wait on.
        config.poll_interval_secs = 0;
        Orchestrator::new(config, cloud.clone(), cloud.clone(), cloud, confirm)
            .with_failure_policy(policy)
            .run(&mut cancel)
            .await?
    } else {
        let backend = Arc::new(AwsCliBackend::new(config.region.clone())?);
        Orchestrator::new(config, backend.clone(), backend.clone(), backend, confirm)
            .with_failure_policy(policy)
            .run(&mut cancel)
            .await?
    };

    render_report(&report);

    match report.status {
        RunStatus::Completed | RunStatus::Declined { .. } => Ok(()),
        RunStatus::Halted { stage } => bail!("Pipeline halted at {}", stage),
    }
}

fn render_report(report: &RunReport) {
    #[derive(Tabled)]
    struct StepRow {
        #[tabled(rename = "STEP")]
        step: String,
        #[tabled(rename = "RESULT")]
        result: String,
        #[tabled(rename = "DETAIL")]
        detail: String,
    }

    let rows: Vec<StepRow> = report
        .stages
        .iter()
        .map(|s| StepRow {
            step: s.stage.clone(),
            result: match s.severity {
                Severity::Info => "ok".green().to_string(),
                Severity::Warning => "warning".yellow().to_string(),
                Severity::Fatal => "failed".red().to_string(),
            },
            detail: s.detail.clone(),
        })
        .collect();

    if !rows.is_empty() {
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{}", table);
    }

    for step in &report.stages {
        if step.outputs.is_empty() {
            continue;
        }
        println!();
        println!("{} outputs:", step.stage.bold());
        for output in &step.outputs {
            println!("  {} = {}", output.key, output.value.dimmed());
        }
    }

    println!();
    match &report.status {
        RunStatus::Completed => {
            println!("{} Pipeline complete", "✓".green().bold());
        }
        RunStatus::Declined { stage } => {
            println!("{} Stopped before {} at the operator's request", "•".yellow().bold(), stage.bold());
        }
        RunStatus::Halted { stage } => {
            println!("{} Pipeline halted at {}", "✗".red().bold(), stage.bold());
        }
    }
}
