//! Run one cleanup in the foreground and print the report.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::daemon::Trigger;
use crate::gc::RunMode;

/// Runs the collector once.
///
/// Prints the report as pretty JSON on stdout and a summary on stderr.
/// Fails when the run ends with warnings, failed deletes or skipped
/// candidates, so schedulers notice partial runs.
pub async fn execute(config: &Config, dry_run: bool) -> Result<()> {
    super::validate(config)?;
    let runner = super::build_runner(config)?;

    let mode = if dry_run {
        RunMode::DryRun
    } else {
        RunMode::Delete
    };
    let report = runner.run(mode, Trigger::Cli).await?;

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{json}");

    if dry_run {
        eprintln!("Dry run: {} objects would be deleted", report.candidates.len());
    }
    eprintln!("{}", report.summary());

    if !report.is_clean() {
        anyhow::bail!(
            "Cleanup finished with problems: {} warnings, {} failed deletes, {} skipped",
            report.warnings.len(),
            report.failed.len(),
            report.skipped.len()
        );
    }
    Ok(())
}
