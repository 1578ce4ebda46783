//! Print recent runs from the history database.

use anyhow::Result;

use crate::config::Config;
use crate::daemon::HistoryStore;

pub fn execute(config: &Config, limit: usize) -> Result<()> {
    let path = config.history_path();
    if !path.exists() {
        println!("No runs recorded yet ({} does not exist)", path.display());
        return Ok(());
    }

    let store = HistoryStore::open(&path, config.history.keep)?;
    let records = store.recent(limit)?;
    if records.is_empty() {
        println!("No runs recorded yet");
        return Ok(());
    }

    for record in records {
        let detail = match (&record.report, &record.error) {
            (Some(report), _) if report.dry_run => format!("dry run: {}", report.summary()),
            (Some(report), _) => report.summary(),
            (None, Some(error)) => format!("FAILED: {error}"),
            (None, None) => "no details".to_string(),
        };
        println!(
            "{}  {:<8}  {}  {detail}",
            record.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            record.trigger.as_str(),
            record.run_id,
        );
    }
    Ok(())
}
