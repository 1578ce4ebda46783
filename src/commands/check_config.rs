//! Validate the configuration and print the effective policy.

use anyhow::Result;

use crate::config::Config;

pub fn execute(config: &Config) -> Result<()> {
    let result = super::validate(config)?;
    let policy = config.to_policy();

    println!("Configuration OK");
    println!("================");
    println!(
        "Backend:      {}",
        config.backend.url.as_deref().unwrap_or("<unset>")
    );
    println!("Bucket:       {}", config.backend.bucket);
    println!(
        "Partitions:   {}",
        policy
            .partitions
            .iter()
            .map(|p| if p.is_empty() { "<root>" } else { p.as_str() })
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Grace period: {}h", policy.grace_period.as_secs() / 3600);
    println!(
        "References:   {}",
        policy
            .reference_sources
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("On failure:   {:?}", policy.on_reference_failure);
    if config.schedule.enabled {
        println!("Schedule:     {} (UTC)", config.schedule.cron);
    } else {
        println!("Schedule:     disabled");
    }
    println!("History:      {}", config.history_path().display());

    if result.has_warnings() {
        println!();
        println!("{} warning(s) above", result.warnings.len());
    }
    Ok(())
}
