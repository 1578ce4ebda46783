//! Shared constants and defaults.

/// Reserved object name the store uses to keep empty partitions visible.
pub const PLACEHOLDER_MARKER: &str = ".emptyFolderPlaceholder";

/// Default bucket holding uploaded site images.
pub const DEFAULT_BUCKET: &str = "images";

/// Maximum number of objects requested per listing page.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Number of paths sent in a single delete request.
pub const DEFAULT_DELETE_BATCH_SIZE: usize = 100;

/// Upper bound on listing pages per partition.
///
/// A store that ignores the offset would otherwise page forever.
pub const MAX_PAGES_PER_PARTITION: u32 = 10_000;

/// Upper bound on pages fetched for one reference query.
pub const MAX_PAGES_PER_QUERY: u32 = 10_000;

/// Grace period used by the scheduled job (7 days).
pub const SCHEDULED_GRACE_PERIOD_HOURS: u64 = 7 * 24;

/// Grace period used by the library helper (24 hours).
pub const LIBRARY_GRACE_PERIOD_HOURS: u64 = 24;

/// Grace periods below this trigger a configuration warning.
pub const MIN_RECOMMENDED_GRACE_PERIOD_HOURS: u64 = 1;

/// Partitions scanned by the scheduled job.
pub const DEFAULT_PARTITIONS: &[&str] = &["events", "gallery", "sponsors"];

/// Tables and columns that hold image references.
pub const DEFAULT_REFERENCE_SOURCES: &[(&str, &str)] = &[
    ("events", "image_url"),
    ("photos", "image_url"),
    ("sponsorships", "logo_url"),
];

/// Default port for the trigger endpoint.
pub const DEFAULT_PORT: u16 = 8787;

/// Default cron expression: daily at 03:00 UTC (sec min hour day month weekday).
pub const DEFAULT_CRON: &str = "0 0 3 * * *";

/// Number of cleanup reports retained in the history database.
pub const DEFAULT_HISTORY_KEEP: usize = 50;

/// Default HTTP timeout for calls to the hosted backend.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Retries per backend call on transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default config file name.
pub const DEFAULT_CONFIG_FILE: &str = "asset-gc.toml";

/// Environment variable holding the backend service key.
pub const DEFAULT_SERVICE_KEY_ENV: &str = "ASSET_GC_SERVICE_KEY";

/// Environment variable holding the trigger shared secret.
pub const DEFAULT_TRIGGER_SECRET_ENV: &str = "ASSET_GC_CRON_SECRET";
