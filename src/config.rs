//! Configuration types for asset-gc.
//!
//! Settings are loaded from a TOML file (`asset-gc.toml` by default) and
//! validated before any backend is contacted. It includes:
//!
//! - [`Config`] - Root configuration struct
//! - [`BackendConfig`] - Hosted storage and REST endpoint
//! - [`PolicyConfig`] - Overrides for the retention policy presets
//! - [`ScheduleConfig`] / [`ServerConfig`] - Daemon settings
//!
//! Secrets are never read from the file. The file names the environment
//! variables that hold them.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants;
use crate::gc::{ReferenceFailureMode, RetentionPolicy};
use crate::references::ReferenceSourceSpec;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// asset-gc.toml configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub references: ReferencesConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the hosted project, e.g. `https://abc.supabase.co`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_service_key_env")]
    pub service_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries per backend call on transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            bucket: default_bucket(),
            service_key_env: default_service_key_env(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Which built-in policy the overrides apply to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyPreset {
    #[default]
    Scheduled,
    Library,
}

/// Retention policy overrides. Unset fields keep the preset's value.
#[derive(Debug, Default, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub preset: PolicyPreset,
    #[serde(default)]
    pub grace_period_hours: Option<u64>,
    #[serde(default)]
    pub partitions: Option<Vec<String>>,
    #[serde(default)]
    pub placeholder_marker: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub delete_batch_size: Option<usize>,
    #[serde(default)]
    pub on_reference_failure: ReferenceFailureMode,
    #[serde(default)]
    pub deadline_secs: Option<u64>,
    #[serde(default)]
    pub references: Option<Vec<ReferenceSourceSpec>>,
}

/// Where reference rows are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceBackend {
    /// The hosted REST interface, using the backend credentials.
    #[default]
    Rest,
    /// A local SQLite database.
    Sqlite,
}

#[derive(Debug, Deserialize)]
pub struct ReferencesConfig {
    #[serde(default)]
    pub backend: ReferenceBackend,
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
    #[serde(default = "default_reference_page_size")]
    pub page_size: u32,
}

impl Default for ReferencesConfig {
    fn default() -> Self {
        Self {
            backend: ReferenceBackend::default(),
            sqlite_path: None,
            page_size: default_reference_page_size(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Six-field cron expression (seconds first), evaluated in UTC.
    #[serde(default = "default_cron")]
    pub cron: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron: default_cron(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_trigger_secret_env")]
    pub trigger_secret_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            trigger_secret_env: default_trigger_secret_env(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryConfig {
    /// Defaults to `<data dir>/asset-gc/history.redb`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_history_keep")]
    pub keep: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            keep: default_history_keep(),
        }
    }
}

fn default_bucket() -> String {
    constants::DEFAULT_BUCKET.to_string()
}

fn default_service_key_env() -> String {
    constants::DEFAULT_SERVICE_KEY_ENV.to_string()
}

fn default_timeout_secs() -> u64 {
    constants::DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    constants::DEFAULT_MAX_RETRIES
}

fn default_reference_page_size() -> u32 {
    constants::DEFAULT_PAGE_SIZE
}

fn default_true() -> bool {
    true
}

fn default_cron() -> String {
    constants::DEFAULT_CRON.to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    constants::DEFAULT_PORT
}

fn default_trigger_secret_env() -> String {
    constants::DEFAULT_TRIGGER_SECRET_ENV.to_string()
}

fn default_history_keep() -> usize {
    constants::DEFAULT_HISTORY_KEEP
}

impl Config {
    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Fields have invalid types
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load an explicitly named file, or `asset-gc.toml` in the current
    /// directory when present, or the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be read or parsed.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let default_path = Path::new(constants::DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            Self::load_from(default_path)
        } else {
            tracing::debug!("No {} found, using defaults", constants::DEFAULT_CONFIG_FILE);
            Ok(Self::default())
        }
    }

    /// Builds the retention policy from the preset and overrides.
    #[must_use]
    pub fn to_policy(&self) -> RetentionPolicy {
        let p = &self.policy;
        let mut policy = match p.preset {
            PolicyPreset::Scheduled => RetentionPolicy::scheduled(),
            PolicyPreset::Library => RetentionPolicy::library(),
        };

        if let Some(hours) = p.grace_period_hours {
            policy = policy.with_grace_period(Duration::from_secs(hours.saturating_mul(3600)));
        }
        if let Some(partitions) = &p.partitions {
            policy = policy.with_partitions(partitions.iter().cloned());
        }
        if let Some(marker) = &p.placeholder_marker {
            policy.placeholder_marker.clone_from(marker);
        }
        if let Some(size) = p.page_size {
            policy = policy.with_page_size(size);
        }
        if let Some(size) = p.delete_batch_size {
            policy = policy.with_delete_batch_size(size);
        }
        if let Some(sources) = &p.references {
            policy = policy.with_reference_sources(sources.clone());
        }

        policy
            .with_reference_failure_mode(p.on_reference_failure)
            .with_deadline(p.deadline_secs.map(Duration::from_secs))
    }

    /// Reads the backend service key from its environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is unset or empty.
    pub fn service_key(&self) -> Result<String> {
        let name = &self.backend.service_key_env;
        match std::env::var(name) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => anyhow::bail!("Service key not set. Export it as {name}"),
        }
    }

    /// Reads the trigger secret. `None` leaves the endpoint unauthenticated.
    #[must_use]
    pub fn trigger_secret(&self) -> Option<String> {
        std::env::var(&self.server.trigger_secret_env)
            .ok()
            .filter(|secret| !secret.is_empty())
    }

    /// Resolved path of the run history database.
    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.history.path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("asset-gc")
                .join("history.redb")
        })
    }

    /// Validate configuration with comprehensive checks.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error listing every problem found, such as a missing
    /// backend URL, an unusable policy or an empty cron expression.
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Backend
        match &self.backend.url {
            None => errors.push(
                "backend.url is required\n  \
                 Example: url = \"https://your-project.supabase.co\""
                    .to_string(),
            ),
            Some(url) => match url::Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
                    if parsed.scheme() == "http" {
                        warnings.push(format!(
                            "backend.url uses plain http: {url}\n  \
                             The service key is sent with every request"
                        ));
                    }
                },
                Ok(parsed) => errors.push(format!(
                    "backend.url must use http or https (got: '{}')",
                    parsed.scheme()
                )),
                Err(e) => errors.push(format!("backend.url is not a valid URL: {e}")),
            },
        }

        if self.backend.bucket.is_empty() || self.backend.bucket.contains('/') {
            errors.push(format!(
                "backend.bucket must be a single non-empty name (got: '{}')",
                self.backend.bucket
            ));
        }

        if self.backend.timeout_secs == 0 {
            errors.push("backend.timeout_secs cannot be 0".to_string());
        }

        if self.backend.max_retries > 10 {
            warnings.push(format!(
                "backend.max_retries = {} is very high\n  \
                 A failing backend will stall the run for minutes",
                self.backend.max_retries
            ));
        }

        if std::env::var(&self.backend.service_key_env).is_err() {
            warnings.push(format!(
                "Environment variable {} is not set\n  \
                 Runs will fail until the service key is exported",
                self.backend.service_key_env
            ));
        }

        // 2. Policy
        let policy = self.to_policy();
        if let Some(problem) = policy.validate() {
            errors.push(format!("policy: {problem}"));
        }

        let min_grace = Duration::from_secs(constants::MIN_RECOMMENDED_GRACE_PERIOD_HOURS * 3600);
        if policy.grace_period < min_grace {
            warnings.push(format!(
                "Grace period of {}s is below {} hour\n  \
                 Objects uploaded moments ago may be deleted before their row is saved",
                policy.grace_period.as_secs(),
                constants::MIN_RECOMMENDED_GRACE_PERIOD_HOURS
            ));
        }

        if policy.on_reference_failure == ReferenceFailureMode::Degrade {
            warnings.push(
                "policy.on_reference_failure = \"degrade\"\n  \
                 A failed reference query makes its objects look unreferenced; \
                 set it to \"abort\" to skip deletion instead"
                    .to_string(),
            );
        }

        // 3. References
        if self.references.backend == ReferenceBackend::Sqlite {
            match &self.references.sqlite_path {
                None => errors.push(
                    "references.sqlite_path is required when references.backend = \"sqlite\""
                        .to_string(),
                ),
                Some(path) if !path.is_file() => {
                    errors.push(format!(
                        "references.sqlite_path does not exist: {}",
                        path.display()
                    ));
                },
                Some(_) => {},
            }
        }
        if self.references.page_size == 0 {
            errors.push("references.page_size cannot be 0".to_string());
        }

        // 4. Schedule
        if self.schedule.enabled {
            let fields = self.schedule.cron.split_whitespace().count();
            if !(6..=7).contains(&fields) {
                errors.push(format!(
                    "schedule.cron must have 6 or 7 fields, seconds first (got {fields}: '{}')\n  \
                     Example: cron = \"0 0 3 * * *\" (daily at 03:00 UTC)",
                    self.schedule.cron
                ));
            }
        }

        // 5. Server
        if self.server.port == 0 {
            errors.push(
                "Server port cannot be 0. Use a valid port number (1-65535)".to_string(),
            );
        } else if self.server.port < 1024 {
            warnings.push(format!(
                "Server port {} is a system/privileged port (< 1024)\n  \
                 Recommendation: Use ports >= 1024 to avoid permission issues",
                self.server.port
            ));
        }

        if self.trigger_secret().is_none() {
            warnings.push(format!(
                "Environment variable {} is not set\n  \
                 POST /cron/cleanup will accept unauthenticated requests",
                self.server.trigger_secret_env
            ));
        }

        // 6. History
        if self.history.keep == 0 {
            errors.push("history.keep must be at least 1".to_string());
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        Ok(ValidationResult { warnings })
    }
}
