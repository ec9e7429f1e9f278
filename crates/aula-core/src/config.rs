use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::limiter::RateLimits;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    #[must_use]
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Authoritative schedule feed
    pub timetable: TimetableConfig,

    /// Lesson registry service
    pub registry: RegistryConfig,

    /// Mirrored calendar service
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Reconciliation pass behavior
    #[serde(default)]
    pub sync: SyncOptions,

    /// Per-service concurrency bounds
    #[serde(default)]
    pub limits: RateLimits,

    /// Google OAuth settings
    #[serde(default)]
    pub google: GoogleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableConfig {
    /// Base URL of the schedule feed API
    pub base_url: String,

    /// Building whose rooms are mirrored
    pub building_id: i64,

    /// How many days ahead of today each pass covers
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: i64,

    /// Domain substituted into lecturer addresses the feed publishes
    /// under its internal domain (optional; addresses pass through
    /// unchanged when unset)
    #[serde(default)]
    pub lecturer_email_domain: Option<String>,
}

fn default_lookahead_days() -> i64 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the lesson registry API
    pub base_url: String,

    /// Registry API key (optional, can be set via environment)
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Base URL override for the calendar API (defaults to the public
    /// Google Calendar endpoint when unset)
    #[serde(default)]
    pub base_url: Option<String>,

    /// IANA timezone attached to mirrored events
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "Europe/Moscow".to_string()
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timezone: default_timezone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Pause between per-lesson checks of the deletion sweep, in
    /// milliseconds
    #[serde(default = "default_deletion_pause_ms")]
    pub deletion_pause_ms: u64,
}

fn default_deletion_pause_ms() -> u64 {
    300
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            deletion_pause_ms: default_deletion_pause_ms(),
        }
    }
}

/// Google OAuth configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// Google OAuth App Client ID
    /// Create at: https://console.cloud.google.com/apis/credentials
    pub client_id: String,
    /// Google OAuth App Client Secret
    pub client_secret: String,
    /// Where the refreshable credential is persisted
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
}

impl GoogleConfig {
    /// Check if credentials are configured (not placeholders)
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty()
            && !self.client_secret.is_empty()
            && !self.client_id.starts_with("YOUR_")
            && !self.client_secret.starts_with("YOUR_")
    }
}

fn default_credentials_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aula")
        .join("credentials.json")
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: "YOUR_GOOGLE_CLIENT_ID".to_string(),
            client_secret: "YOUR_GOOGLE_CLIENT_SECRET".to_string(),
            credentials_path: default_credentials_path(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timetable: TimetableConfig {
                base_url: "http://localhost:8080/timetable".to_string(),
                building_id: 92,
                lookahead_days: default_lookahead_days(),
                lecturer_email_domain: None,
            },
            registry: RegistryConfig {
                base_url: "http://localhost:8008/api/registry".to_string(),
                api_key: std::env::var("AULA_REGISTRY_KEY").ok(), // Read from environment
            },
            calendar: CalendarConfig::default(),
            sync: SyncOptions::default(),
            limits: RateLimits::default(),
            google: GoogleConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: SyncConfig =
            toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        if !validation.warnings.is_empty() {
            for warning in &validation.warnings {
                tracing::warn!("Config warning: {}", warning);
            }
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    #[must_use]
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(
            &self.timetable.base_url,
            "timetable.base_url",
            &mut result,
        );
        self.validate_url(&self.registry.base_url, "registry.base_url", &mut result);
        if let Some(url) = &self.calendar.base_url {
            self.validate_url(url, "calendar.base_url", &mut result);
        }

        if self.timetable.building_id <= 0 {
            result.add_error(
                "timetable.building_id",
                "A real building id is required (greater than 0)",
            );
        }

        if self.timetable.lookahead_days <= 0 {
            result.add_error(
                "timetable.lookahead_days",
                "Lookahead must cover at least one day",
            );
        } else if self.timetable.lookahead_days > 90 {
            result.add_warning(
                "timetable.lookahead_days",
                "Lookahead over 90 days makes each pass very slow",
            );
        }

        if self.calendar.timezone.is_empty() {
            result.add_error("calendar.timezone", "Timezone must not be empty");
        }

        match &self.registry.api_key {
            Some(key) if !key.is_empty() => {}
            _ => result.add_warning(
                "registry.api_key",
                "No API key configured - registry writes may be rejected",
            ),
        }

        if self.sync.deletion_pause_ms == 0 {
            result.add_warning(
                "sync.deletion_pause_ms",
                "Deletion sweep pacing disabled (0 ms)",
            );
        }

        // A zero bound would never grant a permit and hang the pass.
        for (field, value) in [
            ("limits.timetable", self.limits.timetable),
            ("limits.registry", self.limits.registry),
            ("limits.calendar", self.limits.calendar),
        ] {
            if value == 0 {
                result.add_error(field, "Concurrency bound must be greater than 0");
            }
        }

        // Google OAuth (just warn if not configured)
        if !self.google.is_configured() {
            result.add_warning(
                "google",
                "Google OAuth not configured - calendar mirroring will be unavailable",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("aula");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = SyncConfig::default();
        let result = config.validate();
        // Default config should be valid (only warnings, no errors)
        assert!(
            result.is_valid(),
            "Default config should be valid: {:?}",
            result.errors
        );
    }

    #[test]
    fn test_invalid_url() {
        let mut config = SyncConfig::default();
        config.timetable.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "timetable.base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = SyncConfig::default();
        config.registry.base_url = "ftp://localhost:8080".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_concurrency_bound() {
        let mut config = SyncConfig::default();
        config.limits.registry = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "limits.registry"));
    }

    #[test]
    fn test_zero_lookahead() {
        let mut config = SyncConfig::default();
        config.timetable.lookahead_days = 0;
        let result = config.validate();
        assert!(!result.is_valid());
    }

    #[test]
    fn test_google_not_configured_is_warning() {
        let config = SyncConfig::default();
        let result = config.validate();
        // Google not configured should be a warning, not an error
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "google"));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write as _;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[timetable]
base_url = "http://feed.example.edu/api"
building_id = 92

[registry]
base_url = "http://registry.example.edu/api"
api_key = "secret"
"#
        )
        .unwrap();

        let config = SyncConfig::load_from(file.path()).unwrap();
        assert_eq!(config.timetable.building_id, 92);
        assert_eq!(config.timetable.lookahead_days, 15);
        assert_eq!(config.calendar.timezone, "Europe/Moscow");
        assert_eq!(config.sync.deletion_pause_ms, 300);
        assert_eq!(config.limits.registry, 10);
        assert!(config.validate().is_valid());
    }
}
