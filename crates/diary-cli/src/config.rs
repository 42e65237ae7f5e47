//! Configuration loading and management.

use std::path::{Path, PathBuf};

use diary_core::{AggregationConfig, ClassifierConfig};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Idle timer settings for the activity classifier.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Thresholds used by `report` and `status`.
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("diary.db"),
            classifier: ClassifierConfig::default(),
            aggregation: AggregationConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources override earlier ones: defaults, the user config file,
    /// `config_path`, then `DIARY_*` environment variables. Nested keys use a
    /// double underscore, e.g. `DIARY_CLASSIFIER__IDLE_TIMER_MS`.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("DIARY_").split("__"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for diary.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("diary"))
}

/// Returns the platform-specific data directory for diary.
///
/// On Linux: `~/.local/share/diary`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("diary"))
}
