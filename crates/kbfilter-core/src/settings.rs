// Kbfilter Settings Module
// User-configurable knobs for the duplicate press filter

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::filter::DEFAULT_THRESHOLD;

/// Settings for one filter device
///
/// These settings are loaded from a TOML file (default: ~/.config/kbfilter/settings.toml):
///
/// ```toml
/// [dedup]
/// enabled = true
/// threshold_ms = 300
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSettings {
    /// When false every batch is forwarded unfiltered
    enabled: bool,

    /// Presses of the same key closer than this are dropped
    threshold: Duration,

    /// Path to the settings file (for reload)
    source_path: Option<PathBuf>,
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// TOML representation for deserializing settings
#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SettingsToml {
    #[serde(default)]
    dedup: Option<DedupSettings>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DedupSettings {
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    threshold_ms: Option<u64>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterSettings {
    /// Defaults: filtering on, 300 ms window
    pub fn new() -> Self {
        Self {
            enabled: true,
            threshold: DEFAULT_THRESHOLD,
            source_path: None,
        }
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        settings.source_path = Some(path.as_ref().to_path_buf());
        Ok(settings)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let toml_settings: SettingsToml =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;

        let mut settings = Self::new();

        if let Some(dedup) = toml_settings.dedup {
            if let Some(enabled) = dedup.enabled {
                settings.enabled = enabled;
            }
            if let Some(threshold_ms) = dedup.threshold_ms {
                if threshold_ms == 0 {
                    return Err(SettingsError::InvalidValue(
                        "dedup.threshold_ms must be greater than zero".to_string(),
                    ));
                }
                settings.threshold = Duration::from_millis(threshold_ms);
            }
        }

        Ok(settings)
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("kbfilter").join("settings.toml"))
    }

    /// Load from the default path, falling back to defaults if it does not exist
    pub fn load_default() -> Result<Self, SettingsError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path),
            _ => Ok(Self::new()),
        }
    }

    /// Reload from the file these settings came from
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        if let Some(path) = self.source_path.clone() {
            *self = Self::from_file(path)?;
        }
        Ok(())
    }

    /// Turn filtering on or off
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Change the suppression window
    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }
}
