//! Layered server settings
//!
//! Built-in defaults, then an optional TOML file, then `DROWSY__*`
//! environment variables (`__` separates nesting levels, e.g.
//! `DROWSY__DMS__CLOSED_FRAMES_THRESHOLD=15`).

use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use dms::DmsConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

/// Settings file read when no explicit path is given
pub const DEFAULT_SETTINGS_FILE: &str = "drowsiness.toml";

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] ConfigError),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// HTTP/WebSocket server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Listen address
    pub bind_addr: String,
    /// Max log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
    /// Install the Prometheus recorder and serve `/metrics`
    pub metrics_enabled: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

impl ServerSettings {
    pub fn level(&self) -> Result<Level, SettingsError> {
        self.log_level
            .parse::<Level>()
            .map_err(|_| SettingsError::Invalid(format!("unknown log level '{}'", self.log_level)))
    }
}

/// Complete service settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub dms: DmsConfig,
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_SETTINGS_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("DROWSY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.server.level()?;
        self.dms
            .validate()
            .map_err(|e| SettingsError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_settings(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}.toml", name, std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults_validate() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.server.bind_addr, "0.0.0.0:5000");
        assert_eq!(settings.server.level().unwrap(), Level::INFO);
    }

    #[test]
    fn test_file_overrides_single_keys() {
        let path = write_settings(
            "drowsy-settings-override",
            r#"
[server]
log_level = "debug"

[dms]
closed_frames_threshold = 15

[dms.eye_detector]
min_neighbors = 4
"#,
        );

        let settings = Settings::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.server.log_level, "debug");
        assert_eq!(settings.server.bind_addr, "0.0.0.0:5000");
        assert_eq!(settings.dms.closed_frames_threshold, 15);
        assert_eq!(settings.dms.alarm_cooldown_secs, 5.0);
        assert_eq!(settings.dms.eye_detector.min_neighbors, 4);
        assert_eq!(settings.dms.eye_detector.min_width, 20);
        assert_eq!(settings.dms.face_detector.min_width, 80);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let path = write_settings(
            "drowsy-settings-invalid",
            r#"
[dms]
closed_frames_threshold = 0
"#,
        );

        let result = Settings::load(Some(&path));
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_unknown_log_level() {
        let settings = Settings {
            server: ServerSettings {
                log_level: "chatty".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let result = Settings::load(Some(Path::new("/nonexistent/drowsiness.toml")));
        assert!(matches!(result, Err(SettingsError::Load(_))));
    }
}
