//! Server settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML file, then `EMOTION_*` environment variables
//! (`EMOTION_SERVER__PORT=5001`, `EMOTION_CAMERA__DEVICE=/dev/video2`).

use camera_capture::CameraConfig;
use config::{Config, ConfigError, Environment, File};
use emotion::EmotionConfig;
use gaze::GazeConfig;
use monitor::MonitorConfig;
use serde::Deserialize;

/// Environment variable naming an explicit settings file
pub const CONFIG_PATH_ENV: &str = "EMOTION_SERVER_CONFIG";

/// Settings file looked up in the working directory (`.toml` and friends)
pub const DEFAULT_CONFIG_FILE: &str = "emotion-server";

/// HTTP listener and logging
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// `error`, `warn`, `info`, `debug` or `trace`
    pub log_level: String,
    /// Emit JSON log lines instead of plain text
    pub log_json: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

/// All server settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub camera: CameraConfig,
    pub gaze: GazeConfig,
    pub emotion: EmotionConfig,
    pub monitor: MonitorConfig,
}

impl Settings {
    /// Load from `EMOTION_SERVER_CONFIG` (or `emotion-server.toml`) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).ok();
        Self::load_from(path.as_deref())
    }

    /// Load from an explicit file (must exist) or the optional default file
    pub fn load_from(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("EMOTION")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// `host:port` to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_capture::CameraBackend;
    use emotion::PolicyKind;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.bind_addr(), "0.0.0.0:5000");
        assert_eq!(settings.server.log_level, "info");
        assert_eq!(settings.monitor.analysis_interval_ms, 3000);
        assert_eq!(settings.gaze.band_min, 0.35);
        assert_eq!(settings.emotion.policy, PolicyKind::MultiPrompt);
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("emotion-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 5050

[camera]
backend = "directory"
directory = "/tmp/frames"

[emotion]
policy = "single_prompt"

[monitor]
analysis_interval_ms = 1000
"#,
        )
        .unwrap();

        let settings = Settings::load_from(path.to_str()).unwrap();
        assert_eq!(settings.server.port, 5050);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.camera.backend, CameraBackend::Directory);
        assert_eq!(settings.emotion.policy, PolicyKind::SinglePrompt);
        assert_eq!(settings.monitor.analysis_interval_ms, 1000);
        assert_eq!(settings.monitor.poll_interval_ms, 100);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(Settings::load_from(Some("/nonexistent/emotion-server.toml")).is_err());
    }
}
