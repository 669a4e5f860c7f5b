use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = ".todo_client.json";
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Client settings as stored in the JSON config file. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: String,
    /// Speech-to-text command line; voice input is disabled without one.
    pub voice_command: Option<String>,
    pub voice_language: String,
    pub log_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            voice_command: None,
            voice_language: "pt-BR".to_string(),
            log_file: PathBuf::from("todo_client.log"),
        }
    }
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub voice_command: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Reads settings from `path`, falling back to the defaults when the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(api_url) = overrides.api_url {
            self.api_url = api_url;
        }
        if let Some(command) = overrides.voice_command {
            self.voice_command = Some(command);
        }
        if let Some(log_file) = overrides.log_file {
            self.log_file = log_file;
        }
        self
    }
}

/// Writes a default config file into `dir`. Returns `false` if one was already there.
pub fn init(dir: &Path) -> anyhow::Result<bool> {
    let config_path = dir.join(CONFIG_FILE);
    if config_path.exists() {
        return Ok(false);
    }
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let contents = serde_json::to_string_pretty(&Settings::default())?;
    fs::write(&config_path, contents)
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn missing_file_gives_defaults() {
        // Arrange
        let dir = assert_fs::TempDir::new().unwrap();

        // Act
        let settings = Settings::load(&dir.path().join(CONFIG_FILE)).unwrap();

        // Assert
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        // Arrange
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child(CONFIG_FILE);
        file.write_str(
            r#"{"api_url": "https://todo.example.com", "voice_command": "whisper-live"}"#,
        )
        .unwrap();

        // Act
        let settings = Settings::load(file.path()).unwrap();

        // Assert
        assert_eq!(settings.api_url, "https://todo.example.com");
        assert_eq!(settings.voice_command.as_deref(), Some("whisper-live"));
        assert_eq!(settings.voice_language, "pt-BR");
        assert_eq!(settings.log_file, PathBuf::from("todo_client.log"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child(CONFIG_FILE);
        file.write_str("{ not json").unwrap();

        let err = Settings::load(file.path()).unwrap_err();

        assert!(err.to_string().contains("invalid config file"));
    }

    #[test]
    fn overrides_win_over_file_values() {
        let settings = Settings {
            voice_command: Some("from-file".into()),
            ..Settings::default()
        };

        let settings = settings.apply(Overrides {
            api_url: Some("http://10.0.0.2:9000".into()),
            voice_command: None,
            log_file: None,
        });

        assert_eq!(settings.api_url, "http://10.0.0.2:9000");
        assert_eq!(settings.voice_command.as_deref(), Some("from-file"));
    }

    #[test]
    fn init_writes_once() {
        // Arrange
        let dir = assert_fs::TempDir::new().unwrap();
        let target = dir.child("project");

        // Act
        let first = init(target.path()).unwrap();
        let second = init(target.path()).unwrap();

        // Assert
        assert!(first);
        assert!(!second);
        target
            .child(CONFIG_FILE)
            .assert(predicates::str::contains("http://127.0.0.1:8000"));
    }
}
