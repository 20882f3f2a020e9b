use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use battery_bridge::BackendPreference;
use serde::{Deserialize, Serialize};
use tracing::Level;

const APP_DIR: &str = "battery-bridge";
const SOCKET_NAME: &str = "battery-bridge.sock";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "none" => Some(LogLevel::Off),
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    pub fn as_tracing_level(&self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub backend: BackendPreference,
    pub poll_interval_ms: u64,
    pub log_level: LogLevel,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            backend: BackendPreference::Auto,
            poll_interval_ms: 1000,
            log_level: LogLevel::Warn,
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join(APP_DIR)
}

pub fn runtime_dir() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(APP_DIR)
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn socket_path() -> PathBuf {
    runtime_dir().join(SOCKET_NAME)
}

impl UserConfig {
    pub fn load() -> Self {
        let path = config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Parses TOML, falling back to defaults on any error.
    pub fn parse(content: &str) -> Self {
        toml::from_str(content).unwrap_or_default()
    }

    pub fn save(&self) -> std::io::Result<()> {
        fs::create_dir_all(config_dir())?;
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        fs::write(config_path(), content)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn merge_with_args(&mut self, backend: Option<&str>) {
        if let Some(preference) = backend.and_then(BackendPreference::parse) {
            self.backend = preference;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = UserConfig::default();
        assert_eq!(config.backend, BackendPreference::Auto);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_parse_partial_file() {
        let config = UserConfig::parse("backend = \"in_process\"\npoll_interval_ms = 250\n");
        assert_eq!(config.backend, BackendPreference::InProcess);
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_parse_garbage_falls_back() {
        let config = UserConfig::parse("backend = [not toml");
        assert_eq!(config.backend, BackendPreference::Auto);
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = UserConfig {
            backend: BackendPreference::Native,
            poll_interval_ms: 5000,
            log_level: LogLevel::Debug,
        };
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("backend = \"native\""));
        assert!(text.contains("log_level = \"debug\""));

        let parsed = UserConfig::parse(&text);
        assert_eq!(parsed.backend, BackendPreference::Native);
        assert_eq!(parsed.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_cli_backend_overrides() {
        let mut config = UserConfig::default();
        config.merge_with_args(Some("native"));
        assert_eq!(config.backend, BackendPreference::Native);

        config.merge_with_args(Some("nonsense"));
        assert_eq!(config.backend, BackendPreference::Native);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("off"), Some(LogLevel::Off));
        assert_eq!(LogLevel::parse("loud"), None);
        assert_eq!(LogLevel::Off.as_tracing_level(), None);
        assert_eq!(LogLevel::Trace.as_tracing_level(), Some(Level::TRACE));
    }

    #[test]
    fn test_socket_lives_in_runtime_dir() {
        assert!(socket_path().starts_with(runtime_dir()));
        assert!(socket_path().ends_with(SOCKET_NAME));
    }
}
