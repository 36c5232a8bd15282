use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Remote document API configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RemoteConfig {
    /// Server URL (e.g., "https://api.mindwell.example")
    pub server_url: Option<String>,
    /// API key for authentication
    pub api_key: Option<String>,
}

impl RemoteConfig {
    /// Returns true if the remote store is configured (has both server_url
    /// and api_key). Unconfigured clients fall back to the in-memory store.
    pub fn is_configured(&self) -> bool {
        self.server_url.is_some() && self.api_key.is_some()
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Daily water goal, in glasses
    pub water_goal: ConfigValue<u32>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Remote store configuration
    pub remote: RemoteConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    water_goal: Option<u32>,
    remote: Option<RemoteConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut water_goal = ConfigValue::new(crate::water::DEFAULT_GOAL, ConfigSource::Default);
        let mut config_file = None;
        let mut remote = RemoteConfig::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(goal) = file_config.water_goal {
                water_goal = ConfigValue::new(goal, ConfigSource::File);
            }
            if let Some(remote_config) = file_config.remote {
                remote = remote_config;
            }
        }

        // Apply environment variable overrides
        if let Ok(goal) = std::env::var("MINDWELL_WATER_GOAL") {
            if let Ok(goal) = goal.parse() {
                water_goal = ConfigValue::new(goal, ConfigSource::Environment);
            }
        }
        if let Ok(url) = std::env::var("MINDWELL_SERVER_URL") {
            remote.server_url = Some(url);
        }
        if let Ok(key) = std::env::var("MINDWELL_API_KEY") {
            remote.api_key = Some(key);
        }

        Ok(Self {
            water_goal,
            config_file,
            remote,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/mindwell/
    /// - macOS: ~/Library/Application Support/mindwell/
    /// - Windows: %APPDATA%/mindwell/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mindwell")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
