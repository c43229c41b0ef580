//! Configuration loading, validation, and management for namecard.
//!
//! Loads configuration from `~/.namecard/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The root configuration structure.
///
/// Maps directly to `~/.namecard/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// WeChat JS-SDK credentials
    #[serde(default)]
    pub wechat: WechatConfig,

    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Persistence settings
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            wechat: WechatConfig::default(),
            gateway: GatewayConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// LLM provider configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of an OpenAI-compatible chat-completions endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key (overridable via `NAMECARD_API_KEY` / `OPENAI_API_KEY`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}

/// WeChat JS-SDK credentials.
///
/// Both values come from the WeChat Official Account platform; they are
/// overridable via `WECHAT_APPID` / `WECHAT_APPSECRET`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct WechatConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8080
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "sqlite" or "memory".
    #[serde(default = "default_backend")]
    pub backend: String,

    /// SQLite database path (ignored for the memory backend).
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_db_path(),
        }
    }
}

fn default_backend() -> String {
    "sqlite".into()
}
fn default_db_path() -> String {
    "namecard.db".into()
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("wechat", &self.wechat)
            .field("gateway", &self.gateway)
            .field("store", &self.store)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl std::fmt::Debug for WechatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WechatConfig")
            .field("appid", &self.appid)
            .field("secret", &redact(&self.secret))
            .finish()
    }
}

impl AppConfig {
    /// The config directory: `~/.namecard`.
    pub fn config_dir() -> PathBuf {
        home_dir().join(".namecard")
    }

    /// The default config file path: `~/.namecard/config.toml`.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from the default path, then apply environment
    /// variable overrides:
    ///
    /// - `NAMECARD_API_KEY` (or `OPENAI_API_KEY`) — provider API key
    /// - `NAMECARD_MODEL` — provider model
    /// - `WECHAT_APPID` / `WECHAT_APPSECRET` — WeChat credentials
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;

        if config.provider.api_key.is_none() {
            config.provider.api_key = std::env::var("NAMECARD_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }
        if let Ok(model) = std::env::var("NAMECARD_MODEL") {
            config.provider.model = model;
        }
        if let Ok(appid) = std::env::var("WECHAT_APPID") {
            config.wechat.appid = Some(appid);
        }
        if let Ok(secret) = std::env::var("WECHAT_APPSECRET") {
            config.wechat.secret = Some(secret);
        }

        Ok(config)
    }

    /// Load configuration from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Write the configuration to a path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Validate settings. Called once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::Invalid(format!(
                "provider.temperature must be in [0.0, 2.0], got {}",
                self.provider.temperature
            )));
        }
        if self.provider.max_tokens == 0 {
            return Err(ConfigError::Invalid("provider.max_tokens must be > 0".into()));
        }
        if self.gateway.port == 0 {
            return Err(ConfigError::Invalid("gateway.port must be > 0".into()));
        }
        match self.store.backend.as_str() {
            "sqlite" | "memory" => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "store.backend must be \"sqlite\" or \"memory\", got \"{other}\""
                )));
            }
        }
        Ok(())
    }

    /// Whether the WeChat signature service can run.
    pub fn wechat_configured(&self) -> bool {
        self.wechat.appid.as_deref().is_some_and(|s| !s.is_empty())
            && self.wechat.secret.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[cfg(windows)]
fn home_dir() -> PathBuf {
    std::env::var("USERPROFILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(not(windows))]
fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.provider.temperature, 0.7);
        assert_eq!(config.provider.max_tokens, 2000);
        assert_eq!(config.store.backend, "sqlite");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.provider.model, default_model());
    }

    #[test]
    fn toml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.wechat.appid = Some("wx1234567890".into());
        config.wechat.secret = Some("topsecret".into());
        config.gateway.port = 9000;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.wechat.appid.as_deref(), Some("wx1234567890"));
        assert_eq!(loaded.gateway.port, 9000);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.provider.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_backend_rejected() {
        let mut config = AppConfig::default();
        config.store.backend = "mongodb".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-very-secret".into());
        config.wechat.secret = Some("wechat-secret".into());

        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(!debug.contains("wechat-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn wechat_configured_requires_both() {
        let mut config = AppConfig::default();
        assert!(!config.wechat_configured());
        config.wechat.appid = Some("wx1".into());
        assert!(!config.wechat_configured());
        config.wechat.secret = Some("s".into());
        assert!(config.wechat_configured());
        config.wechat.appid = Some(String::new());
        assert!(!config.wechat_configured());
    }
}
