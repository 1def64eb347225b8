//! Configuration loading for Ogrenix.
//! Reads ogrenix.toml from the current directory or path in OGRENIX_CONFIG env var;
//! falls back to built-in defaults when no file is present.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 5002 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer key for the chat-completions endpoint. Usually left unset in
    /// the file and supplied via OGRENIX_API_KEY or OPENROUTER_API_KEY.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_base_url()    -> String { "https://openrouter.ai/api/v1".to_string() }
fn default_model()       -> String { "anthropic/claude-3.7-sonnet".to_string() }
fn default_image_model() -> String { "google/gemini-2.5-flash-image-preview".to_string() }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            image_model: default_image_model(),
            max_tokens: None,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_python_bin")]
    pub python_bin: String,
    #[serde(default = "default_chart_timeout_secs")]
    pub chart_timeout_secs: u64,
}

fn default_python_bin()         -> String { "python3".to_string() }
fn default_chart_timeout_secs() -> u64 { 20 }

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            python_bin: default_python_bin(),
            chart_timeout_secs: default_chart_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Minimum milliseconds between streamed document snapshots.
    #[serde(default = "default_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,
    /// Hard ceiling on one generation stream, in seconds.
    #[serde(default = "default_max_stream_secs")]
    pub max_stream_secs: u64,
}

fn default_snapshot_interval_ms() -> u64 { 120 }
fn default_max_stream_secs()      -> u64 { 180 }

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_ms: default_snapshot_interval_ms(),
            max_stream_secs: default_max_stream_secs(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}


impl Config {
    /// Load configuration from ogrenix.toml.
    /// Checks OGRENIX_CONFIG env var first, then the current directory.
    /// A path set explicitly via the env var must exist; the default path
    /// may be absent, in which case built-in defaults are used.
    pub fn load() -> Result<Self, ConfigError> {
        // Populates process env from .env if one exists; harmless otherwise.
        let _ = dotenvy::dotenv();

        let (path, explicit) = match std::env::var("OGRENIX_CONFIG") {
            Ok(p) => (p, true),
            Err(_) => ("ogrenix.toml".to_string(), false),
        };

        let mut config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content)?
        } else if explicit {
            return Err(ConfigError::NotFound(path));
        } else {
            tracing::info!("no ogrenix.toml found, using built-in defaults");
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment beats file for the API key, so credentials can stay out
    /// of checked-in configuration.
    fn apply_env_overrides(&mut self) {
        for var in ["OGRENIX_API_KEY", "OPENROUTER_API_KEY"] {
            if let Ok(key) = std::env::var(var) {
                if !key.is_empty() {
                    self.llm.api_key = Some(key);
                    break;
                }
            }
        }
    }
}
