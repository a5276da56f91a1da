mod loader;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use loader::load_config;

/// Environment variable holding the completion provider key (required)
pub const COMPLETION_KEY_VAR: &str = "TOGETHER_API_KEY";

/// Environment variable holding the image provider key (optional)
pub const IMAGE_KEY_VAR: &str = "IMAGE_API_KEY";

pub const DEFAULT_MODEL: &str = "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an advanced AI assistant. Respond naturally and helpfully. \
Stay within legal and ethical boundaries.";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub image: ImageConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Directory holding index.html and the /static assets
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

fn default_port() -> u16 {
    8000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_static_dir() -> String {
    "static".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            static_dir: default_static_dir(),
        }
    }
}

/// Completion provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Provider base URL; the chat completions path is appended
    #[serde(default = "default_upstream_url")]
    pub url: String,
    /// Model used when the caller does not pick one
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout for non-streaming calls. Streaming calls never time out.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,
}

fn default_upstream_url() -> String {
    "https://api.together.xyz".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    512
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: None,
            default_system_prompt: default_system_prompt(),
        }
    }
}

impl UpstreamConfig {
    /// Returns the base URL with trailing slash stripped
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    pub fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url())
    }
}

/// Web search provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_url")]
    pub url: String,
    /// Snippets fetched for a chat turn with use_search set
    #[serde(default = "default_chat_max_results")]
    pub chat_max_results: usize,
}

fn default_search_url() -> String {
    "https://api.duckduckgo.com".to_string()
}

fn default_chat_max_results() -> usize {
    4
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: default_search_url(),
            chat_max_results: default_chat_max_results(),
        }
    }
}

/// Image generation provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageConfig {
    #[serde(default = "default_image_url")]
    pub url: String,
}

fn default_image_url() -> String {
    "https://stablediffusionapi.com/api/v4/dreambooth".to_string()
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            url: default_image_url(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to built-in defaults when the file is absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }
        tracing::info!("No config file at {:?}, using built-in defaults", path);
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Check the values serde cannot check on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, raw) in [
            ("upstream.url", &self.upstream.url),
            ("search.url", &self.search.url),
            ("image.url", &self.image.url),
        ] {
            url::Url::parse(raw)
                .map_err(|e| ConfigError::Validation(format!("{} '{}' is not a valid URL: {}", name, raw, e)))?;
        }

        if self.upstream.max_tokens == 0 {
            return Err(ConfigError::Validation("upstream.max_tokens must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// Provider credentials, read from the environment once at startup
#[derive(Clone)]
pub struct Secrets {
    pub completion_api_key: String,
    pub image_api_key: Option<String>,
}

impl Secrets {
    /// Read secrets from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read secrets through an arbitrary lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let completion_api_key =
            non_empty(COMPLETION_KEY_VAR).ok_or(ConfigError::MissingSecret(COMPLETION_KEY_VAR))?;

        Ok(Self {
            completion_api_key,
            image_api_key: non_empty(IMAGE_KEY_VAR),
        })
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("completion_api_key", &"<redacted>")
            .field("image_api_key", &self.image_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("{0} is not set (environment or .env)")]
    MissingSecret(&'static str),
}
