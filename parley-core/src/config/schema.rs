//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration for parley
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Auth configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Initial system prompt
    #[serde(default)]
    pub prompt: PromptConfig,
    /// Session registry configuration
    #[serde(default)]
    pub sessions: SessionsConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name (zhipu, openai, ...)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// API key
    #[serde(default)]
    pub api_key: String,
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Default model
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum tokens generated per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout in seconds, 0 disables the deadline
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_provider() -> String {
    "zhipu".to_string()
}

fn default_base_url() -> String {
    "https://open.bigmodel.cn/api/paas/v4".to_string()
}

fn default_model() -> String {
    "glm-4.5".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_timeout() -> u64 {
    60
}

impl LlmConfig {
    /// Request deadline, if one is configured
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout: default_timeout(),
        }
    }
}

/// Auth configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// JWT signing secret
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Token expiry in hours
    #[serde(default = "default_token_expiry")]
    pub token_expiry: u32,
    /// Refresh token expiry in hours
    #[serde(default = "default_refresh_expiry")]
    pub refresh_expiry: u32,
    /// Header carrying API keys
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
}

fn default_jwt_secret() -> String {
    "your-secret-key".to_string()
}

fn default_token_expiry() -> u32 {
    24
}

fn default_refresh_expiry() -> u32 {
    168 // 7 days
}

fn default_api_key_header() -> String {
    "X-API-Key".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_expiry: default_token_expiry(),
            refresh_expiry: default_refresh_expiry(),
            api_key_header: default_api_key_header(),
        }
    }
}

/// Initial system prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

fn default_prompt() -> String {
    "You are a helpful AI assistant named Xiaozhi.".to_string()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
        }
    }
}

/// Session registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Maximum live sessions, 0 for unbounded
    #[serde(default)]
    pub max_sessions: usize,
    /// Idle seconds before a session is evicted, 0 to keep sessions forever
    #[serde(default)]
    pub idle_ttl: u64,
    /// Seconds between eviction sweeps
    #[serde(default = "default_reap_interval")]
    pub reap_interval: u64,
}

fn default_reap_interval() -> u64 {
    60
}

impl SessionsConfig {
    pub fn idle_ttl(&self) -> Option<Duration> {
        (self.idle_ttl > 0).then(|| Duration::from_secs(self.idle_ttl))
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval)
    }

    pub fn capacity(&self) -> Option<usize> {
        (self.max_sessions > 0).then_some(self.max_sessions)
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_sessions: 0,
            idle_ttl: 0,
            reap_interval: default_reap_interval(),
        }
    }
}
