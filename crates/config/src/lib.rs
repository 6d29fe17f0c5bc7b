//! Configuration loading, validation, and management for reagent.
//!
//! Loads configuration from `~/.reagent/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use reagent_core::AgentLimits;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Providers with a built-in endpoint and default model.
pub const SUPPORTED_PROVIDERS: &[&str] = &["qwen", "openai"];

/// The root configuration structure.
///
/// Maps directly to `~/.reagent/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the active provider (overrides the per-provider key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Active chat-completion provider
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Sampling temperature sent with every request
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Optional cap on generated tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Loop limits
    #[serde(default)]
    pub agent: AgentLimits,

    /// Retry policy for overloaded endpoints
    #[serde(default)]
    pub retry: RetryConfig,

    /// Episodic memory store
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Tool dispatch settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "qwen".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_request_timeout() -> u64 {
    60
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .field("agent", &self.agent)
            .field("retry", &self.retry)
            .field("memory", &self.memory)
            .field("tools", &self.tools)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, the first call included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles for each later one
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    2000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Document path; defaults to `<config_dir>/data/task-memory.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Minimum Jaccard score (exclusive) for a record to be recalled
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

fn default_capacity() -> usize {
    100
}
fn default_similarity_threshold() -> f32 {
    0.3
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            capacity: default_capacity(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Longer tool output is cut down to this many characters
    #[serde(default = "default_max_response_length")]
    pub max_response_length: usize,

    /// Filesystem tools are confined to this directory
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,
}

fn default_max_response_length() -> usize {
    6000
}
fn default_workspace_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_response_length: default_max_response_length(),
            workspace_root: default_workspace_root(),
        }
    }
}

/// Endpoint settings for the active provider, defaults filled in.
#[derive(Clone)]
pub struct ResolvedProvider {
    pub name: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl std::fmt::Debug for ResolvedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedProvider")
            .field("name", &self.name)
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.reagent/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// - `LLM_PROVIDER` selects the provider
    /// - `MAX_MESSAGES` sets the conversation cap
    /// - `QWEN_API_KEY`, `QWEN_MODEL_NAME`
    /// - `OPENAI_API_KEY`, `OPENAI_MODEL_NAME`, `OPENAI_BASE_URL`
    /// - `REAGENT_API_KEY` (highest priority, active provider)
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("LLM_PROVIDER") {
            self.provider = provider.trim().to_lowercase();
        }

        if let Some(raw) = lookup("MAX_MESSAGES") {
            self.agent.max_messages = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("MAX_MESSAGES must be an integer, got '{raw}'"))
            })?;
        }

        let overrides = [
            ("qwen", "QWEN_API_KEY", "QWEN_MODEL_NAME", None),
            ("openai", "OPENAI_API_KEY", "OPENAI_MODEL_NAME", Some("OPENAI_BASE_URL")),
        ];
        for (name, key_var, model_var, url_var) in overrides {
            let key = lookup(key_var);
            let model = lookup(model_var);
            let url = url_var.and_then(&lookup);
            if key.is_none() && model.is_none() && url.is_none() {
                continue;
            }
            let entry = self.providers.entry(name.to_string()).or_default();
            if key.is_some() {
                entry.api_key = key;
            }
            if model.is_some() {
                entry.model = model;
            }
            if url.is_some() {
                entry.api_url = url;
            }
        }

        if let Some(key) = lookup("REAGENT_API_KEY") {
            self.api_key = Some(key);
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".reagent")
    }

    /// Where the episodic memory document lives.
    pub fn memory_path(&self) -> PathBuf {
        self.memory
            .path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("data").join("task-memory.json"))
    }

    /// Endpoint, model and key for the active provider.
    pub fn resolve_provider(&self) -> Result<ResolvedProvider, ConfigError> {
        let (default_url, default_model) = provider_defaults(&self.provider)
            .ok_or_else(|| ConfigError::UnsupportedProvider(self.provider.clone()))?;
        let overrides = self.providers.get(&self.provider);

        let api_key = self
            .api_key
            .clone()
            .or_else(|| overrides.and_then(|p| p.api_key.clone()));
        let base_url = overrides
            .and_then(|p| p.api_url.clone())
            .unwrap_or_else(|| default_url.to_string());
        let model = overrides
            .and_then(|p| p.model.clone())
            .unwrap_or_else(|| default_model.to_string());

        Ok(ResolvedProvider {
            name: self.provider.clone(),
            api_key,
            base_url,
            model,
        })
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !SUPPORTED_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(ConfigError::UnsupportedProvider(self.provider.clone()));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError("request_timeout_secs must be > 0".into()));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError("agent.max_iterations must be >= 1".into()));
        }

        if self.agent.max_messages < 2 {
            return Err(ConfigError::ValidationError("agent.max_messages must be >= 2".into()));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError("retry.max_attempts must be >= 1".into()));
        }

        if self.memory.capacity == 0 {
            return Err(ConfigError::ValidationError("memory.capacity must be >= 1".into()));
        }

        if !(0.0..=1.0).contains(&self.memory.similarity_threshold) {
            return Err(ConfigError::ValidationError(
                "memory.similarity_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        if self.tools.max_response_length < 10 {
            return Err(ConfigError::ValidationError(
                "tools.max_response_length must be >= 10".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available for the active provider.
    pub fn has_api_key(&self) -> bool {
        self.resolve_provider().is_ok_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout(),
            max_tokens: None,
            agent: AgentLimits::default(),
            retry: RetryConfig::default(),
            memory: MemoryConfig::default(),
            tools: ToolsConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Built-in base URL and model for a provider name.
pub fn provider_defaults(name: &str) -> Option<(&'static str, &'static str)> {
    match name {
        "qwen" => Some(("https://dashscope.aliyuncs.com/compatible-mode/v1", "qwen-turbo")),
        "openai" => Some(("https://api.openai.com/v1", "gpt-4o-mini")),
        _ => None,
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Unsupported LLM provider: {0} (expected one of: qwen, openai)")]
    UnsupportedProvider(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "qwen");
        assert_eq!(config.agent.max_iterations, 15);
        assert_eq!(config.retry.base_delay_ms, 2000);
        assert_eq!(config.tools.max_response_length, 6000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider, config.provider);
        assert_eq!(parsed.agent, config.agent);
        assert_eq!(parsed.memory, config.memory);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn tiny_message_cap_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_messages = 1;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.provider, "qwen");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "provider = \"openai\"\n\n[agent]\nmax_iterations = 4").unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.agent.max_iterations, 4);
        assert_eq!(config.agent.max_messages, 10);
        assert_eq!(config.memory.capacity, 100);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "provider = [unclosed").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn unknown_provider_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "provider = \"claude\"").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedProvider(name) if name == "claude"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("qwen"));
        assert!(toml_str.contains("max_iterations = 15"));
        assert!(toml_str.contains("base_delay_ms = 2000"));
    }

    #[test]
    fn env_overrides_select_provider_and_cap() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("LLM_PROVIDER", "OpenAI"),
                ("MAX_MESSAGES", "6"),
                ("OPENAI_API_KEY", "sk-test"),
                ("OPENAI_BASE_URL", "http://localhost:9999/v1"),
            ]))
            .unwrap();

        assert_eq!(config.provider, "openai");
        assert_eq!(config.agent.max_messages, 6);

        let resolved = config.resolve_provider().unwrap();
        assert_eq!(resolved.api_key.as_deref(), Some("sk-test"));
        assert_eq!(resolved.base_url, "http://localhost:9999/v1");
        assert_eq!(resolved.model, "gpt-4o-mini");
    }

    #[test]
    fn env_bad_max_messages_rejected() {
        let mut config = AppConfig::default();
        let err = config.apply_env(env(&[("MAX_MESSAGES", "lots")])).unwrap_err();
        assert!(err.to_string().contains("MAX_MESSAGES"));
    }

    #[test]
    fn env_unknown_provider_rejected() {
        let mut config = AppConfig::default();
        let err = config.apply_env(env(&[("LLM_PROVIDER", "mystery")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedProvider(_)));
    }

    #[test]
    fn qwen_defaults_resolve() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[("QWEN_API_KEY", "qk"), ("QWEN_MODEL_NAME", "qwen-plus")]))
            .unwrap();
        let resolved = config.resolve_provider().unwrap();
        assert_eq!(resolved.base_url, "https://dashscope.aliyuncs.com/compatible-mode/v1");
        assert_eq!(resolved.model, "qwen-plus");
        assert!(config.has_api_key());
    }

    #[test]
    fn global_key_wins_over_provider_key() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[("QWEN_API_KEY", "provider-key"), ("REAGENT_API_KEY", "global-key")]))
            .unwrap();
        assert_eq!(config.resolve_provider().unwrap().api_key.as_deref(), Some("global-key"));
    }

    #[test]
    fn debug_output_redacts_keys() {
        let config = AppConfig {
            api_key: Some("super-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn memory_path_defaults_under_config_dir() {
        let config = AppConfig::default();
        assert!(config.memory_path().ends_with("data/task-memory.json"));

        let custom = AppConfig {
            memory: MemoryConfig {
                path: Some(PathBuf::from("/tmp/mem.json")),
                ..MemoryConfig::default()
            },
            ..AppConfig::default()
        };
        assert_eq!(custom.memory_path(), PathBuf::from("/tmp/mem.json"));
    }
}
