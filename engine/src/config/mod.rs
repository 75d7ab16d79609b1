//! Configuration management
//!
//! This module handles loading, validation, and management of the Penwright
//! configuration. Configuration is stored in TOML format at
//! ~/.penwright/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **llm**: Provider selection and per-provider settings
//! - **session**: Priming retry delay and stagger between agents
//! - **workflow**: Cooldown between workflow steps
//! - **agents**: The personas to prime and register
//!
//! Credentials are never stored in the file. `llm.gemini.api_key_env`
//! names the environment variable the shell reads the key from.
//!
//! # Examples
//!
//! ```no_run
//! use penwright_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Provider: {}", config.llm.provider);
//! println!("Agents: {}", config.agents.len());
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use sdk::types::Persona;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::secrets::SecretString;
use crate::workflow::presets::default_personas;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Agent session settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Workflow pacing
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Personas to prime and register, in priming order
    #[serde(default = "default_personas")]
    pub agents: Vec<Persona>,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Which remote capability backs the agent sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Ollama,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Gemini => write!(f, "gemini"),
            ProviderKind::Ollama => write!(f, "ollama"),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Provider used by every session
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Gemini provider settings
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Base URL for Gemini API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// Agent session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Delay before the single priming retry (seconds)
    #[serde(default = "default_init_retry_delay")]
    pub init_retry_delay_secs: u64,

    /// Pause between priming successive agents (seconds)
    #[serde(default = "default_init_stagger")]
    pub init_stagger_secs: u64,
}

/// Workflow pacing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Cooldown between workflow steps (seconds)
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
}

/// Explicit model configuration handed to a provider.
///
/// Replaces process-wide credential state: whoever builds a provider
/// passes the credential and model identifier in.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub credential: SecretString,
    pub model: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider() -> ProviderKind {
    ProviderKind::Gemini
}

fn default_request_timeout() -> u64 {
    120
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_init_retry_delay() -> u64 {
    20
}

fn default_init_stagger() -> u64 {
    10
}

fn default_cooldown() -> u64 {
    15
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            request_timeout_secs: default_request_timeout(),
            gemini: GeminiConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            init_retry_delay_secs: default_init_retry_delay(),
            init_stagger_secs: default_init_stagger(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown(),
        }
    }
}

impl LLMConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SessionConfig {
    pub fn init_retry_delay(&self) -> Duration {
        Duration::from_secs(self.init_retry_delay_secs)
    }

    pub fn init_stagger(&self) -> Duration {
        Duration::from_secs(self.init_stagger_secs)
    }
}

impl WorkflowConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    /// Load configuration from the default location (~/.penwright/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default_config();
        config.validate()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Wrote default configuration to {}", path.display());

        Ok(config)
    }

    /// Get the default configuration file path (~/.penwright/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".penwright").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LLMConfig::default(),
            session: SessionConfig::default(),
            workflow: WorkflowConfig::default(),
            agents: default_personas(),
        }
    }

    /// Model configuration for the selected provider
    pub fn model_config(&self, credential: SecretString) -> ModelConfig {
        let model = match self.llm.provider {
            ProviderKind::Gemini => self.llm.gemini.model.clone(),
            ProviderKind::Ollama => self.llm.ollama.model.clone(),
        };

        ModelConfig { credential, model }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if:
    /// - The log level is unknown
    /// - The request timeout is zero
    /// - A model name is empty
    /// - No agents are configured, or an agent has an empty or duplicate name
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.llm.request_timeout_secs == 0 {
            return Err(EngineError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        let model = match self.llm.provider {
            ProviderKind::Gemini => &self.llm.gemini.model,
            ProviderKind::Ollama => &self.llm.ollama.model,
        };
        if model.trim().is_empty() {
            return Err(EngineError::Config(format!(
                "Model name for provider '{}' cannot be empty",
                self.llm.provider
            )));
        }

        if self.agents.is_empty() {
            return Err(EngineError::Config(
                "At least one agent must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if agent.name.trim().is_empty() || agent.role.trim().is_empty() {
                return Err(EngineError::Config(
                    "Agent name and role cannot be empty".to_string(),
                ));
            }
            if !seen.insert(agent.name.as_str()) {
                return Err(EngineError::Config(format!(
                    "Duplicate agent name '{}'",
                    agent.name
                )));
            }
        }

        Ok(())
    }
}
