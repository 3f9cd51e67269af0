//! Configuration models for scriptorium.
//!
//! Everything the operator can tune lives here and is loaded from a TOML
//! file. Every field has a default so a missing or empty file still yields
//! a complete configuration; only credentials must come from somewhere.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Top-level configuration for scriptorium.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat-completions endpoint
    #[serde(default)]
    pub llm: LlmConfig,

    /// Models bound to each generation task
    #[serde(default)]
    pub models: ModelsConfig,

    /// Web search endpoint
    #[serde(default)]
    pub search: SearchConfig,

    /// Sampling and budget settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Version control settings
    #[serde(default)]
    pub git: GitConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL (e.g. "https://api.openai.com/v1" or a local proxy)
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// API key (may contain ${ENV_VAR} placeholders)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable consulted when `api_key` is unset
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Transport attempts per request (network errors, 429, 5xx)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_api_key_env() -> String {
    "LLM_API_KEY".to_string()
}

fn default_timeout() -> u64 {
    180
}

fn default_max_retries() -> u32 {
    3
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: None,
            api_key_env: default_llm_api_key_env(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

/// Model identifiers per generation task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Model that condenses search results into research notes
    #[serde(default = "default_notes_model")]
    pub notes: String,

    /// Model that synthesizes the knowledge base and writes lessons
    #[serde(default = "default_writer_model")]
    pub writer: String,
}

fn default_notes_model() -> String {
    "gpt-4o".to_string()
}

fn default_writer_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            notes: default_notes_model(),
            writer: default_writer_model(),
        }
    }
}

/// Tavily search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,

    /// Maximum number of hits per query
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// "basic" or "advanced"
    #[serde(default = "default_search_depth")]
    pub search_depth: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_search_base_url() -> String {
    "https://api.tavily.com".to_string()
}

fn default_search_api_key_env() -> String {
    "TAVILY_API_KEY".to_string()
}

fn default_max_results() -> u32 {
    5
}

fn default_search_depth() -> String {
    "advanced".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            api_key: None,
            api_key_env: default_search_api_key_env(),
            max_results: default_max_results(),
            search_depth: default_search_depth(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Sampling temperatures and token budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_notes_temperature")]
    pub notes_temperature: f64,

    #[serde(default = "default_writer_temperature")]
    pub synthesis_temperature: f64,

    #[serde(default = "default_writer_temperature")]
    pub lesson_temperature: f64,

    /// Output cap for synthesis and lesson calls
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Input budget applied to search results and raw notes
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,
}

fn default_notes_temperature() -> f64 {
    0.7
}

fn default_writer_temperature() -> f64 {
    1.0
}

fn default_max_output_tokens() -> u32 {
    16_000
}

fn default_max_input_tokens() -> usize {
    50_000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            notes_temperature: default_notes_temperature(),
            synthesis_temperature: default_writer_temperature(),
            lesson_temperature: default_writer_temperature(),
            max_output_tokens: default_max_output_tokens(),
            max_input_tokens: default_max_input_tokens(),
        }
    }
}

/// Version control settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    #[serde(default = "default_git_user_name")]
    pub user_name: String,

    #[serde(default = "default_git_user_email")]
    pub user_email: String,

    /// Remote to push the finished course to; local commit only when unset
    #[serde(default)]
    pub remote_url: Option<String>,
}

fn default_git_user_name() -> String {
    "Teaching Agent".to_string()
}

fn default_git_user_email() -> String {
    "agent@example.com".to_string()
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            user_name: default_git_user_name(),
            user_email: default_git_user_email(),
            remote_url: None,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Base directory for namespaces when no repository directory is given
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })
    }

    /// Resolve the chat-completions API key from config or environment.
    pub fn resolve_llm_api_key(&self) -> Result<String, ConfigError> {
        resolve_key("llm", self.llm.api_key.as_deref(), &self.llm.api_key_env)
    }

    /// Resolve the search API key from config or environment.
    pub fn resolve_search_api_key(&self) -> Result<String, ConfigError> {
        resolve_key(
            "search",
            self.search.api_key.as_deref(),
            &self.search.api_key_env,
        )
    }

    /// Resolve every credential a run needs, failing on the first missing one.
    pub fn validate_credentials(&self) -> Result<Credentials, ConfigError> {
        Ok(Credentials {
            search_api_key: self.resolve_search_api_key()?,
            llm_api_key: self.resolve_llm_api_key()?,
        })
    }
}

/// Credentials resolved at startup.
#[derive(Clone)]
pub struct Credentials {
    pub llm_api_key: String,
    pub search_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("llm_api_key", &"<redacted>")
            .field("search_api_key", &"<redacted>")
            .finish()
    }
}

fn resolve_key(endpoint: &str, explicit: Option<&str>, env_var: &str) -> Result<String, ConfigError> {
    if let Some(key) = explicit {
        let key = expand_env_vars(key);
        if !key.trim().is_empty() {
            return Ok(key);
        }
    }

    match std::env::var(env_var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ConfigError::MissingApiKey {
            endpoint: endpoint.to_string(),
            env_var: env_var.to_string(),
        }),
    }
}

fn env_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern"))
}

/// Expand environment variables in a string.
///
/// Supports ${VAR_NAME} syntax.
/// If the variable is not set, the placeholder is left unchanged.
pub fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();

    for cap in env_placeholder().captures_iter(s) {
        if let Ok(value) = std::env::var(&cap[1]) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Missing API key for {endpoint}: set {env_var} env var or api_key in config")]
    MissingApiKey { endpoint: String, env_var: String },
}
