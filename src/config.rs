use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::retry::RetryPolicy;

const DEFAULT_CONFIG_FILE: &str = ".pr-reviewer.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .pr-reviewer.toml.
///
/// All fields are optional; credentials fall back to the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub review: ReviewConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: "https://api.github.com".to_string(),
        }
    }
}

impl GitHubConfig {
    /// Config file value takes precedence, falls back to GITHUB_TOKEN.
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key. If None, falls back to OPENAI_API_KEY env var.
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://api.openai.com".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            timeout_secs: 120,
        }
    }
}

impl OpenAiConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }
}

/// How a file's patch is turned into the code sent for analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructionMode {
    /// Parse and validate hunks, drop malformed ones
    #[default]
    Parsed,
    /// Strip markers from the raw patch text without validation
    Raw,
}

/// Which line numbers a suggestion is anchored to on the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionAnchor {
    /// Post-change line numbers (hunk target range).
    ///
    /// The replaced range spans the suggested hunk's target length, which
    /// is the length after the suggestion is applied. When a suggestion adds
    /// lines, that range also covers head lines the hunk never touched and
    /// the suggestion overwrites them. Use `source` when the model numbers
    /// its diff against the current head file and suggestions add lines.
    #[default]
    Target,
    /// Pre-change line numbers (hunk source range)
    Source,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Maximum number of changed files analyzed per run
    pub max_files: usize,
    /// Extensions (with leading dot) that are never analyzed
    pub ignore_extensions: Vec<String>,
    /// Upper bound on the analysis prompt length, in characters
    pub max_prompt_chars: usize,
    pub reconstruction: ReconstructionMode,
    pub suggestion_anchor: SuggestionAnchor,
    /// Post parsed suggestions as inline comments once the summary succeeds
    pub post_suggestions: bool,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_files: 50,
            ignore_extensions: vec![".ipynb".to_string(), ".lock".to_string()],
            max_prompt_chars: 24_000,
            reconstruction: ReconstructionMode::default(),
            suggestion_anchor: SuggestionAnchor::default(),
            post_suggestions: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay_ms: 200,
            max_delay_secs: 60,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from .pr-reviewer.toml in the
    /// current directory. Returns default config if that file doesn't exist.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from(path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }
}
