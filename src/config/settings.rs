//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// Credential resolution
// ---------------------------------------------------------------------------

/// Pick the explicit key when it is non-empty, otherwise read `env_var`.
fn resolve_key(explicit: Option<&str>, env_var: &str) -> Option<String> {
    if let Some(key) = explicit.filter(|k| !k.is_empty()) {
        return Some(key.to_string());
    }
    if env_var.is_empty() {
        return None;
    }
    std::env::var(env_var).ok().filter(|k| !k.is_empty())
}

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// Settings for the hosted multimodal chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API, including the version segment.
    ///
    /// `/chat/completions` is appended to form the request URL.
    pub base_url: String,
    /// API key. When `None` (or empty) the key is read from `api_key_env`.
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Overall transport timeout in seconds, covering the whole stream.
    pub timeout_secs: u64,
    /// Ask the endpoint for a terminal usage chunk.
    pub include_usage: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dashscope-intl.aliyuncs.com/compatible-mode/v1".into(),
            api_key: None,
            api_key_env: "DASHSCOPE_API_KEY".into(),
            model: "qwen3-omni-flash".into(),
            timeout_secs: 300,
            include_usage: true,
        }
    }
}

impl LlmConfig {
    /// The key to send as a bearer token, if any.
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_deref(), &self.api_key_env)
    }
}

// ---------------------------------------------------------------------------
// RubricConfig
// ---------------------------------------------------------------------------

/// Where the grading rubric comes from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RubricConfig {
    /// External rubric file replacing the built-in asset. `None` uses the
    /// built-in rubric unless `AppPaths::rubric_file` exists.
    pub path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// ScoringConfig
// ---------------------------------------------------------------------------

/// Settings for the secondary, reference-based feedback scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Whether sessions run the scorer when a reference text is supplied.
    pub enabled: bool,
    /// Base URL of the OpenAI-compatible embeddings API.
    pub base_url: String,
    /// API key. When `None` (or empty) the key is read from `api_key_env`.
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: String,
    /// Embedding model used for similarity scoring.
    pub embedding_model: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".into(),
            embedding_model: "text-embedding-3-small".into(),
            timeout_secs: 60,
        }
    }
}

impl ScoringConfig {
    /// The key to send as a bearer token, if any.
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_deref(), &self.api_key_env)
    }
}

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

/// Where session output (feedback text, score reports) is written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory. `None` means `AppPaths::results_dir`.
    pub dir: Option<PathBuf>,
}

impl OutputConfig {
    /// Configured directory, or the platform results directory.
    pub fn resolve_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().results_dir)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use ielts_speaking_eval::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save_to(std::path::Path::new("settings.toml")).unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Chat-completions endpoint settings.
    pub llm: LlmConfig,
    /// Rubric asset location.
    pub rubric: RubricConfig,
    /// Secondary scorer settings.
    pub scoring: ScoringConfig,
    /// Output location.
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
