use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DiffwardenError;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".diffwarden.toml";

/// Top-level configuration loaded from `.diffwarden.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use diffwarden_core::DiffwardenConfig;
///
/// let config = DiffwardenConfig::default();
/// assert_eq!(config.llm.model, "gpt-4o-mini");
/// assert_eq!(config.app.port, 5000);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffwardenConfig {
    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Review run settings.
    #[serde(default)]
    pub review: ReviewConfig,
    /// Demonstration server settings.
    #[serde(default)]
    pub app: AppConfig,
}

impl DiffwardenConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DiffwardenError::FileNotFound`] if the file does not exist,
    /// [`DiffwardenError::Io`] if it cannot be read, or
    /// [`DiffwardenError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use diffwarden_core::DiffwardenConfig;
    /// use std::path::Path;
    ///
    /// let config = DiffwardenConfig::from_file(Path::new(".diffwarden.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, DiffwardenError> {
        if !path.exists() {
            return Err(DiffwardenError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`DiffwardenError::Toml`] if parsing fails, or
    /// [`DiffwardenError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use diffwarden_core::DiffwardenConfig;
    ///
    /// let toml = r#"
    /// [review]
    /// output = "reports/review.txt"
    /// "#;
    /// let config = DiffwardenConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.review.output.to_str(), Some("reports/review.txt"));
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, DiffwardenError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.diffwarden.toml` from `dir` when present, otherwise defaults.
    ///
    /// # Errors
    ///
    /// Same as [`DiffwardenConfig::from_file`] when the file exists.
    pub fn discover(dir: &Path) -> Result<Self, DiffwardenError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<(), DiffwardenError> {
        if self.llm.model.trim().is_empty() {
            return Err(DiffwardenError::Config("llm.model must not be empty".into()));
        }
        if self.llm.timeout_secs == 0 {
            return Err(DiffwardenError::Config(
                "llm.timeout_secs must be greater than zero".into(),
            ));
        }
        if let Some(t) = self.llm.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(DiffwardenError::Config(format!(
                    "llm.temperature must be between 0 and 2, got {t}"
                )));
            }
        }
        Ok(())
    }
}

/// LLM provider configuration.
///
/// Any provider exposing an OpenAI-compatible `/v1/chat/completions`
/// endpoint works; point `base_url` at it.
///
/// # Examples
///
/// ```
/// use diffwarden_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.model, "gpt-4o-mini");
/// assert_eq!(config.api_key_env, "OPENAI_API_KEY");
/// assert_eq!(config.timeout_secs, 120);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider. Prefer the environment variable.
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Custom base URL for API requests (default: `https://api.openai.com`).
    pub base_url: Option<String>,
    /// Sampling temperature. Omitted from the request when unset.
    pub temperature: Option<f64>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            base_url: None,
            temperature: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the process environment.
    ///
    /// Returns the configured `api_key` if set, otherwise the value of the
    /// `api_key_env` variable. Blank values count as missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Resolve the API key using `lookup` in place of the process environment.
    ///
    /// # Examples
    ///
    /// ```
    /// use diffwarden_core::LlmConfig;
    ///
    /// let config = LlmConfig::default();
    /// let key = config.resolve_api_key_with(|name| {
    ///     (name == "OPENAI_API_KEY").then(|| "sk-test".to_string())
    /// });
    /// assert_eq!(key.as_deref(), Some("sk-test"));
    /// ```
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Option<String>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        self.api_key
            .clone()
            .or_else(|| lookup(&self.api_key_env))
            .filter(|k| !k.trim().is_empty())
    }

    /// Human-readable name of the endpoint for status lines.
    ///
    /// # Examples
    ///
    /// ```
    /// use diffwarden_core::LlmConfig;
    ///
    /// assert_eq!(LlmConfig::default().provider_label(), "OpenAI");
    ///
    /// let local = LlmConfig {
    ///     base_url: Some("http://localhost:11434/".into()),
    ///     ..LlmConfig::default()
    /// };
    /// assert_eq!(local.provider_label(), "localhost:11434");
    /// ```
    pub fn provider_label(&self) -> String {
        if self.base_url.is_none() {
            return "OpenAI".into();
        }
        let url = self.base_url();
        let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
        without_scheme
            .split('/')
            .next()
            .unwrap_or(without_scheme)
            .to_string()
    }

    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or("https://api.openai.com")
            .trim_end_matches('/')
    }
}

/// Review run configuration.
///
/// # Examples
///
/// ```
/// use diffwarden_core::ReviewConfig;
///
/// let config = ReviewConfig::default();
/// assert_eq!(config.repo.to_str(), Some("."));
/// assert_eq!(config.output.to_str(), Some("ai_review_report.txt"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Repository checkout whose last commit is reviewed.
    #[serde(default = "default_repo")]
    pub repo: PathBuf,
    /// Report file, overwritten on every run.
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_repo() -> PathBuf {
    PathBuf::from(".")
}

fn default_output() -> PathBuf {
    PathBuf::from("ai_review_report.txt")
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            repo: default_repo(),
            output: default_output(),
        }
    }
}

/// Demonstration server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    5000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Socket address for `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`DiffwardenError::Config`] if `host` is not an IP address.
    ///
    /// # Examples
    ///
    /// ```
    /// use diffwarden_core::AppConfig;
    ///
    /// let addr = AppConfig::default().socket_addr().unwrap();
    /// assert_eq!(addr.to_string(), "0.0.0.0:5000");
    /// ```
    pub fn socket_addr(&self) -> Result<SocketAddr, DiffwardenError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| DiffwardenError::Config(format!("invalid app.host '{}': {e}", self.host)))
    }
}
