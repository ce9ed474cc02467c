use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RemarkError;

/// Top-level configuration loaded from `.remark.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use remark_core::RemarkConfig;
///
/// let config = RemarkConfig::default();
/// assert_eq!(config.analysis.max_comments_per_column, 20);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemarkConfig {
    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Batch analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl RemarkConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RemarkError::Io`] if the file cannot be read, or
    /// [`RemarkError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use remark_core::RemarkConfig;
    /// use std::path::Path;
    ///
    /// let config = RemarkConfig::from_file(Path::new(".remark.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, RemarkError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`RemarkError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use remark_core::RemarkConfig;
    ///
    /// let toml = r#"
    /// [analysis]
    /// max_comments_per_column = 50
    /// "#;
    /// let config = RemarkConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.analysis.max_comments_per_column, 50);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, RemarkError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Check value ranges that TOML alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`RemarkError::Config`] naming the first offending setting.
    ///
    /// # Examples
    ///
    /// ```
    /// use remark_core::RemarkConfig;
    ///
    /// let mut config = RemarkConfig::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.analysis.delay_secs = -1.0;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), RemarkError> {
        if self.analysis.max_comments_per_column == 0 {
            return Err(RemarkError::Config(
                "analysis.max_comments_per_column must be at least 1".into(),
            ));
        }
        if !self.analysis.delay_secs.is_finite() || self.analysis.delay_secs < 0.0 {
            return Err(RemarkError::Config(format!(
                "analysis.delay_secs must be a non-negative number of seconds, got {}",
                self.analysis.delay_secs
            )));
        }
        if self.llm.timeout_secs == 0 {
            return Err(RemarkError::Config(
                "llm.timeout_secs must be at least 1".into(),
            ));
        }
        match self.llm.provider.as_str() {
            "gemini" | "openai" => Ok(()),
            other => Err(RemarkError::Config(format!(
                "unknown llm.provider '{other}' (expected \"gemini\" or \"openai\")"
            ))),
        }
    }
}

/// LLM provider configuration.
///
/// # Examples
///
/// ```
/// use remark_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.provider, "gemini");
/// assert_eq!(config.model, "gemini-2.0-flash");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name: `"gemini"` or `"openai"` (any OpenAI-compatible endpoint).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider. Falls back to the provider's env vars.
    pub api_key: Option<String>,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
    /// Per-request timeout in seconds (default: 60).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sampling temperature (default: 0.1).
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_provider() -> String {
    "gemini".into()
}

fn default_model() -> String {
    "gemini-2.0-flash".into()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f64 {
    0.1
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

impl LlmConfig {
    /// Environment variables consulted for the API key, in priority order.
    ///
    /// # Examples
    ///
    /// ```
    /// use remark_core::LlmConfig;
    ///
    /// let config = LlmConfig::default();
    /// assert_eq!(config.api_key_env_vars(), &["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    /// ```
    pub fn api_key_env_vars(&self) -> &'static [&'static str] {
        match self.provider.as_str() {
            "openai" => &["OPENAI_API_KEY"],
            _ => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        }
    }

    /// Resolve the API key from the config, then the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`RemarkError::Config`] when no key is available.
    pub fn resolve_api_key(&self) -> Result<String, RemarkError> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Resolve the API key using `lookup` in place of the process environment.
    ///
    /// Blank values count as missing.
    ///
    /// # Examples
    ///
    /// ```
    /// use remark_core::LlmConfig;
    ///
    /// let config = LlmConfig::default();
    /// let key = config
    ///     .resolve_api_key_with(|name| (name == "GOOGLE_API_KEY").then(|| "k-123".to_string()))
    ///     .unwrap();
    /// assert_eq!(key, "k-123");
    /// assert!(config.resolve_api_key_with(|_| None).is_err());
    /// ```
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Result<String, RemarkError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.to_string());
        }
        for name in self.api_key_env_vars() {
            if let Some(key) = lookup(name).filter(|k| !k.trim().is_empty()) {
                return Ok(key);
            }
        }
        Err(RemarkError::Config(format!(
            "no API key for provider '{}': set {} or llm.api_key in .remark.toml",
            self.provider,
            self.api_key_env_vars().join(" or ")
        )))
    }

    /// Per-request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Batch analysis configuration.
///
/// # Examples
///
/// ```
/// use remark_core::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.max_comments_per_column, 20);
/// assert_eq!(config.delay_secs, 0.5);
/// assert_eq!(config.columns.len(), 6);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Maximum comments analyzed per source column (default: 20).
    #[serde(default = "default_max_comments_per_column")]
    pub max_comments_per_column: usize,
    /// Pause between consecutive LLM calls, in seconds (default: 0.5).
    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,
    /// Free-text column labels analyzed when present, matched exactly.
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,
    /// Header fragments used to preview likely comment columns.
    #[serde(default = "default_detect_keywords")]
    pub detect_keywords: Vec<String>,
}

fn default_max_comments_per_column() -> usize {
    20
}

fn default_delay_secs() -> f64 {
    0.5
}

fn default_columns() -> Vec<String> {
    [
        "【必須】本日の講義で学んだことを50文字以上で入力してください。",
        "（任意）本日の講義で特によかった部分について、具体的にお教えください。",
        "（任意）分かりにくかった部分や改善点などがあれば、具体的にお教えください。",
        "（任意）講師について、よかった点や不満があった点などについて、具体的にお教えください。",
        "（任意）今後開講してほしい講義・分野などがあればお書きください。",
        "（任意）ご自由にご意見をお書きください。",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_detect_keywords() -> Vec<String> {
    [
        "コメント",
        "意見",
        "感想",
        "要望",
        "改善",
        "よかった",
        "わかりにくかった",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_comments_per_column: default_max_comments_per_column(),
            delay_secs: default_delay_secs(),
            columns: default_columns(),
            detect_keywords: default_detect_keywords(),
        }
    }
}

impl AnalysisConfig {
    /// Inter-call pause as a [`Duration`].
    ///
    /// Negative or non-finite values collapse to zero; call
    /// [`RemarkConfig::validate`] to reject them instead.
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_secs).unwrap_or(Duration::ZERO)
    }
}
