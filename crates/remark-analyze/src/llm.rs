use async_trait::async_trait;
use remark_core::{LlmConfig, RemarkError};

/// A remote text-generation endpoint: prompt in, raw text out.
///
/// The output carries no formatting guarantee; callers must treat it as
/// untrusted text.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use remark_analyze::llm::Inference;
/// use remark_core::RemarkError;
///
/// struct Echo;
///
/// #[async_trait]
/// impl Inference for Echo {
///     async fn infer(&self, prompt: &str) -> Result<String, RemarkError> {
///         Ok(prompt.to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait Inference: Send + Sync {
    /// Send `prompt` and return the model's text response.
    ///
    /// # Errors
    ///
    /// Returns [`RemarkError::Llm`] on transport, quota, or response-shape
    /// failures.
    async fn infer(&self, prompt: &str) -> Result<String, RemarkError>;
}

/// HTTP client for the configured LLM provider.
///
/// Supports Gemini (`generateContent`) and any endpoint exposing the OpenAI
/// `/v1/chat/completions` API (OpenAI, Ollama, vLLM, LiteLLM, etc.).
///
/// # Examples
///
/// ```
/// use remark_core::LlmConfig;
/// use remark_analyze::llm::LlmClient;
///
/// let config = LlmConfig {
///     api_key: Some("test-key".into()),
///     ..LlmConfig::default()
/// };
/// let client = LlmClient::from_config(&config).unwrap();
/// assert_eq!(client.model(), "gemini-2.0-flash");
/// ```
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
    api_key: String,
}

impl LlmClient {
    /// Create a client, resolving the API key from config or environment.
    ///
    /// This is the fatal configuration check: it runs before any batch work.
    ///
    /// # Errors
    ///
    /// Returns [`RemarkError::Config`] if no API key is available, or
    /// [`RemarkError::Llm`] if the HTTP client cannot be built.
    pub fn from_config(config: &LlmConfig) -> Result<Self, RemarkError> {
        let api_key = config.resolve_api_key()?;
        Self::with_api_key(config, api_key)
    }

    /// Create a client with an explicit API key.
    ///
    /// # Errors
    ///
    /// Returns [`RemarkError::Config`] if the key is blank, or
    /// [`RemarkError::Llm`] if the HTTP client cannot be built.
    pub fn with_api_key(config: &LlmConfig, api_key: String) -> Result<Self, RemarkError> {
        if api_key.trim().is_empty() {
            return Err(RemarkError::Config("API key is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| RemarkError::Llm(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
            api_key,
        })
    }

    /// Return the model name from the configuration.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Return the provider name from the configuration.
    pub fn provider(&self) -> &str {
        &self.config.provider
    }

    /// Send a chat completion request and return the text response.
    ///
    /// Builds a request to `{base_url}/v1/chat/completions` carrying `prompt`
    /// as a single user message with the configured temperature.
    ///
    /// # Errors
    ///
    /// Returns [`RemarkError::Llm`] on HTTP errors or response parsing failures.
    pub async fn chat(&self, prompt: &str) -> Result<String, RemarkError> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com");
        let url = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));

        let body = self.chat_body(prompt);
        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body);

        let response_body = send(request).await?;
        extract_openai_text(&response_body)
    }

    fn chat_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "messages": [ { "role": "user", "content": prompt } ],
            "temperature": self.config.temperature,
        })
    }

    /// Send a single-turn `generateContent` request to Gemini.
    ///
    /// # Errors
    ///
    /// Returns [`RemarkError::Llm`] on HTTP errors or response parsing failures.
    pub async fn generate(&self, prompt: &str) -> Result<String, RemarkError> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://generativelanguage.googleapis.com");
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            self.config.model
        );

        let body = serde_json::json!({
            "contents": [
                { "role": "user", "parts": [ { "text": prompt } ] }
            ],
            "generationConfig": { "temperature": self.config.temperature },
        });

        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body);

        let response_body = send(request).await?;
        extract_gemini_text(&response_body)
    }
}

#[async_trait]
impl Inference for LlmClient {
    async fn infer(&self, prompt: &str) -> Result<String, RemarkError> {
        match self.config.provider.as_str() {
            "openai" => self.chat(prompt).await,
            _ => self.generate(prompt).await,
        }
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<serde_json::Value, RemarkError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            RemarkError::Llm(format!("request timed out: {e}"))
        } else {
            RemarkError::Llm(format!("request failed: {e}"))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(RemarkError::Llm(format!(
            "LLM API error {status}: {body_text}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| RemarkError::Llm(format!("failed to parse response: {e}")))
}

fn extract_openai_text(body: &serde_json::Value) -> Result<String, RemarkError> {
    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(String::from)
        .ok_or_else(|| RemarkError::Llm(format!("unexpected response structure: {body}")))
}

fn extract_gemini_text(body: &serde_json::Value) -> Result<String, RemarkError> {
    let parts = body
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| RemarkError::Llm(format!("unexpected response structure: {body}")))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    if text.is_empty() {
        return Err(RemarkError::Llm(format!("response has no text: {body}")));
    }
    Ok(text)
}
