use crate::error::SearchError;
use crate::traits::TextCompleter;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.groq.com/openai/v1/";
pub const DEFAULT_LLM_MODEL: &str = "llama3-8b-8192";

#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_LLM_MODEL.to_string(),
            temperature: 0.5,
            max_tokens: 1_024,
        }
    }
}

/// Client for any OpenAI-compatible `chat/completions` endpoint.
pub struct ChatCompletionClient {
    client: Client,
    completions_url: Url,
    api_key: Option<String>,
    settings: CompletionSettings,
}

impl ChatCompletionClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        settings: CompletionSettings,
    ) -> Result<Self, SearchError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            client: Client::new(),
            completions_url: base.join("chat/completions")?,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            settings,
        })
    }

    pub fn completions_url(&self) -> &Url {
        &self.completions_url
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.settings.model,
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
            "messages": [
                { "role": "user", "content": prompt }
            ],
        })
    }
}

#[async_trait]
impl TextCompleter for ChatCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, SearchError> {
        let mut request = self
            .client
            .post(self.completions_url.clone())
            .header("content-type", "application/json")
            .json(&self.request_body(prompt));

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(SearchError::Synthesis(format!(
                "completion endpoint returned {status}: {}",
                details.trim()
            )));
        }

        let parsed: Value = response.json().await?;
        parse_completion(&parsed)
    }
}

fn parse_completion(payload: &Value) -> Result<String, SearchError> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| {
            SearchError::Synthesis("completion response has no message content".to_string())
        })
}
