use super::LLMClient;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelsResponse {
    data: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    id: String,
}

/// Client for OpenAI-compatible `chat/completions` servers.
pub struct OpenAIClient {
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn endpoint(config: &LLMConfig, path: &str) -> String {
        format!("{}/{}", config.base_url.trim_end_matches('/'), path)
    }

    fn api_key(config: &LLMConfig) -> Result<Option<String>> {
        match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(Some(key.to_string())),
            _ if config.requires_api_key() => Err(AppError::EngineError(
                "Missing API key for OpenAI provider".to_string(),
            )),
            _ => Ok(None),
        }
    }

    async fn error_from(response: reqwest::Response) -> AppError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        AppError::EngineError(format!("API error ({}): {}", status, text))
    }
}

impl Default for OpenAIClient {
    fn default() -> Self {
        Self::new(LLMConfig::default().request_timeout_secs)
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        let api_key = Self::api_key(config)?;
        let url = Self::endpoint(config, "chat/completions");

        let mut messages = Vec::with_capacity(2);
        if !system.trim().is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user,
        });

        let body = ChatRequest {
            model: &config.model,
            messages,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::EngineError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let json: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::EngineError(format!("Failed to parse JSON: {}", e)))?;

        json.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::EngineError("Invalid response format".to_string()))
    }

    async fn list_models(&self, config: &LLMConfig) -> Result<Vec<String>> {
        let api_key = Self::api_key(config)?;
        let url = Self::endpoint(config, "models");

        let mut request = self.client.get(&url);
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::EngineError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let json: ModelsResponse = response
            .json()
            .await
            .map_err(|e| AppError::EngineError(format!("Failed to parse JSON: {}", e)))?;

        Ok(json.data.into_iter().map(|model| model.id).collect())
    }
}
