use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum LLMProvider {
    /// OpenAI-compatible server on the local machine (LM Studio, Ollama).
    Local,
    OpenAI,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub request_timeout_secs: u64,
}

impl LLMConfig {
    /// Copy of this config carrying the given key.
    pub fn with_api_key(&self, api_key: Option<String>) -> Self {
        Self {
            api_key,
            ..self.clone()
        }
    }

    pub fn requires_api_key(&self) -> bool {
        self.provider == LLMProvider::OpenAI
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::OpenAI,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            max_tokens: None,
            temperature: Some(0.0),
            request_timeout_secs: 120,
        }
    }
}
