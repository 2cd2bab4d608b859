pub mod openai;

use crate::domain::error::Result;
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;

pub use openai::OpenAIClient;

/// The summarization/ranking engine seam.
#[async_trait]
pub trait LLMClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String>;
    async fn list_models(&self, config: &LLMConfig) -> Result<Vec<String>>;
}
