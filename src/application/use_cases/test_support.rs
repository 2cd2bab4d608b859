use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::llm_clients::LLMClient;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
}

/// `LLMClient` that plays back canned replies and records its prompts.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
}

impl ScriptedClient {
    pub fn replying(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from(vec![Err(AppError::EngineError(
                message.to_string(),
            ))])),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMClient for ScriptedClient {
    async fn generate(&self, _config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        self.calls.lock().unwrap().push(RecordedCall {
            system: system.to_string(),
            user: user.to_string(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(AppError::EngineError("no scripted reply left".to_string())))
    }

    async fn list_models(&self, _config: &LLMConfig) -> Result<Vec<String>> {
        Ok(vec!["scripted".to_string()])
    }
}
