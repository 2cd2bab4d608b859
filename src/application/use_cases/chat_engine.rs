use crate::domain::document::Document;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::clean_llm_response;
use std::sync::Arc;

const CONTEXT_SEPARATOR: &str = "---------------------";

/// Answers one message over a fixed set of documents.
///
/// Every document is handed to the model in full; sheets for one team and
/// the saved analyses of one competition fit comfortably in a single call.
pub struct SummaryChatEngine {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
}

impl SummaryChatEngine {
    pub fn new(llm_client: Arc<dyn LLMClient + Send + Sync>) -> Self {
        Self { llm_client }
    }

    pub fn build_context(documents: &[Document]) -> String {
        documents
            .iter()
            .map(Document::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn build_system_prompt(instructions: Option<&str>, documents: &[Document]) -> String {
        let context = format!(
            "Context information is below.\n{}\n{}\n{}\nAnswer using the context information above.",
            CONTEXT_SEPARATOR,
            Self::build_context(documents),
            CONTEXT_SEPARATOR
        );

        match instructions.map(str::trim).filter(|s| !s.is_empty()) {
            Some(instructions) => format!("{}\n\n{}", instructions, context),
            None => context,
        }
    }

    pub async fn chat(
        &self,
        config: &LLMConfig,
        instructions: Option<&str>,
        documents: &[Document],
        message: &str,
    ) -> Result<String> {
        let system_prompt = Self::build_system_prompt(instructions, documents);

        tracing::debug!(
            documents = documents.len(),
            model = %config.model,
            "Submitting engine request"
        );

        let raw = self
            .llm_client
            .generate(config, &system_prompt, message)
            .await?;

        let reply = clean_llm_response(&raw);
        if reply.is_empty() {
            return Err(AppError::EngineError(
                "The engine returned an empty reply".to_string(),
            ));
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::ScriptedClient;
    use crate::domain::document::Metadata;

    fn docs() -> Vec<Document> {
        let mut meta = Metadata::new();
        meta.insert("team_no".to_string(), "254".to_string());
        vec![
            Document::new("header", Metadata::new()),
            Document::new("- fast", meta),
        ]
    }

    #[test]
    fn test_system_prompt_wraps_context() {
        let prompt = SummaryChatEngine::build_system_prompt(Some("Rank them."), &docs());
        assert!(prompt.starts_with("Rank them.\n\nContext information is below."));
        assert!(prompt.contains("header\n\nteam_no: 254\n\n- fast"));
    }

    #[test]
    fn test_blank_instructions_are_omitted() {
        let prompt = SummaryChatEngine::build_system_prompt(Some("  "), &docs());
        assert!(prompt.starts_with("Context information is below."));
    }

    #[tokio::test]
    async fn test_chat_cleans_reply() {
        let client = Arc::new(ScriptedClient::replying(&["<think>hmm</think>\n- strong auto"]));
        let engine = SummaryChatEngine::new(client.clone());

        let reply = engine
            .chat(&LLMConfig::default(), None, &docs(), "Summarize 254")
            .await
            .unwrap();

        assert_eq!(reply, "- strong auto");
        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].user, "Summarize 254");
    }

    #[tokio::test]
    async fn test_empty_reply_is_engine_error() {
        let engine = SummaryChatEngine::new(Arc::new(ScriptedClient::replying(&["  "])));
        let result = engine
            .chat(&LLMConfig::default(), None, &docs(), "Summarize 254")
            .await;
        assert!(matches!(result, Err(AppError::EngineError(_))));
    }
}
