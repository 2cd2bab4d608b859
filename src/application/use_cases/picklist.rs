use super::chat_engine::SummaryChatEngine;
use super::engine_task::run_engine_task;
use super::prompts::{PicklistPromptBuilder, PICKLIST_SYSTEM_PROMPT};
use super::session_registry::SharedSession;
use crate::domain::error::Result;
use crate::domain::llm_config::LLMConfig;
use crate::domain::saved_analysis::SavedAnalysis;
use crate::domain::session::EngineTask;
use serde::Serialize;
use std::sync::Arc;

const MIN_SAVED_FOR_PICKLIST: usize = 2;

#[derive(Debug, Clone, Serialize)]
pub struct Picklist {
    /// Every team named in the instruction, in order.
    pub teams: Vec<String>,
    pub instruction: String,
    pub ranking: String,
}

pub struct PicklistUseCase {
    engine: Arc<SummaryChatEngine>,
}

impl PicklistUseCase {
    pub fn new(engine: Arc<SummaryChatEngine>) -> Self {
        Self { engine }
    }

    /// Rank every saved team. `wanted`/`unwanted`, when given, replace the
    /// session's stored preferences once the request has been accepted.
    pub async fn generate(
        &self,
        session: SharedSession,
        config: &LLMConfig,
        wanted: Option<String>,
        unwanted: Option<String>,
    ) -> Result<Picklist> {
        let (builder, documents) = {
            let mut state = session.lock().await;
            let analyses = state.require_saved_analyses(MIN_SAVED_FOR_PICKLIST)?;

            let (current_wanted, current_unwanted) = state.preferences();
            let wanted = wanted.unwrap_or_else(|| current_wanted.to_string());
            let unwanted = unwanted.unwrap_or_else(|| current_unwanted.to_string());
            let builder = PicklistPromptBuilder::new(state.saved_teams())
                .wanted(&wanted)
                .unwanted(&unwanted);

            state.begin(EngineTask::Picklist)?;
            state.set_preferences(wanted, unwanted);
            let documents = analyses
                .iter()
                .map(SavedAnalysis::to_document)
                .collect::<Vec<_>>();
            (builder, documents)
        };

        let instruction = builder.build();
        tracing::info!(teams = %builder.team_list(), "Generating picklist");

        let engine = self.engine.clone();
        let config = config.clone();
        let message = instruction.clone();

        let ranking = run_engine_task(
            session,
            EngineTask::Picklist,
            async move {
                engine
                    .chat(&config, Some(PICKLIST_SYSTEM_PROMPT), &documents, &message)
                    .await
            },
            |_, _: &String| {},
        )
        .await?;

        Ok(Picklist {
            teams: builder.teams().to_vec(),
            instruction,
            ranking,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::ScriptedClient;
    use crate::domain::error::AppError;
    use crate::domain::session::SessionState;
    use tokio::sync::Mutex as AsyncMutex;

    fn session_with(saved: &[(&str, &str)]) -> SharedSession {
        let mut state = SessionState::new();
        state.reset_for_upload("week1.csv".to_string(), Vec::new());
        for (team, text) in saved {
            state.save_analysis(team, text);
        }
        Arc::new(AsyncMutex::new(state))
    }

    fn use_case(client: Arc<ScriptedClient>) -> PicklistUseCase {
        PicklistUseCase::new(Arc::new(SummaryChatEngine::new(client)))
    }

    #[tokio::test]
    async fn test_instruction_names_every_saved_team() {
        let client = Arc::new(ScriptedClient::replying(&["1. 254\n2. 1678\n3. 33", "ranked"]));
        let picklist = use_case(client.clone());
        let session = session_with(&[("1678", "- a"), ("254", "- b"), ("33", "- c")]);

        let result = picklist
            .generate(session.clone(), &LLMConfig::default(), None, None)
            .await
            .unwrap();

        assert_eq!(result.teams, vec!["33", "254", "1678"]);
        assert!(result.instruction.contains("These are the current teams 33, 254, 1678."));
        assert_eq!(result.ranking, "1. 254\n2. 1678\n3. 33");
        let call = &client.calls()[0];
        assert!(call.system.starts_with("Create a single picklist of robots."));
        assert_eq!(call.user, result.instruction);

        session.lock().await.save_analysis("971", "- d");
        let result = picklist
            .generate(session, &LLMConfig::default(), None, None)
            .await
            .unwrap();
        assert!(result.instruction.contains("33, 254, 971, 1678."));
    }

    #[tokio::test]
    async fn test_preferences_are_stored_and_applied() {
        let client = Arc::new(ScriptedClient::replying(&["ranked", "ranked again"]));
        let picklist = use_case(client.clone());
        let session = session_with(&[("254", "- b"), ("33", "- c")]);

        let result = picklist
            .generate(
                session.clone(),
                &LLMConfig::default(),
                Some(" amp ".to_string()),
                Some("".to_string()),
            )
            .await
            .unwrap();
        assert!(result.instruction.contains("amp is important."));
        assert!(!result.instruction.contains("not important"));
        assert_eq!(session.lock().await.preferences(), (" amp ", ""));

        let result = picklist
            .generate(session, &LLMConfig::default(), None, Some("defense".to_string()))
            .await
            .unwrap();
        assert!(result.instruction.contains("amp is important. defense is not important."));
    }

    #[tokio::test]
    async fn test_needs_two_saved_analyses() {
        let client = Arc::new(ScriptedClient::replying(&["unused"]));
        let result = use_case(client.clone())
            .generate(
                session_with(&[("254", "- b")]),
                &LLMConfig::default(),
                None,
                None,
            )
            .await;
        assert!(matches!(result, Err(AppError::PreconditionError(_))));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_request_keeps_stored_preferences() {
        let client = Arc::new(ScriptedClient::replying(&["unused"]));
        let picklist = use_case(client.clone());

        let session = session_with(&[("254", "- b")]);
        session
            .lock()
            .await
            .set_preferences("amp".to_string(), "defense".to_string());
        let result = picklist
            .generate(
                session.clone(),
                &LLMConfig::default(),
                Some("speaker".to_string()),
                Some("trap".to_string()),
            )
            .await;
        assert!(matches!(result, Err(AppError::PreconditionError(_))));
        assert_eq!(session.lock().await.preferences(), ("amp", "defense"));

        let session = session_with(&[("254", "- b"), ("33", "- c")]);
        session.lock().await.begin(EngineTask::Comparison).unwrap();
        let result = picklist
            .generate(
                session.clone(),
                &LLMConfig::default(),
                Some("speaker".to_string()),
                None,
            )
            .await;
        assert!(matches!(result, Err(AppError::PreconditionError(_))));
        assert_eq!(session.lock().await.preferences(), ("", ""));
        assert!(client.calls().is_empty());
    }
}
