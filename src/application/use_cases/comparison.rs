use super::chat_engine::SummaryChatEngine;
use super::engine_task::run_engine_task;
use super::prompts::comparison_prompt;
use super::session_registry::SharedSession;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::saved_analysis::SavedAnalysis;
use crate::domain::session::EngineTask;
use serde::Serialize;
use std::sync::Arc;

const MIN_SAVED_FOR_COMPARISON: usize = 2;

/// The two team selectors of the comparison tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonChoices {
    pub first: Vec<String>,
    pub selected_first: String,
    /// `first` without `selected_first`.
    pub second: Vec<String>,
}

/// `teams` must be sorted and hold at least one entry.
pub fn comparison_choices(teams: Vec<String>, first: Option<&str>) -> Result<ComparisonChoices> {
    let selected_first = match first {
        Some(team) if teams.iter().any(|t| t == team) => team.to_string(),
        Some(team) => {
            return Err(AppError::InputError(format!(
                "Team {} has no saved analysis",
                team
            )))
        }
        None => teams
            .first()
            .cloned()
            .ok_or_else(|| AppError::PreconditionError("No saved analyses".to_string()))?,
    };

    let second = teams
        .iter()
        .filter(|team| **team != selected_first)
        .cloned()
        .collect();

    Ok(ComparisonChoices {
        first: teams,
        selected_first,
        second,
    })
}

pub struct ComparisonUseCase {
    engine: Arc<SummaryChatEngine>,
}

impl ComparisonUseCase {
    pub fn new(engine: Arc<SummaryChatEngine>) -> Self {
        Self { engine }
    }

    pub async fn choices(
        &self,
        session: &SharedSession,
        first: Option<&str>,
    ) -> Result<ComparisonChoices> {
        let state = session.lock().await;
        state.require_saved_analyses(MIN_SAVED_FOR_COMPARISON)?;
        comparison_choices(state.saved_teams(), first)
    }

    /// Ask the engine which of two analyzed teams to pick. Nothing is stored.
    pub async fn compare(
        &self,
        session: SharedSession,
        config: &LLMConfig,
        first: &str,
        second: &str,
    ) -> Result<String> {
        let documents = {
            let mut state = session.lock().await;
            let analyses = state.require_saved_analyses(MIN_SAVED_FOR_COMPARISON)?;
            let choices = comparison_choices(state.saved_teams(), Some(first))?;
            if !choices.second.iter().any(|team| team == second) {
                return Err(AppError::InputError(format!(
                    "Choose a second team other than {} that has a saved analysis",
                    first
                )));
            }
            state.begin(EngineTask::Comparison)?;
            analyses
                .iter()
                .map(SavedAnalysis::to_document)
                .collect::<Vec<_>>()
        };

        tracing::info!(first, second, "Comparing teams");

        let engine = self.engine.clone();
        let config = config.clone();
        let prompt = comparison_prompt(first, second);

        run_engine_task(
            session,
            EngineTask::Comparison,
            async move { engine.chat(&config, None, &documents, &prompt).await },
            |_, _: &String| {},
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::ScriptedClient;
    use crate::domain::session::SessionState;
    use tokio::sync::Mutex as AsyncMutex;

    fn teams(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    fn session_with(saved: &[(&str, &str)]) -> SharedSession {
        let mut state = SessionState::new();
        state.reset_for_upload("week1.csv".to_string(), Vec::new());
        for (team, text) in saved {
            state.save_analysis(team, text);
        }
        Arc::new(AsyncMutex::new(state))
    }

    #[test]
    fn test_second_pool_excludes_first() {
        let all = teams(&["33", "254", "1678"]);
        for first in &all {
            let choices = comparison_choices(all.clone(), Some(first)).unwrap();
            assert!(!choices.second.contains(first));
            assert_eq!(choices.second.len(), all.len() - 1);
        }
    }

    #[test]
    fn test_first_defaults_to_lowest_team() {
        let choices = comparison_choices(teams(&["33", "254"]), None).unwrap();
        assert_eq!(choices.selected_first, "33");
        assert_eq!(choices.second, teams(&["254"]));
    }

    #[test]
    fn test_unknown_first_rejected() {
        assert!(comparison_choices(teams(&["33", "254"]), Some("118")).is_err());
    }

    #[tokio::test]
    async fn test_needs_two_saved_analyses() {
        let client = Arc::new(ScriptedClient::replying(&["unused"]));
        let use_case = ComparisonUseCase::new(Arc::new(SummaryChatEngine::new(client.clone())));
        let session = session_with(&[("254", "- fast")]);

        assert!(matches!(
            use_case.choices(&session, None).await,
            Err(AppError::PreconditionError(_))
        ));
        assert!(matches!(
            use_case
                .compare(session, &LLMConfig::default(), "254", "118")
                .await,
            Err(AppError::PreconditionError(_))
        ));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_compare_uses_saved_analyses() {
        let client = Arc::new(ScriptedClient::replying(&["Pick 254."]));
        let use_case = ComparisonUseCase::new(Arc::new(SummaryChatEngine::new(client.clone())));
        let session = session_with(&[("254", "- fast"), ("118", "- slow"), ("33", "- ok")]);

        let reply = use_case
            .compare(session.clone(), &LLMConfig::default(), "254", "118")
            .await
            .unwrap();

        assert_eq!(reply, "Pick 254.");
        let call = &client.calls()[0];
        assert!(call.system.contains("team_no: 254\n\n- fast"));
        assert!(call.system.contains("team_no: 118\n\n- slow"));
        assert!(call.user.contains("team 254 to team 118"));

        let state = session.lock().await;
        assert_eq!(state.busy(), None);
        assert_eq!(state.current_response(), "");
    }

    #[tokio::test]
    async fn test_same_team_twice_rejected() {
        let client = Arc::new(ScriptedClient::replying(&["unused"]));
        let use_case = ComparisonUseCase::new(Arc::new(SummaryChatEngine::new(client)));
        let session = session_with(&[("254", "- fast"), ("118", "- slow")]);

        let result = use_case
            .compare(session, &LLMConfig::default(), "254", "254")
            .await;
        assert!(matches!(result, Err(AppError::InputError(_))));
    }
}
