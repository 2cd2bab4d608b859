use super::chat_engine::SummaryChatEngine;
use super::document_filter::filter_documents;
use super::engine_task::run_engine_task;
use super::prompts::{analysis_prompt, ANALYSIS_SYSTEM_PROMPT};
use super::session_registry::SharedSession;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::saved_analysis::SavedAnalysis;
use crate::domain::session::EngineTask;
use std::sync::Arc;

/// Per-team summary: analyze, then save or clear.
pub struct AnalysisUseCase {
    engine: Arc<SummaryChatEngine>,
}

impl AnalysisUseCase {
    pub fn new(engine: Arc<SummaryChatEngine>) -> Self {
        Self { engine }
    }

    pub async fn analyze(
        &self,
        session: SharedSession,
        config: &LLMConfig,
        team_number: &str,
    ) -> Result<String> {
        let documents = {
            let mut state = session.lock().await;
            let documents = filter_documents(state.require_documents()?, team_number);
            if documents.iter().all(|doc| doc.is_context()) {
                return Err(AppError::InputError(format!(
                    "Team {} does not appear in {}",
                    team_number,
                    state.file_name().unwrap_or_default()
                )));
            }
            state.begin(EngineTask::Analysis)?;
            documents
        };

        tracing::info!(team = team_number, rows = documents.len() - 1, "Analyzing team");

        let engine = self.engine.clone();
        let config = config.clone();
        let prompt = analysis_prompt(team_number);
        let team = team_number.to_string();

        run_engine_task(
            session,
            EngineTask::Analysis,
            async move {
                engine
                    .chat(&config, Some(ANALYSIS_SYSTEM_PROMPT), &documents, &prompt)
                    .await
            },
            move |state, reply: &String| state.set_current_response(&team, reply.clone()),
        )
        .await
    }

    /// Keep the displayed response as the team's saved analysis.
    pub async fn save(&self, session: &SharedSession) -> Result<SavedAnalysis> {
        let saved = session.lock().await.save_current()?;
        tracing::info!(team = %saved.team_number, "Saved analysis");
        Ok(saved)
    }

    pub async fn clear(&self, session: &SharedSession) -> Result<()> {
        session.lock().await.clear_current()
    }

    pub async fn view(&self, session: &SharedSession, team_number: &str) -> Result<SavedAnalysis> {
        let state = session.lock().await;
        state.require_file()?;
        state
            .saved_analysis(team_number)
            .map(|text| SavedAnalysis::new(team_number, text))
            .ok_or_else(|| AppError::NotFound(format!("No saved analysis for team {}", team_number)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::ScriptedClient;
    use crate::domain::document::{Document, Metadata, Record};
    use crate::domain::session::{AnalysisPhase, SessionState};
    use std::time::Duration;
    use tokio::sync::Mutex as AsyncMutex;

    fn uploaded_session() -> SharedSession {
        let meta = Metadata::new();
        let documents = vec![
            Document::from_record(Record::header("match,team number,notes".into()), &meta),
            Document::from_record(Record::row("1, 254, fast".into(), "254".into()), &meta),
            Document::from_record(Record::row("1, 118, slow".into(), "118".into()), &meta),
        ];
        let mut state = SessionState::new();
        state.reset_for_upload("week1.csv".to_string(), documents);
        Arc::new(AsyncMutex::new(state))
    }

    fn use_case(client: Arc<ScriptedClient>) -> AnalysisUseCase {
        AnalysisUseCase::new(Arc::new(SummaryChatEngine::new(client)))
    }

    #[tokio::test]
    async fn test_analyze_sends_only_team_rows() {
        let client = Arc::new(ScriptedClient::replying(&["- fast cycles"]));
        let session = uploaded_session();

        let reply = use_case(client.clone())
            .analyze(session.clone(), &LLMConfig::default(), "254")
            .await
            .unwrap();

        assert_eq!(reply, "- fast cycles");
        let calls = client.calls();
        assert!(calls[0].system.contains("1, 254, fast"));
        assert!(!calls[0].system.contains("1, 118, slow"));
        assert!(calls[0].system.contains("match,team number,notes"));
        assert!(calls[0].user.contains("team 254"));

        let state = session.lock().await;
        assert_eq!(state.current_team(), "254");
        assert_eq!(state.current_response(), "- fast cycles");
        assert_eq!(state.phase(), AnalysisPhase::Displaying);
    }

    #[tokio::test]
    async fn test_analyze_without_upload() {
        let client = Arc::new(ScriptedClient::replying(&["unused"]));
        let session = Arc::new(AsyncMutex::new(SessionState::new()));
        let result = use_case(client.clone())
            .analyze(session, &LLMConfig::default(), "254")
            .await;
        assert!(matches!(result, Err(AppError::PreconditionError(_))));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_team_rejected() {
        let client = Arc::new(ScriptedClient::replying(&["unused"]));
        let result = use_case(client)
            .analyze(uploaded_session(), &LLMConfig::default(), "9999")
            .await;
        assert!(matches!(result, Err(AppError::InputError(_))));
    }

    #[tokio::test]
    async fn test_engine_failure_keeps_previous_response() {
        let session = uploaded_session();
        session
            .lock()
            .await
            .set_current_response("118", "- earlier".to_string());

        let client = Arc::new(ScriptedClient::failing("rate limited"));
        let result = use_case(client)
            .analyze(session.clone(), &LLMConfig::default(), "254")
            .await;

        assert!(matches!(result, Err(AppError::EngineError(_))));
        let state = session.lock().await;
        assert_eq!(state.current_team(), "118");
        assert_eq!(state.current_response(), "- earlier");
        assert_eq!(state.busy(), None);
    }

    #[tokio::test]
    async fn test_second_analyze_while_busy_is_refused() {
        let client = Arc::new(
            ScriptedClient::replying(&["- first"]).with_delay(Duration::from_millis(200)),
        );
        let analysis = Arc::new(use_case(client.clone()));
        let session = uploaded_session();

        let first = {
            let analysis = analysis.clone();
            let session = session.clone();
            tokio::spawn(async move {
                analysis
                    .analyze(session, &LLMConfig::default(), "254")
                    .await
            })
        };

        while session.lock().await.busy().is_none() {
            tokio::task::yield_now().await;
        }

        let second = analysis
            .analyze(session.clone(), &LLMConfig::default(), "118")
            .await;
        assert!(matches!(second, Err(AppError::PreconditionError(_))));

        assert_eq!(first.await.unwrap().unwrap(), "- first");
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_during_analysis_is_refused() {
        let client = Arc::new(
            ScriptedClient::replying(&["- fast"]).with_delay(Duration::from_millis(200)),
        );
        let analysis = Arc::new(use_case(client));
        let session = uploaded_session();

        let running = {
            let analysis = analysis.clone();
            let session = session.clone();
            tokio::spawn(async move {
                analysis
                    .analyze(session, &LLMConfig::default(), "254")
                    .await
            })
        };

        while session.lock().await.busy().is_none() {
            tokio::task::yield_now().await;
        }

        assert!(matches!(
            analysis.clear(&session).await,
            Err(AppError::PreconditionError(_))
        ));

        running.await.unwrap().unwrap();
        {
            let state = session.lock().await;
            assert_eq!(state.current_team(), "254");
            assert_eq!(state.current_response(), "- fast");
        }

        analysis.clear(&session).await.unwrap();
        let state = session.lock().await;
        assert_eq!(state.current_response(), "");
        assert_eq!(state.phase(), AnalysisPhase::Idle);
    }

    #[tokio::test]
    async fn test_save_clear_and_view() {
        let client = Arc::new(ScriptedClient::replying(&["- fast", "- slow"]));
        let analysis = use_case(client);
        let session = uploaded_session();

        analysis
            .analyze(session.clone(), &LLMConfig::default(), "254")
            .await
            .unwrap();
        let saved = analysis.save(&session).await.unwrap();
        assert_eq!(saved, SavedAnalysis::new("254", "- fast"));
        assert_eq!(session.lock().await.phase(), AnalysisPhase::Idle);

        analysis
            .analyze(session.clone(), &LLMConfig::default(), "118")
            .await
            .unwrap();
        analysis.clear(&session).await.unwrap();
        assert!(analysis.save(&session).await.is_err());

        assert_eq!(analysis.view(&session, "254").await.unwrap().text, "- fast");
        assert!(matches!(
            analysis.view(&session, "118").await,
            Err(AppError::NotFound(_))
        ));
    }
}
