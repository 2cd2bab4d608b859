use crate::application::use_cases::document_filter::available_teams;
use crate::application::{
    AnalysisUseCase, ComparisonUseCase, PersistenceUseCase, PicklistUseCase, SessionRegistry,
    SharedSession, SummaryChatEngine, UploadUseCase,
};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::session::{AnalysisPhase, EngineTask};
use crate::infrastructure::analysis_store::AnalysisStore;
use crate::infrastructure::config::{AppConfig, ConfigService};
use crate::infrastructure::llm_clients::LLMClient;
use crate::interfaces::http::LogEntry;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct AppState {
    pub config: AppConfig,
    pub config_service: ConfigService,
    pub llm_client: Arc<dyn LLMClient + Send + Sync>,
    pub sessions: SessionRegistry,
    pub upload_use_case: UploadUseCase,
    pub analysis_use_case: AnalysisUseCase,
    pub comparison_use_case: ComparisonUseCase,
    pub picklist_use_case: PicklistUseCase,
    pub persistence_use_case: PersistenceUseCase,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

/// Everything a front end needs to draw the four tabs.
#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub file_name: Option<String>,
    pub documents: usize,
    pub teams: Vec<String>,
    pub saved_teams: Vec<String>,
    pub current_team: String,
    pub current_response: String,
    pub phase: AnalysisPhase,
    pub busy: Option<EngineTask>,
    pub wanted: String,
    pub unwanted: String,
    pub has_history: bool,
    pub history_store: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        logs: Arc<Mutex<Vec<LogEntry>>>,
    ) -> Self {
        let engine = Arc::new(SummaryChatEngine::new(llm_client.clone()));
        let store = Arc::new(AnalysisStore::new(config.storage.storage_root.clone()));

        Self {
            config_service: ConfigService::new(),
            llm_client,
            sessions: SessionRegistry::with_limits(
                Duration::from_secs(config.sessions.idle_ttl_secs),
                config.sessions.max_sessions,
            ),
            upload_use_case: UploadUseCase::new(config.storage.data_dir.clone()),
            analysis_use_case: AnalysisUseCase::new(engine.clone()),
            comparison_use_case: ComparisonUseCase::new(engine.clone()),
            picklist_use_case: PicklistUseCase::new(engine),
            persistence_use_case: PersistenceUseCase::new(store),
            logs,
            config,
        }
    }

    /// Engine config with the API key this session should use.
    pub async fn llm_config_for(&self, session: &SharedSession) -> Result<LLMConfig> {
        let session_key = session.lock().await.api_key().map(str::to_string);
        self.resolve_llm_config(session_key.as_deref())
    }

    pub fn resolve_llm_config(&self, session_key: Option<&str>) -> Result<LLMConfig> {
        let api_key = self
            .config_service
            .resolve_api_key(&self.config.llm, session_key)?;

        if api_key.is_none() && self.config.llm.requires_api_key() {
            return Err(AppError::PreconditionError(
                "Enter your OpenAI API key first".to_string(),
            ));
        }

        Ok(self.config.llm.with_api_key(api_key))
    }

    pub async fn snapshot(&self, session: &SharedSession) -> SessionSnapshot {
        let has_history = self.persistence_use_case.has_history(session).await;
        let state = session.lock().await;
        let (wanted, unwanted) = state.preferences();

        SessionSnapshot {
            file_name: state.file_name().map(str::to_string),
            documents: state.documents().len(),
            teams: available_teams(state.documents()),
            saved_teams: state.saved_teams(),
            current_team: state.current_team().to_string(),
            current_response: state.current_response().to_string(),
            phase: state.phase(),
            busy: state.busy(),
            wanted: wanted.to_string(),
            unwanted: unwanted.to_string(),
            has_history,
            history_store: state.history_store().map(|p| p.to_path_buf()),
        }
    }
}
