use super::session_registry::SharedSession;
use crate::domain::error::{AppError, Result};
use crate::domain::saved_analysis::SavedAnalysis;
use crate::infrastructure::analysis_store::AnalysisStore;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HistoryLoad {
    /// Nothing was ever saved for this file; the usual case right after upload.
    NoHistory,
    Loaded { teams: Vec<String>, path: PathBuf },
}

/// Saved analyses to and from the per-file store.
pub struct PersistenceUseCase {
    store: Arc<AnalysisStore>,
}

impl PersistenceUseCase {
    pub fn new(store: Arc<AnalysisStore>) -> Self {
        Self { store }
    }

    pub async fn save_to_disk(&self, session: &SharedSession) -> Result<PathBuf> {
        let mut state = session.lock().await;
        let file_name = state.require_file()?.to_string();
        let analyses = state.require_saved_analyses(1)?;

        let store = self.store.clone();
        let target = file_name.clone();
        let path = run_blocking(move || store.save(&target, &analyses)).await?;
        state.set_history_store(path.clone());
        Ok(path)
    }

    pub async fn has_history(&self, session: &SharedSession) -> bool {
        let state = session.lock().await;
        state
            .file_name()
            .map(|file_name| self.store.exists(file_name))
            .unwrap_or(false)
    }

    /// Merge the stored analyses into the session, overwriting by team.
    pub async fn load_history(&self, session: &SharedSession) -> Result<HistoryLoad> {
        let mut state = session.lock().await;
        let file_name = state.require_file()?.to_string();

        let store = self.store.clone();
        let target = file_name.clone();
        let loaded: Option<Vec<SavedAnalysis>> = run_blocking(move || store.load(&target)).await?;
        let Some(analyses) = loaded else {
            tracing::info!(file_name = %file_name, "No saved history");
            return Ok(HistoryLoad::NoHistory);
        };

        let teams = analyses
            .iter()
            .map(|analysis| analysis.team_number.clone())
            .collect::<Vec<_>>();
        state.merge_saved_analyses(analyses);

        let path = self.store.store_dir(&file_name);
        state.set_history_store(path.clone());

        tracing::info!(file_name = %file_name, teams = teams.len(), "Loaded analysis history");
        Ok(HistoryLoad::Loaded {
            teams: crate::domain::team::sorted_team_numbers(teams),
            path,
        })
    }
}

/// Store I/O off the async workers; the session lock stays held meanwhile.
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("Store task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::SessionState;
    use tokio::sync::Mutex as AsyncMutex;

    fn uploaded(file_name: &str) -> SharedSession {
        let mut state = SessionState::new();
        state.reset_for_upload(file_name.to_string(), Vec::new());
        Arc::new(AsyncMutex::new(state))
    }

    fn use_case(dir: &tempfile::TempDir) -> PersistenceUseCase {
        PersistenceUseCase::new(Arc::new(AnalysisStore::new(dir.path())))
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = use_case(&dir);

        let session = uploaded("week1.csv");
        session.lock().await.save_analysis("254", "- fast");
        persistence.save_to_disk(&session).await.unwrap();

        let fresh = uploaded("week1.csv");
        assert!(persistence.has_history(&fresh).await);
        let outcome = persistence.load_history(&fresh).await.unwrap();

        assert_eq!(
            outcome,
            HistoryLoad::Loaded {
                teams: vec!["254".to_string()],
                path: dir.path().join("storage_week1.csv"),
            }
        );
        assert_eq!(fresh.lock().await.saved_analysis("254"), Some("- fast"));
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = use_case(&dir);
        let session = uploaded("week1.csv");
        {
            let mut state = session.lock().await;
            state.save_analysis("254", "- fast");
            state.save_analysis("118", "- slow");
        }
        persistence.save_to_disk(&session).await.unwrap();

        persistence.load_history(&session).await.unwrap();
        let first = session.lock().await.saved_analysis_list();
        persistence.load_history(&session).await.unwrap();
        let second = session.lock().await.saved_analysis_list();
        assert_eq!(first, second);
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn test_fresh_file_has_no_history() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = use_case(&dir);
        let session = uploaded("week2.csv");

        assert!(!persistence.has_history(&session).await);
        assert_eq!(
            persistence.load_history(&session).await.unwrap(),
            HistoryLoad::NoHistory
        );
    }

    #[tokio::test]
    async fn test_save_requires_an_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let result = use_case(&dir).save_to_disk(&uploaded("week1.csv")).await;
        assert!(matches!(result, Err(AppError::PreconditionError(_))));
    }

    #[tokio::test]
    async fn test_requires_upload() {
        let dir = tempfile::tempdir().unwrap();
        let session = Arc::new(AsyncMutex::new(SessionState::new()));
        assert!(use_case(&dir).load_history(&session).await.is_err());
        assert!(!use_case(&dir).has_history(&session).await);
    }
}
