use super::document_filter::available_teams;
use super::session_registry::SharedSession;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::csv::{competition_metadata, CsvLoader};
use crate::infrastructure::storage::upload_path;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct UploadSummary {
    pub file_name: String,
    /// Header included.
    pub documents: usize,
    pub teams: Vec<String>,
}

pub struct UploadUseCase {
    loader: CsvLoader,
    data_dir: PathBuf,
}

impl UploadUseCase {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            loader: CsvLoader::new(),
            data_dir,
        }
    }

    /// Store the sheet, ingest it, and start the session over on it.
    ///
    /// The sheet is parsed from memory before anything is written or the
    /// session is touched, so a bad file leaves the previous upload, its copy
    /// on disk and its saved analyses in place.
    pub async fn execute(
        &self,
        session: &SharedSession,
        file_name: &str,
        content: &[u8],
    ) -> Result<UploadSummary> {
        if content.is_empty() {
            return Err(AppError::InputError("Upload a file first".to_string()));
        }

        let path = upload_path(&self.data_dir, file_name)?;
        let documents = self
            .loader
            .load_bytes(&path, content, Some(competition_metadata()))?;
        let summary = UploadSummary {
            file_name: file_name.to_string(),
            documents: documents.len(),
            teams: available_teams(&documents),
        };

        let mut state = session.lock().await;
        if let Some(task) = state.busy() {
            return Err(AppError::PreconditionError(format!(
                "Cannot upload while a {} is in progress",
                task
            )));
        }

        tokio::fs::write(&path, content).await.map_err(|e| {
            AppError::IoError(format!("Failed to store {}: {}", path.display(), e))
        })?;

        state.reset_for_upload(file_name.to_string(), documents);

        tracing::info!(
            file_name,
            documents = summary.documents,
            teams = summary.teams.len(),
            "Ingested scouting sheet"
        );

        Ok(summary)
    }
}
