// ============================================================
// ANALYSIS STORE
// ============================================================
// Saved analyses on disk, one store per uploaded file name

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::document::Document;
use crate::domain::error::{AppError, Result};
use crate::domain::saved_analysis::SavedAnalysis;
use crate::infrastructure::storage::{history_dir, write_atomic};

pub const DOCSTORE_FILE: &str = "docstore.json";
const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoredDocuments {
    version: u32,
    file_name: String,
    saved_at: DateTime<Utc>,
    documents: Vec<Document>,
}

pub struct AnalysisStore {
    storage_root: PathBuf,
}

impl AnalysisStore {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
        }
    }

    pub fn store_dir(&self, file_name: &str) -> PathBuf {
        history_dir(&self.storage_root, file_name)
    }

    fn docstore_path(&self, file_name: &str) -> PathBuf {
        self.store_dir(file_name).join(DOCSTORE_FILE)
    }

    pub fn exists(&self, file_name: &str) -> bool {
        self.docstore_path(file_name).is_file()
    }

    /// Replace the store for `file_name` with `analyses`.
    pub fn save(&self, file_name: &str, analyses: &[SavedAnalysis]) -> Result<PathBuf> {
        let stored = StoredDocuments {
            version: STORE_VERSION,
            file_name: file_name.to_string(),
            saved_at: Utc::now(),
            documents: analyses.iter().map(SavedAnalysis::to_document).collect(),
        };

        let json = serde_json::to_vec_pretty(&stored)?;
        let path = self.docstore_path(file_name);
        write_atomic(&path, &json).map_err(|e| {
            AppError::PersistenceError(format!("Failed to write {}: {}", path.display(), e))
        })?;

        tracing::info!(
            file_name,
            analyses = analyses.len(),
            path = %path.display(),
            "Saved analyses to disk"
        );

        Ok(self.store_dir(file_name))
    }

    /// `Ok(None)` when nothing was ever saved for `file_name`.
    pub fn load(&self, file_name: &str) -> Result<Option<Vec<SavedAnalysis>>> {
        let path = self.docstore_path(file_name);
        if !path.is_file() {
            return Ok(None);
        }

        let raw = std::fs::read(&path).map_err(|e| {
            AppError::PersistenceError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let stored: StoredDocuments = serde_json::from_slice(&raw).map_err(|e| {
            AppError::PersistenceError(format!("Corrupt store {}: {}", path.display(), e))
        })?;

        if stored.version > STORE_VERSION {
            return Err(AppError::PersistenceError(format!(
                "Store {} has unsupported version {}",
                path.display(),
                stored.version
            )));
        }

        Ok(Some(Self::analyses_from(&path, &stored.documents)))
    }

    fn analyses_from(path: &Path, documents: &[Document]) -> Vec<SavedAnalysis> {
        documents
            .iter()
            .filter_map(|doc| {
                let analysis = SavedAnalysis::from_document(doc);
                if analysis.is_none() {
                    tracing::warn!(path = %path.display(), "Skipping stored document without team_no");
                }
                analysis
            })
            .collect()
    }
}
