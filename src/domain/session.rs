// ============================================================
// SESSION STATE
// ============================================================
// Everything one user has uploaded, analyzed and saved. Each session owns
// its own copy; the registry hands out one per session id.

use super::document::Document;
use super::error::{AppError, Result};
use super::saved_analysis::SavedAnalysis;
use super::team::{compare_team_numbers, sorted_team_numbers};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Long-running engine call currently holding the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineTask {
    Analysis,
    Comparison,
    Picklist,
}

impl fmt::Display for EngineTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineTask::Analysis => write!(f, "analysis"),
            EngineTask::Comparison => write!(f, "comparison"),
            EngineTask::Picklist => write!(f, "picklist"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPhase {
    Idle,
    Analyzing,
    Displaying,
}

#[derive(Debug, Default)]
pub struct SessionState {
    file_name: Option<String>,
    documents: Vec<Document>,
    saved_analyses: BTreeMap<String, String>,
    current_response: String,
    current_team: String,
    wanted: String,
    unwanted: String,
    api_key: Option<String>,
    history_store: Option<PathBuf>,
    busy: Option<EngineTask>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a freshly uploaded file.
    ///
    /// File name, documents, saved analyses, current response, current team
    /// and the history handle are replaced in a single assignment. Picklist
    /// preferences and the session API key carry over.
    pub fn reset_for_upload(&mut self, file_name: String, documents: Vec<Document>) {
        *self = SessionState {
            file_name: Some(file_name),
            documents,
            wanted: std::mem::take(&mut self.wanted),
            unwanted: std::mem::take(&mut self.unwanted),
            api_key: self.api_key.take(),
            ..SessionState::default()
        };
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn require_file(&self) -> Result<&str> {
        self.file_name
            .as_deref()
            .ok_or_else(|| AppError::PreconditionError("Please upload a file first".to_string()))
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn require_documents(&self) -> Result<&[Document]> {
        self.require_file()?;
        if self.documents.is_empty() {
            return Err(AppError::PreconditionError(
                "No documents have been ingested for the uploaded file".to_string(),
            ));
        }
        Ok(&self.documents)
    }

    // ---- engine calls ----

    pub fn busy(&self) -> Option<EngineTask> {
        self.busy
    }

    /// Claim the session for an engine call; fails if one is already running.
    pub fn begin(&mut self, task: EngineTask) -> Result<()> {
        if let Some(running) = self.busy {
            return Err(AppError::PreconditionError(format!(
                "A {} is already in progress for this session",
                running
            )));
        }
        self.busy = Some(task);
        Ok(())
    }

    pub fn finish(&mut self, task: EngineTask) {
        if self.busy == Some(task) {
            self.busy = None;
        }
    }

    // ---- analysis tab ----

    pub fn current_response(&self) -> &str {
        &self.current_response
    }

    pub fn current_team(&self) -> &str {
        &self.current_team
    }

    pub fn set_current_response(&mut self, team: &str, response: String) {
        self.current_team = team.to_string();
        self.current_response = response;
    }

    /// Discard the displayed response. Refused while an analysis is running,
    /// since its result would land right after the clear.
    pub fn clear_current(&mut self) -> Result<()> {
        if self.busy == Some(EngineTask::Analysis) {
            return Err(AppError::PreconditionError(
                "Wait for the running analysis to finish before clearing".to_string(),
            ));
        }
        self.current_response.clear();
        self.current_team.clear();
        Ok(())
    }

    pub fn phase(&self) -> AnalysisPhase {
        if self.busy == Some(EngineTask::Analysis) {
            AnalysisPhase::Analyzing
        } else if !self.current_response.is_empty() && !self.current_team.is_empty() {
            AnalysisPhase::Displaying
        } else {
            AnalysisPhase::Idle
        }
    }

    /// Move the displayed response into the saved analyses.
    pub fn save_current(&mut self) -> Result<SavedAnalysis> {
        if self.phase() != AnalysisPhase::Displaying {
            return Err(AppError::PreconditionError(
                "There is no analysis to save".to_string(),
            ));
        }

        let saved = SavedAnalysis::new(
            std::mem::take(&mut self.current_team),
            std::mem::take(&mut self.current_response),
        );
        self.save_analysis(&saved.team_number, &saved.text);
        Ok(saved)
    }

    // ---- saved analyses ----

    /// Insert or overwrite; returns the text it replaced.
    pub fn save_analysis(&mut self, team: &str, text: &str) -> Option<String> {
        self.saved_analyses
            .insert(team.to_string(), text.to_string())
    }

    pub fn saved_analysis(&self, team: &str) -> Option<&str> {
        self.saved_analyses.get(team).map(String::as_str)
    }

    pub fn saved_count(&self) -> usize {
        self.saved_analyses.len()
    }

    pub fn saved_teams(&self) -> Vec<String> {
        sorted_team_numbers(self.saved_analyses.keys().cloned())
    }

    pub fn saved_analysis_list(&self) -> Vec<SavedAnalysis> {
        let mut list: Vec<SavedAnalysis> = self
            .saved_analyses
            .iter()
            .map(|(team, text)| SavedAnalysis::new(team.clone(), text.clone()))
            .collect();
        list.sort_by(|a, b| compare_team_numbers(&a.team_number, &b.team_number));
        list
    }

    pub fn require_saved_analyses(&self, minimum: usize) -> Result<Vec<SavedAnalysis>> {
        self.require_file()?;
        if self.saved_analyses.len() < minimum {
            let message = if minimum <= 1 {
                "Please save an analysis first".to_string()
            } else {
                format!("Please generate analyses of at least {} teams first", minimum)
            };
            return Err(AppError::PreconditionError(message));
        }
        Ok(self.saved_analysis_list())
    }

    pub fn merge_saved_analyses(&mut self, analyses: Vec<SavedAnalysis>) -> usize {
        let count = analyses.len();
        for analysis in analyses {
            self.saved_analyses
                .insert(analysis.team_number, analysis.text);
        }
        count
    }

    // ---- picklist preferences ----

    pub fn preferences(&self) -> (&str, &str) {
        (&self.wanted, &self.unwanted)
    }

    pub fn set_preferences(&mut self, wanted: String, unwanted: String) {
        self.wanted = wanted;
        self.unwanted = unwanted;
    }

    // ---- misc ----

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn set_api_key(&mut self, api_key: Option<String>) {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
    }

    pub fn history_store(&self) -> Option<&Path> {
        self.history_store.as_deref()
    }

    pub fn set_history_store(&mut self, path: PathBuf) {
        self.history_store = Some(path);
    }
}
