use super::document::{Document, Metadata, META_TEAM_NO};
use serde::{Deserialize, Serialize};

/// A user-approved summary for one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAnalysis {
    pub team_number: String,
    pub text: String,
}

impl SavedAnalysis {
    pub fn new(team_number: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            team_number: team_number.into(),
            text: text.into(),
        }
    }

    pub fn to_document(&self) -> Document {
        let mut metadata = Metadata::new();
        metadata.insert(META_TEAM_NO.to_string(), self.team_number.clone());
        Document::new(self.text.clone(), metadata)
    }

    /// `None` when the document was not written as a saved analysis.
    pub fn from_document(document: &Document) -> Option<Self> {
        document
            .metadata
            .get(META_TEAM_NO)
            .map(|team| Self::new(team.clone(), document.text.clone()))
    }
}
