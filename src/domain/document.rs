// ============================================================
// DOCUMENTS
// ============================================================
// Text units handed to the chat engine as context

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const META_FILENAME: &str = "filename";
pub const META_EXTENSION: &str = "extension";
pub const META_NAME: &str = "name";
/// Team number of a scouting row.
pub const META_TEAM_NUMBER: &str = "team_number";
/// Team number of a saved analysis.
pub const META_TEAM_NO: &str = "team_no";

pub type Metadata = BTreeMap<String, String>;

/// One parsed line of the scouting sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub text: String,
    /// `None` only for the header record.
    pub team_number: Option<String>,
}

impl Record {
    pub fn header(text: String) -> Self {
        Self {
            text,
            team_number: None,
        }
    }

    pub fn row(text: String, team_number: String) -> Self {
        Self {
            text,
            team_number: Some(team_number),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    /// Attach file-level metadata to a record; rows also get `team_number`.
    pub fn from_record(record: Record, file_metadata: &Metadata) -> Self {
        let mut metadata = file_metadata.clone();
        if let Some(team_number) = record.team_number {
            metadata.insert(META_TEAM_NUMBER.to_string(), team_number);
        }
        Self::new(record.text, metadata)
    }

    pub fn team_number(&self) -> Option<&str> {
        self.metadata.get(META_TEAM_NUMBER).map(String::as_str)
    }

    /// Header and other context records carry no team number.
    pub fn is_context(&self) -> bool {
        !self.metadata.contains_key(META_TEAM_NUMBER)
    }

    /// Metadata lines followed by the text, the way the engine sees it.
    pub fn render(&self) -> String {
        if self.metadata.is_empty() {
            return self.text.clone();
        }

        let header = self
            .metadata
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect::<Vec<_>>()
            .join("\n");

        format!("{}\n\n{}", header, self.text)
    }
}
