// ============================================================
// CSV LOADER
// ============================================================
// Turn a scouting sheet into one header document plus one document per row

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::domain::document::{
    Document, Metadata, Record, META_EXTENSION, META_FILENAME, META_NAME,
};
use crate::domain::error::{AppError, Result};
use crate::domain::team::normalize_team_number;

/// Metadata `name` given to every scouting document.
pub const COMPETITION_DATA_NAME: &str = "FRC Competition Robot Observation Data";

/// Column holding the team number (0-based).
pub const TEAM_NUMBER_COLUMN: usize = 1;

pub struct CsvLoader {
    /// Delimiter character (default: comma)
    delimiter: u8,
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Load a file into documents.
    ///
    /// `extra_metadata` is merged over the `filename`/`extension` pair and
    /// applies to every document, header included.
    pub fn load(&self, path: &Path, extra_metadata: Option<Metadata>) -> Result<Vec<Document>> {
        let bytes = std::fs::read(path).map_err(|e| {
            AppError::InputError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.load_bytes(path, &bytes, extra_metadata)
    }

    /// Same as [`CsvLoader::load`] for content already in memory; `path`
    /// only names the documents.
    pub fn load_bytes(
        &self,
        path: &Path,
        bytes: &[u8],
        extra_metadata: Option<Metadata>,
    ) -> Result<Vec<Document>> {
        let records = self.parse_records(&decode(bytes))?;

        let mut metadata = file_metadata(path);
        if let Some(extra) = extra_metadata {
            metadata.extend(extra);
        }

        Ok(records
            .into_iter()
            .map(|record| Document::from_record(record, &metadata))
            .collect())
    }

    /// Parse CSV text into records, header first.
    pub fn parse_records(&self, content: &str) -> Result<Vec<Record>> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .trim(Trim::None)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut rows = reader.records();

        let headings = match rows.next() {
            Some(result) => result?,
            None => {
                return Err(AppError::InputError(
                    "The CSV file is empty (no header row)".to_string(),
                ))
            }
        };

        let mut records = vec![Record::header(headings.iter().collect::<Vec<_>>().join(","))];

        for result in rows {
            let row = result?;
            records.push(Self::parse_row(&row)?);
        }

        tracing::debug!(rows = records.len() - 1, "Parsed scouting CSV");

        Ok(records)
    }

    fn parse_row(row: &StringRecord) -> Result<Record> {
        let line = row.position().map(|p| p.line()).unwrap_or_default();

        let raw_team = row.get(TEAM_NUMBER_COLUMN).ok_or_else(|| {
            AppError::InputError(format!(
                "Row on line {} has no team number column ({} field(s))",
                line,
                row.len()
            ))
        })?;

        let team_number = normalize_team_number(raw_team);
        if team_number.is_empty() {
            return Err(AppError::InputError(format!(
                "Row on line {} has a blank team number",
                line
            )));
        }

        Ok(Record::row(
            row.iter().collect::<Vec<_>>().join(", "),
            team_number,
        ))
    }
}

/// Base metadata shared by every document of an uploaded file.
pub fn file_metadata(path: &Path) -> Metadata {
    let mut metadata = Metadata::new();
    if let Some(name) = path.file_name() {
        metadata.insert(META_FILENAME.to_string(), name.to_string_lossy().into_owned());
    }
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    metadata.insert(META_EXTENSION.to_string(), extension);
    metadata
}

pub fn competition_metadata() -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(META_NAME.to_string(), COMPETITION_DATA_NAME.to_string());
    metadata
}

/// UTF-8 with the BOM stripped; invalid sequences are replaced.
fn decode(bytes: &[u8]) -> String {
    let (content, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(bytes);
    if had_errors {
        tracing::warn!("CSV contained invalid UTF-8; replaced undecodable bytes");
    }
    content.into_owned()
}
