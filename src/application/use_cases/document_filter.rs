use crate::domain::document::Document;
use crate::domain::team::sorted_team_numbers;

/// Context documents plus the rows of `team_number`.
///
/// Matching is exact string equality on the canonical form written at
/// ingestion; no trimming or numeric coercion happens here.
pub fn filter_documents(documents: &[Document], team_number: &str) -> Vec<Document> {
    documents
        .iter()
        .filter(|doc| match doc.team_number() {
            None => true,
            Some(team) => team == team_number,
        })
        .cloned()
        .collect()
}

/// Distinct team numbers present in the sheet, sorted for the team selector.
pub fn available_teams(documents: &[Document]) -> Vec<String> {
    sorted_team_numbers(documents.iter().filter_map(|doc| doc.team_number()))
}
