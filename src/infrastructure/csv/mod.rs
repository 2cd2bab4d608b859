// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Scouting sheet ingestion

mod csv_loader;

pub use csv_loader::{competition_metadata, file_metadata, CsvLoader, COMPETITION_DATA_NAME};
