use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::error::{AppError, Result};

/// Uploaded names become a path component and a store namespace.
static FILE_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 _.()\-]*$").unwrap());

pub fn validate_file_name(file_name: &str) -> Result<()> {
    if file_name.len() > 255 || !FILE_NAME_PATTERN.is_match(file_name) || file_name.contains("..")
    {
        return Err(AppError::InputError(format!(
            "Invalid file name: {:?}",
            file_name
        )));
    }
    Ok(())
}

/// Where an uploaded sheet is written before ingestion.
pub fn upload_path(data_dir: &Path, file_name: &str) -> Result<PathBuf> {
    validate_file_name(file_name)?;
    ensure_dir(data_dir)?;
    Ok(data_dir.join(file_name))
}

/// `storage_<file name>` under the storage root.
pub fn history_dir(storage_root: &Path, file_name: &str) -> PathBuf {
    storage_root.join(format!("storage_{}", file_name))
}

/// Write through a sibling temp file so readers never see a partial file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)
}

pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
