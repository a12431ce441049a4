use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("users_export_{}.xlsx", at.timestamp_millis())
}

/// Writes an exported spreadsheet into `dir` and returns the file path.
pub async fn save_export(dir: &Path, bytes: &[u8], at: DateTime<Utc>) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(export_file_name(at));
    tokio::fs::write(&path, bytes).await?;
    tracing::info!(path = %path.display(), size = bytes.len(), "Saved export");
    Ok(path)
}
