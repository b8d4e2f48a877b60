//! Upload validation and staging into the id-scoped namespace.
//!
//! Validation runs before any extraction: wrong report type, empty
//! payloads and oversized uploads are rejected at the boundary with no
//! state change.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::MAX_UPLOAD_BYTES;

use super::types::Report;
use super::ReportError;

/// Accepted source report types. Echo reports arrive as RTF exports.
const ACCEPTED_EXTENSIONS: &[&str] = &["rtf"];

/// Name of the staged source artifact within a report's namespace.
pub const SOURCE_ARTIFACT: &str = "source.rtf";

/// Sanitize a filename — strip path components, limit length
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "document".to_string()
    } else {
        clean
    }
}

/// Reject anything that is not an accepted report upload.
pub fn validate_upload(filename: &str, size: u64) -> Result<(), ReportError> {
    if filename.trim().is_empty() {
        return Err(ReportError::Validation("filename is required".into()));
    }
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension {
        Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => {
            return Err(ReportError::Validation(format!(
                "unsupported report type; accepted: {}",
                ACCEPTED_EXTENSIONS.join(", ")
            )));
        }
    }
    if size == 0 {
        return Err(ReportError::Validation("uploaded file is empty".into()));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(ReportError::Validation(format!(
            "file too large; maximum {}MB",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Stage an accepted upload under `<root>/<report id>/` and build its
/// Report record.
pub fn stage_report(root: &Path, filename: &str, bytes: &[u8]) -> Result<Report, ReportError> {
    validate_upload(filename, bytes.len() as u64)?;

    let id = Uuid::new_v4();
    let namespace = root.join(id.to_string());
    std::fs::create_dir_all(&namespace)?;

    let source_path = namespace.join(SOURCE_ARTIFACT);
    std::fs::write(&source_path, bytes)?;

    let safe_name = sanitize_filename(filename);
    tracing::info!(report_id = %id, filename = %safe_name, size = bytes.len(), "report staged");

    Ok(Report::new(id, safe_name, source_path))
}

/// The namespace directory for a report id.
pub fn namespace_dir(root: &Path, id: &Uuid) -> PathBuf {
    root.join(id.to_string())
}
