//! Text extraction from PDF statements, enabled with the `pdf` feature.

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{Result, StatementError};

/// Extracts the text layer of a PDF statement held in memory.
///
/// Scanned documents carry no text layer and come back empty; that is
/// reported as unreadable rather than handed on as an empty statement, so
/// the caller can tell an OCR problem from a statement that matched nothing.
pub fn statement_text_from_bytes(bytes: &[u8]) -> Result<String> {
    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
        StatementError::DocumentUnreadable(format!("failed to extract text from PDF: {}", e))
    })?;
    debug!("Extracted {} characters of text from PDF", text.len());

    if text.trim().is_empty() {
        return Err(StatementError::DocumentUnreadable(
            "PDF contains no extractable text".to_string(),
        ));
    }
    Ok(text)
}

/// Reads a PDF from disk and extracts its text layer.
pub fn statement_text_from_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let bytes = fs::read(&path).map_err(|e| {
        StatementError::DocumentUnreadable(format!(
            "failed to read {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    statement_text_from_bytes(&bytes)
}
