//! Document Writer
//!
//! Serializes a document to a sibling temporary file and renames it over
//! the destination, so a failed write never leaves a partial output.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use lopdf::Document;
use tempfile::NamedTempFile;
use tracing::debug;

use super::types::{Result, TaggingError};

/// Atomic PDF writer
pub struct DocumentWriter;

impl DocumentWriter {
    /// Write `doc` to `output`, returning the number of bytes written
    pub fn write(doc: &mut Document, output: &Path) -> Result<u64> {
        let fail = |reason: String| TaggingError::Serialization {
            path: output.to_path_buf(),
            reason,
        };

        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = NamedTempFile::new_in(dir).map_err(|e| fail(e.to_string()))?;

        {
            let mut writer = BufWriter::new(temp.as_file());
            doc.save_to(&mut writer).map_err(|e| fail(e.to_string()))?;
            writer.flush().map_err(|e| fail(e.to_string()))?;
        }
        temp.as_file().sync_all().map_err(|e| fail(e.to_string()))?;

        temp.persist(output).map_err(|e| fail(e.error.to_string()))?;
        let size = fs::metadata(output).map_err(|e| fail(e.to_string()))?.len();
        debug!(path = %output.display(), bytes = size, "document written");
        Ok(size)
    }
}

// ============================================================
// Tests
// ============================================================
