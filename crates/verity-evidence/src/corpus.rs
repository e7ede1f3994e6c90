//! Corpus ingestion
//!
//! Walks a corpus directory whose immediate subdirectories are departments
//! and loads every `.txt`/`.md` file into the passage store. Unsupported
//! file types and unreadable files are skipped and counted, never fatal.

use crate::{SqlitePassageStore, StoreError};
use std::path::Path;
use tracing::{info, warn};

/// Result of one corpus ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    /// Documents successfully ingested
    pub documents: usize,

    /// Passages created across all documents
    pub passages: usize,

    /// Files skipped (unsupported type, unreadable, or empty)
    pub skipped: usize,
}

/// Loads a department-organized corpus directory into a store.
#[derive(Debug, Default)]
pub struct CorpusLoader;

impl CorpusLoader {
    /// Create a loader.
    pub fn new() -> Self {
        Self
    }

    /// Ingest every supported file under `root` into the store.
    ///
    /// Layout: `root/<Department>/<file>.{txt,md}`. Files directly under
    /// `root` have no department and are skipped.
    pub fn ingest(
        &self,
        store: &mut SqlitePassageStore,
        root: &Path,
    ) -> Result<IngestReport, StoreError> {
        if !root.is_dir() {
            return Err(StoreError::InvalidData(format!(
                "Corpus root is not a directory: {}",
                root.display()
            )));
        }

        let mut report = IngestReport::default();

        let mut departments: Vec<_> = std::fs::read_dir(root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        departments.sort();

        for department_dir in departments {
            let department = department_dir
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();

            let mut files: Vec<_> = std::fs::read_dir(&department_dir)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect();
            files.sort();

            for file in files {
                match self.ingest_file(store, &file, &department) {
                    Ok(Some(passages)) => {
                        report.documents += 1;
                        report.passages += passages;
                    }
                    Ok(None) => report.skipped += 1,
                    Err(e) => {
                        warn!("Failed to ingest {}: {}", file.display(), e);
                        report.skipped += 1;
                    }
                }
            }
        }

        info!(
            "Ingested {} documents ({} passages), skipped {}",
            report.documents, report.passages, report.skipped
        );

        Ok(report)
    }

    /// Ingest one file. Returns `Ok(None)` for unsupported types.
    fn ingest_file(
        &self,
        store: &mut SqlitePassageStore,
        path: &Path,
        department: &str,
    ) -> Result<Option<usize>, StoreError> {
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_lowercase().as_str(), "txt" | "md"))
            .unwrap_or(false);
        if !supported {
            return Ok(None);
        }

        let title = path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("untitled")
            .to_string();

        let text = std::fs::read_to_string(path)?;
        let passages = store.add_document(&title, department, &text)?;
        Ok(Some(passages))
    }
}

/// Clean up whitespace: unify newlines, collapse repeated blank lines and
/// runs of spaces.
pub fn normalize_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;
    for line in unified.lines() {
        let line = collapse_spaces(line.trim_end());
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(&line);
        out.push('\n');
    }
    out.trim().to_string()
}

fn collapse_spaces(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_space = false;
    for c in line.chars() {
        if c == ' ' || c == '\t' {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            in_space = false;
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_unifies_newlines() {
        assert_eq!(normalize_text("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_normalize_collapses_blank_lines() {
        assert_eq!(normalize_text("a\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_normalize_collapses_spaces() {
        assert_eq!(normalize_text("a    b\t\tc"), "a b c");
    }

    #[test]
    fn test_normalize_trims() {
        assert_eq!(normalize_text("\n\n  hello  \n\n"), "hello");
    }
}
