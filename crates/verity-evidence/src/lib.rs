//! Verity Evidence Store
//!
//! Reference implementation of the `EvidenceStore` contract: a SQLite-backed
//! passage corpus with deterministic lexical similarity search, plus an
//! in-memory store for tests.
//!
//! # Architecture
//!
//! - SQLite for documents and passages (department, section provenance)
//! - Deterministic token-overlap scoring: identical inputs always return
//!   identical rankings, which the pipeline's idempotence guarantee relies on
//! - A vector index would plug in behind the same `EvidenceStore` seam;
//!   its internals are outside this crate's scope
//!
//! # Examples
//!
//! ```no_run
//! use verity_evidence::SqlitePassageStore;
//! use verity_domain::traits::EvidenceStore;
//!
//! let mut store = SqlitePassageStore::new(":memory:").unwrap();
//! store.add_document("handbook", "support", "The SLA guarantees 99.9% uptime.").unwrap();
//! let hits = store.search("SLA uptime", 5, None).unwrap();
//! ```

#![warn(missing_docs)]

pub mod chunking;
pub mod corpus;

use rusqlite::{params, Connection};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use verity_domain::traits::EvidenceStore;
use verity_domain::{Passage, SourceLocation};

pub use chunking::PassageChunker;
pub use corpus::{CorpusLoader, IngestReport};

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error while reading corpus files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid data in the store or corpus
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Store marked unavailable (used by tests to simulate outages)
    #[error("Evidence store unavailable: {0}")]
    Unavailable(String),
}

/// SQLite-backed implementation of `EvidenceStore`.
///
/// Documents are grouped by department; each document is chunked into
/// passages at ingestion time. Search scores passages by token overlap with
/// the query.
pub struct SqlitePassageStore {
    conn: Connection,
}

impl SqlitePassageStore {
    /// Open (or create) a store at the given database path.
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.conn.execute_batch(include_str!("schema.sql"))?;
        Ok(store)
    }

    /// Add a document: normalize, chunk into passages, insert.
    ///
    /// Returns the number of passages created.
    pub fn add_document(
        &mut self,
        title: &str,
        department: &str,
        text: &str,
    ) -> Result<usize, StoreError> {
        let normalized = corpus::normalize_text(text);
        if normalized.is_empty() {
            return Err(StoreError::InvalidData(format!(
                "Document '{}' has no extractable text",
                title
            )));
        }

        let chunks = PassageChunker::default().chunk(&normalized);

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO documents (title, department, ingested_at) VALUES (?1, ?2, ?3)",
            params![title, department, now_secs()],
        )?;
        let document_id = tx.last_insert_rowid();

        for (index, chunk) in chunks.iter().enumerate() {
            tx.execute(
                "INSERT INTO passages (document_id, section, text) VALUES (?1, ?2, ?3)",
                params![document_id, (index + 1).to_string(), chunk],
            )?;
        }
        tx.commit()?;

        Ok(chunks.len())
    }

    /// Number of documents in the store.
    pub fn document_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Number of passages in the store.
    pub fn passage_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM passages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Departments present in the store, sorted.
    pub fn departments(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT department FROM documents ORDER BY department")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut departments = Vec::new();
        for row in rows {
            departments.push(row?);
        }
        Ok(departments)
    }
}

impl EvidenceStore for SqlitePassageStore {
    type Error = StoreError;

    fn search(
        &self,
        query: &str,
        k: usize,
        department: Option<&str>,
    ) -> Result<Vec<Passage>, Self::Error> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let sql = "SELECT p.id, p.section, p.text, d.title, d.department
                   FROM passages p JOIN documents d ON p.document_id = d.id
                   ORDER BY p.id";
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut scored: Vec<(f64, i64, Passage)> = Vec::new();
        for row in rows {
            let (id, section, text, title, dept) = row?;
            if let Some(filter) = department {
                if !dept.eq_ignore_ascii_case(filter) {
                    continue;
                }
            }
            let score = lexical_score(&query_tokens, &text);
            if score <= 0.0 {
                continue;
            }
            let location = match section {
                Some(s) => SourceLocation::section(s),
                None => SourceLocation::default(),
            };
            scored.push((score, id, Passage::new(text, title, location, score)));
        }

        // Highest score first; insertion order breaks ties deterministically
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, _, p)| p).collect())
    }
}

/// In-memory evidence store for tests.
///
/// Deterministic like the SQLite store, with a switch to simulate an outage
/// so `EvidenceUnavailable` handling can be exercised.
#[derive(Default)]
pub struct MemoryStore {
    entries: Vec<(Passage, Option<String>)>,
    unavailable: Mutex<bool>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a passage, optionally tagged with a department.
    pub fn add_passage(&mut self, passage: Passage, department: Option<&str>) {
        self.entries
            .push((passage, department.map(str::to_string)));
    }

    /// Make every subsequent search fail.
    pub fn set_unavailable(&self) {
        *self.unavailable.lock().unwrap() = true;
    }
}

impl EvidenceStore for MemoryStore {
    type Error = StoreError;

    fn search(
        &self,
        query: &str,
        k: usize,
        department: Option<&str>,
    ) -> Result<Vec<Passage>, Self::Error> {
        if *self.unavailable.lock().unwrap() {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }

        let query_tokens = tokenize(query);
        let mut scored: Vec<(f64, usize, Passage)> = Vec::new();
        for (index, (passage, dept)) in self.entries.iter().enumerate() {
            if let Some(filter) = department {
                if dept.as_deref().map(|d| d.eq_ignore_ascii_case(filter)) != Some(true) {
                    continue;
                }
            }
            let score = lexical_score(&query_tokens, &passage.text);
            if score <= 0.0 {
                continue;
            }
            let mut hit = passage.clone();
            hit.similarity_score = score;
            scored.push((score, index, hit));
        }

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, _, p)| p).collect())
    }
}

/// Lowercased alphanumeric tokens of a text.
fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Token-overlap similarity between a tokenized query and a passage text.
///
/// Normalized so the score lands in [0, 1] regardless of passage length.
fn lexical_score(query_tokens: &BTreeSet<String>, text: &str) -> f64 {
    let passage_tokens = tokenize(text);
    if query_tokens.is_empty() || passage_tokens.is_empty() {
        return 0.0;
    }
    let overlap = query_tokens.intersection(&passage_tokens).count();
    overlap as f64 / ((query_tokens.len() * passage_tokens.len()) as f64).sqrt()
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> SqlitePassageStore {
        let mut store = SqlitePassageStore::new(":memory:").unwrap();
        store
            .add_document(
                "handbook",
                "support",
                "The SLA guarantees 99.9% uptime for all paid plans.\n\n\
                 Refunds are processed within 30 days.",
            )
            .unwrap();
        store
            .add_document(
                "onboarding",
                "hr",
                "New employees receive a laptop on their first day.",
            )
            .unwrap();
        store
    }

    #[test]
    fn test_add_document_chunks() {
        let store = seeded_store();
        assert_eq!(store.document_count().unwrap(), 2);
        assert!(store.passage_count().unwrap() >= 2);
    }

    #[test]
    fn test_search_ranks_relevant_first() {
        let store = seeded_store();
        let hits = store.search("SLA uptime guarantees", 5, None).unwrap();
        assert!(!hits.is_empty());
        assert!(hits[0].text.contains("SLA"));
    }

    #[test]
    fn test_search_department_filter() {
        let store = seeded_store();
        let hits = store.search("laptop first day", 5, Some("support")).unwrap();
        assert!(hits.is_empty());
        let hits = store.search("laptop first day", 5, Some("hr")).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_search_no_matches_is_empty_not_error() {
        let store = seeded_store();
        let hits = store.search("quantum chromodynamics", 5, None).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_search_is_deterministic() {
        let store = seeded_store();
        let a = store.search("SLA refunds", 5, None).unwrap();
        let b = store.search("SLA refunds", 5, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_document_rejected() {
        let mut store = SqlitePassageStore::new(":memory:").unwrap();
        let result = store.add_document("empty", "support", "   \n\n  ");
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
    }

    #[test]
    fn test_departments_listing() {
        let store = seeded_store();
        assert_eq!(store.departments().unwrap(), vec!["hr", "support"]);
    }

    #[test]
    fn test_memory_store_unavailable() {
        let store = MemoryStore::new();
        store.set_unavailable();
        assert!(matches!(
            store.search("anything", 5, None),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn test_lexical_score_bounds() {
        let query = tokenize("alpha beta");
        assert_eq!(lexical_score(&query, ""), 0.0);
        let perfect = lexical_score(&query, "alpha beta");
        assert!(perfect > 0.99 && perfect <= 1.0);
        let partial = lexical_score(&query, "alpha gamma delta");
        assert!(partial > 0.0 && partial < perfect);
    }
}
