//! Retrieval stage
//!
//! One evidence store call per run. No evidence means no verifiable answer
//! is possible, so store failure (or timeout) is run-fatal and surfaced as
//! its own error kind, never silently degraded.

use crate::error::PipelineError;
use crate::stages::blocking_call;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;
use verity_domain::traits::EvidenceStore;
use verity_domain::{Passage, PassageId, Query};

/// Retrieve the top-K candidate passages for the normalized query.
///
/// Candidates are deduplicated by identity key (retrieval order preserved,
/// first occurrence wins) and truncated to `k`. An empty result is valid:
/// it means the corpus has no matches.
pub(crate) async fn retrieve<E>(
    store: Arc<Mutex<E>>,
    query: &Query,
    k: usize,
    deadline: Duration,
) -> Result<Vec<Passage>, PipelineError>
where
    E: EvidenceStore + Send + 'static,
    E::Error: std::fmt::Display,
{
    let search_text = query.normalized_text.clone();
    let department = query.department_filter.clone();

    let candidates = blocking_call(deadline, move || {
        let store = store
            .lock()
            .map_err(|e| format!("store lock poisoned: {}", e))?;
        store
            .search(&search_text, k, department.as_deref())
            .map_err(|e| e.to_string())
    })
    .await
    .map_err(|detail| PipelineError::EvidenceUnavailable { detail })?;

    let mut seen: HashSet<PassageId> = HashSet::new();
    let mut passages: Vec<Passage> = candidates
        .into_iter()
        .filter(|p| seen.insert(p.identity()))
        .collect();
    passages.truncate(k);

    debug!("Retrieved {} candidate passages", passages.len());
    Ok(passages)
}
