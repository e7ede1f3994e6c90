//! Prompt construction for the LLM-backed stages
//!
//! Each stage has one prompt builder. The instruction blocks double as
//! stage markers: deterministic test models key their responses on them.

use verity_domain::{EvidenceSet, Query};

/// Prompt for the query normalizer.
pub fn normalize_prompt(query: &Query) -> String {
    let mut prompt = String::from(NORMALIZE_INSTRUCTIONS);
    if let Some(department) = &query.department_filter {
        prompt.push_str(&format!("\nThe search is scoped to the {} department.\n", department));
    }
    prompt.push_str("\nQuestion: ");
    prompt.push_str(&query.raw_text);
    prompt.push('\n');
    prompt
}

/// Prompt for the reasoner. Retry attempts list the claims rejected by the
/// previous attempt so the model avoids or qualifies them.
pub fn draft_prompt(query: &Query, evidence: &EvidenceSet, flagged_claims: &[String]) -> String {
    let mut prompt = String::from(DRAFT_INSTRUCTIONS);
    prompt.push_str("\n\nQuestion: ");
    prompt.push_str(&query.raw_text);
    prompt.push_str("\n\nPassages:\n");
    for (i, passage) in evidence.passages().iter().enumerate() {
        prompt.push_str(&format!(
            "[{}] (from {}, {}) {}\n",
            i, passage.source_document, passage.location, passage.text
        ));
    }
    if evidence.is_empty() {
        prompt.push_str("(no passages were retrieved)\n");
    }
    if !flagged_claims.is_empty() {
        prompt.push_str("\nStatements rejected by verification in a previous attempt. ");
        prompt.push_str("Do not repeat them unless a passage above directly supports them:\n");
        for claim in flagged_claims {
            prompt.push_str(&format!("- {}\n", claim));
        }
    }
    prompt.push_str("\nAnswer:");
    prompt
}

/// Prompt for the claim extractor.
pub fn extract_prompt(draft_text: &str) -> String {
    let mut prompt = String::from(EXTRACT_INSTRUCTIONS);
    prompt.push_str("\n\nAnswer text:\n---\n");
    prompt.push_str(draft_text);
    prompt.push_str("\n---\n\n");
    prompt.push_str(EXTRACT_FORMAT_REMINDER);
    prompt
}

/// Prompt for the fact checker: one claim judged against every passage.
pub fn check_prompt(claim_text: &str, evidence: &EvidenceSet) -> String {
    let mut prompt = String::from(CHECK_INSTRUCTIONS);
    prompt.push_str("\n\nClaim: ");
    prompt.push_str(claim_text);
    prompt.push_str("\n\nPassages:\n");
    for (i, passage) in evidence.passages().iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n", i, passage.text));
    }
    prompt.push_str("\n");
    prompt.push_str(CHECK_FORMAT_REMINDER);
    prompt
}

const NORMALIZE_INSTRUCTIONS: &str = "Rewrite the question as a focused retrieval query. \
Expand abbreviations, resolve ambiguity, and keep every distinctive term. \
Reply with the rewritten query only, no explanation. \
If the question is already a good query, reply with it unchanged.";

const DRAFT_INSTRUCTIONS: &str = "Answer the question using only the numbered passages below. \
Every factual statement in your answer must come from a passage; do not add outside knowledge. \
If the passages do not contain the answer, say that the information was not found.";

const EXTRACT_INSTRUCTIONS: &str = "Decompose the answer into atomic factual claims. \
Each claim must state exactly one independently checkable fact and be fully \
self-contained: resolve pronouns and references so the claim is understandable \
on its own. Skip hedges, opinions, and statements that nothing could verify. \
An answer that only says the information was not found yields no claims.";

const EXTRACT_FORMAT_REMINDER: &str = r#"Output format (JSON array of strings only, no additional text):
["first claim", "second claim"]

Return ONLY valid JSON, no markdown code blocks, no explanations. Return [] if there are no factual claims."#;

const CHECK_INSTRUCTIONS: &str = "Judge the claim against each numbered passage independently. \
For each passage, decide whether it supports the claim, contradicts it, or is silent \
(does not address it). Also report your overall calibrated confidence in these judgments, \
between 0.0 and 1.0.";

const CHECK_FORMAT_REMINDER: &str = r#"Output format (JSON object only, no additional text):
{"confidence": 0.0, "judgments": [{"passage": 0, "relation": "supports"}, {"passage": 1, "relation": "silent"}]}

Valid relations: "supports", "contradicts", "silent". Judge every passage. Return ONLY valid JSON."#;
