//! Parse LLM output for the extraction and checking stages
//!
//! Models are instructed to return bare JSON but routinely wrap it in
//! markdown fences, prepend prose, or leave trailing commas. Parsing is
//! tolerant at the envelope level and strict per item: a response that is
//! not JSON at all is an error, while an individual malformed entry is
//! dropped with a warning.

use serde_json::Value;
use tracing::warn;

/// How one passage relates to a claim, per the checker model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassageRelation {
    /// The passage supports the claim
    Supports,
    /// The passage contradicts the claim
    Contradicts,
    /// The passage does not address the claim
    Silent,
}

impl PassageRelation {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "supports" | "support" => Some(PassageRelation::Supports),
            "contradicts" | "contradict" => Some(PassageRelation::Contradicts),
            "silent" | "unrelated" => Some(PassageRelation::Silent),
            _ => None,
        }
    }
}

/// Parsed fact-check response for one claim.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimCheck {
    /// The model's calibrated confidence in its judgments
    pub confidence: f64,

    /// Per-passage relations, as `(passage index, relation)`
    pub judgments: Vec<(usize, PassageRelation)>,
}

/// Extract the JSON payload from a model response.
///
/// Strips markdown code fences, then falls back to slicing from the first
/// opening bracket to the last closing one when the model added prose
/// around the JSON.
pub fn extract_json(response: &str) -> Result<String, String> {
    let stripped = verity_llm::ollama::strip_code_fences(response);
    let trimmed = stripped.trim();

    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return Ok(trimmed.to_string());
    }

    let open = trimmed.find(['[', '{']);
    let close = trimmed.rfind([']', '}']);
    match (open, close) {
        (Some(start), Some(end)) if end > start => Ok(trimmed[start..=end].to_string()),
        _ => Err(format!("No JSON found in response: {:?}", truncate(trimmed, 80))),
    }
}

/// Parse as JSON, retrying once with trailing commas removed.
fn parse_value(json: &str) -> Result<Value, String> {
    serde_json::from_str(json).or_else(|first_err| {
        serde_json::from_str(&remove_trailing_commas(json))
            .map_err(|_| format!("JSON parse error: {}", first_err))
    })
}

/// Remove commas that directly precede a closing bracket.
fn remove_trailing_commas(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut pending_comma = false;
    for c in json.chars() {
        match c {
            ',' => {
                if pending_comma {
                    out.push(',');
                }
                pending_comma = true;
            }
            ']' | '}' => {
                pending_comma = false;
                out.push(c);
            }
            _ => {
                if pending_comma && !c.is_whitespace() {
                    out.push(',');
                    pending_comma = false;
                }
                out.push(c);
            }
        }
    }
    out
}

/// Parse the extractor's response into claim texts.
///
/// Returns the claims in order plus the number of malformed entries that
/// were dropped. String entries and objects with a `"claim"` or `"text"`
/// field are accepted; anything else is dropped.
pub fn parse_claim_texts(response: &str) -> Result<(Vec<String>, usize), String> {
    let json = extract_json(response)?;
    let value = parse_value(&json)?;

    let items = value
        .as_array()
        .ok_or_else(|| "Expected a JSON array of claims".to_string())?;

    let mut claims = Vec::new();
    let mut dropped = 0usize;
    for (idx, item) in items.iter().enumerate() {
        let text = match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj
                .get("claim")
                .or_else(|| obj.get("text"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            _ => None,
        };
        match text {
            Some(t) if !t.trim().is_empty() => claims.push(t.trim().to_string()),
            _ => {
                warn!("Dropping malformed claim entry {}", idx);
                dropped += 1;
            }
        }
    }

    Ok((claims, dropped))
}

/// Parse the checker's response for one claim.
///
/// Judgments referencing passages outside `[0, passage_count)` or carrying
/// an unknown relation are dropped with a warning.
pub fn parse_claim_check(response: &str, passage_count: usize) -> Result<ClaimCheck, String> {
    let json = extract_json(response)?;
    let value = parse_value(&json)?;

    let obj = value
        .as_object()
        .ok_or_else(|| "Expected a JSON object".to_string())?;

    let confidence = obj
        .get("confidence")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| "Missing or invalid 'confidence'".to_string())?;

    let entries = obj
        .get("judgments")
        .and_then(|v| v.as_array())
        .ok_or_else(|| "Missing or invalid 'judgments'".to_string())?;

    let mut judgments = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        let parsed = entry.as_object().and_then(|e| {
            let passage = e.get("passage").and_then(|v| v.as_u64())? as usize;
            let relation = e
                .get("relation")
                .and_then(|v| v.as_str())
                .and_then(PassageRelation::parse)?;
            Some((passage, relation))
        });
        match parsed {
            Some((passage, relation)) if passage < passage_count => {
                judgments.push((passage, relation));
            }
            Some((passage, _)) => {
                warn!("Dropping judgment {} for unknown passage index {}", idx, passage);
            }
            None => {
                warn!("Dropping malformed judgment entry {}", idx);
            }
        }
    }

    Ok(ClaimCheck {
        confidence: confidence.clamp(0.0, 1.0),
        judgments,
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
