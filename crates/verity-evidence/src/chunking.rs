//! Passage chunking for document ingestion
//!
//! Documents are split into retrieval-sized passages: markdown headings
//! start a new passage, and consecutive paragraphs are combined until the
//! size limit is reached. Retrieval quality depends on passages being
//! self-contained, so splits happen at paragraph boundaries whenever
//! possible.

/// Default maximum passage length in characters.
pub const DEFAULT_MAX_PASSAGE_LEN: usize = 1200;

/// Splits normalized document text into passages.
#[derive(Debug, Clone, Copy)]
pub struct PassageChunker {
    max_len: usize,
}

impl Default for PassageChunker {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_PASSAGE_LEN,
        }
    }
}

impl PassageChunker {
    /// Create a chunker with a custom passage length limit.
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len: max_len.max(1),
        }
    }

    /// Chunk text into passages.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.len() <= self.max_len {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        let mut current = String::new();

        for block in text.split("\n\n") {
            let block = block.trim();
            if block.is_empty() {
                continue;
            }

            let starts_section = block.starts_with('#');
            let would_overflow = !current.is_empty()
                && current.len() + block.len() + 2 > self.max_len;

            if starts_section || would_overflow {
                if !current.is_empty() {
                    chunks.push(current.trim().to_string());
                    current.clear();
                }
            }

            if block.len() > self.max_len {
                // A single oversized paragraph gets hard-split
                chunks.extend(split_oversized(block, self.max_len));
            } else {
                current.push_str(block);
                current.push_str("\n\n");
            }
        }

        if !current.trim().is_empty() {
            chunks.push(current.trim().to_string());
        }

        if chunks.is_empty() {
            chunks.push(text.trim().to_string());
        }

        chunks
    }
}

/// Split an oversized paragraph at sentence boundaries where possible,
/// falling back to a hard character split.
fn split_oversized(block: &str, max_len: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(block) {
        if !current.is_empty() && current.len() + sentence.len() + 1 > max_len {
            pieces.push(current.trim().to_string());
            current.clear();
        }
        if sentence.len() > max_len {
            pieces.extend(hard_split(&sentence, max_len));
        } else {
            current.push_str(&sentence);
            current.push(' ');
        }
    }

    if !current.trim().is_empty() {
        pieces.push(current.trim().to_string());
    }
    pieces
}

/// Split text into sentences, keeping the terminator with the sentence.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            sentences.push(current.trim().to_string());
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }
    sentences
}

/// Hard split at the character limit, respecting UTF-8 boundaries.
fn hard_split(text: &str, max_len: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if current.len() + c.len_utf8() > max_len && !current.is_empty() {
            pieces.push(current.clone());
            current.clear();
        }
        current.push(c);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_text_single_chunk() {
        let chunker = PassageChunker::new(100);
        let chunks = chunker.chunk("Short text.");
        assert_eq!(chunks, vec!["Short text."]);
    }

    #[test]
    fn test_combines_paragraphs_until_limit() {
        let chunker = PassageChunker::new(50);
        let text = "First paragraph here.\n\nSecond paragraph here.\n\nThird paragraph here.";
        let chunks = chunker.chunk(text);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.len() <= 60);
        }
    }

    #[test]
    fn test_heading_starts_new_chunk() {
        let chunker = PassageChunker::new(200);
        let text = format!(
            "{}\n\n# Refund Policy\n\nRefunds within 30 days.",
            "Intro paragraph. ".repeat(15)
        );
        let chunks = chunker.chunk(&text);
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().any(|c| c.starts_with("# Refund Policy")));
    }

    #[test]
    fn test_oversized_paragraph_split_at_sentences() {
        let chunker = PassageChunker::new(40);
        let text = "One sentence here. Another sentence here. A third sentence here.";
        let chunks = chunker.chunk(text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 40, "chunk too long: {:?}", chunk);
        }
    }

    #[test]
    fn test_hard_split_respects_utf8() {
        let chunker = PassageChunker::new(10);
        let text = "éééééééééééééééééééé";
        let chunks = chunker.chunk(text);
        // Must not panic, and every chunk must be valid (implied) and bounded
        for chunk in &chunks {
            assert!(chunk.len() <= 10);
        }
    }

    #[test]
    fn test_empty_text() {
        let chunker = PassageChunker::new(100);
        assert_eq!(chunker.chunk(""), vec![""]);
    }
}
