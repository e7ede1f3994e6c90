//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};
use verity_domain::{FinalAnswer, Passage};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a final answer.
    pub fn format_answer(&self, answer: &FinalAnswer) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_answer_json(answer),
            OutputFormat::Table => Ok(self.format_answer_text(answer)),
            OutputFormat::Quiet => Ok(answer.text.clone()),
        }
    }

    fn format_answer_json(&self, answer: &FinalAnswer) -> Result<String> {
        let json = serde_json::json!({
            "answer": answer.text,
            "overall_confidence": answer.overall_confidence,
            "verified": answer.verified,
            "attempt_count": answer.attempt_count,
            "verification_summary": {
                "supported": answer.summary.supported,
                "contradicted": answer.summary.contradicted,
                "unverifiable": answer.summary.unverifiable,
                "dropped": answer.summary.dropped,
            },
            "citations": answer.citations.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }

    fn format_answer_text(&self, answer: &FinalAnswer) -> String {
        let mut out = String::new();
        out.push_str(&answer.text);
        out.push_str("\n\n");

        let confidence_line = format!(
            "Confidence: {:.0}%  ({} supported, {} contradicted, {} unverifiable, attempt {})",
            answer.overall_confidence * 100.0,
            answer.summary.supported,
            answer.summary.contradicted,
            answer.summary.unverifiable,
            answer.attempt_count,
        );
        if answer.verified {
            out.push_str(&self.colorize(&confidence_line, "green"));
        } else {
            out.push_str(&self.colorize(&confidence_line, "yellow"));
            out.push('\n');
            out.push_str(&self.colorize("⚠ This answer could not be fully verified.", "yellow"));
        }

        if !answer.citations.is_empty() {
            out.push_str("\n\nSources:\n");
            for citation in &answer.citations {
                out.push_str(&format!(
                    "  - {} ({})\n",
                    citation.source_document, citation.location
                ));
            }
        }

        out
    }

    /// Format passages from a direct search.
    pub fn format_passages(&self, passages: &[Passage]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let json: Vec<serde_json::Value> = passages
                    .iter()
                    .map(|p| {
                        serde_json::json!({
                            "source_document": p.source_document,
                            "location": p.location.to_string(),
                            "similarity_score": p.similarity_score,
                            "text": p.text,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Quiet => Ok(passages
                .iter()
                .map(|p| p.identity().to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if passages.is_empty() {
                    return Ok(self.colorize("No matching passages.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Score", "Document", "Location", "Text"]);
                for passage in passages {
                    builder.push_record([
                        &format!("{:.2}", passage.similarity_score),
                        &passage.source_document,
                        &passage.location.to_string(),
                        &truncate(&passage.text, 70),
                    ]);
                }
                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }
        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}
