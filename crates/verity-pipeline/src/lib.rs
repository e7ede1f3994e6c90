//! Verity Pipeline
//!
//! The self-correcting question-answering pipeline: retrieve candidate
//! passages, rerank them, draft an answer, decompose it into atomic claims,
//! verify each claim against the evidence, and emit a final answer with a
//! confidence score and citations.
//!
//! # Architecture
//!
//! ```text
//! Question → Normalizer → Retriever → Reranker → Reasoner → Extractor
//!                 → Checker → Composer → FinalAnswer
//!                      ↑__________________|   (bounded retry on rejection)
//! ```
//!
//! The orchestrator drives the state machine; the seven stages each invoke
//! exactly one external collaborator through the trait seams defined in
//! `verity-domain`. Per-claim fact checks fan out concurrently.
//!
//! # Example
//!
//! ```no_run
//! use verity_pipeline::{Pipeline, PipelineConfig};
//! use verity_evidence::MemoryStore;
//! use verity_llm::{MockModel, MockReranker};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let pipeline = Pipeline::new(
//!     store,
//!     MockReranker::new(),
//!     MockModel::new("stub"),
//!     PipelineConfig::default(),
//! )?;
//!
//! let answer = pipeline.submit("What SLA does the company offer?", None).await?;
//! println!("{} (confidence {:.2})", answer.text, answer.overall_confidence);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod orchestrator;
mod parser;
mod progress;
mod prompts;
mod stages;
mod state;

pub use config::{AggregationKind, PipelineConfig};
pub use error::PipelineError;
pub use orchestrator::{CancelToken, Pipeline};
pub use progress::{progress_channel, ProgressEvent, ProgressReceiver, ProgressSender};
pub use stages::composer::{Disposition, RejectionReason};
pub use state::{PipelineState, RunContext};
