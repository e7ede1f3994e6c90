//! The ask command: run one question through the verification pipeline.

use crate::cli::AskArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use std::sync::Arc;
use verity_evidence::SqlitePassageStore;
use verity_llm::{OllamaModel, PromptReranker};
use verity_pipeline::{progress_channel, CancelToken, Pipeline};

/// Execute the ask command.
pub async fn execute_ask(args: AskArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    run_question(
        &args.question,
        args.department.as_deref(),
        args.progress,
        config,
        formatter,
    )
    .await
}

/// Run one question; shared by `ask` and the REPL.
pub async fn run_question(
    question: &str,
    department: Option<&str>,
    show_progress: bool,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let store = SqlitePassageStore::new(&config.store.db_path)?;
    let model = OllamaModel::new(&config.model.endpoint, &config.model.model);
    let reranker = PromptReranker::new(Arc::new(OllamaModel::new(
        &config.model.endpoint,
        &config.model.model,
    )));

    let pipeline = Pipeline::new(store, reranker, model, config.pipeline.clone())?;

    let progress = if show_progress {
        let (tx, mut rx) = progress_channel();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                eprintln!("  → {}", event.state);
            }
        });
        Some(tx)
    } else {
        None
    };

    let answer = pipeline
        .submit_with_progress(question, department, progress, CancelToken::new())
        .await?;

    println!("{}", formatter.format_answer(&answer)?);
    Ok(())
}
