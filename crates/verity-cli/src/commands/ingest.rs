//! The ingest command: load a corpus directory into the evidence store.

use crate::cli::IngestArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use verity_evidence::{CorpusLoader, SqlitePassageStore};

/// Execute the ingest command.
pub fn execute_ingest(args: IngestArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    if let Some(parent) = config.store.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut store = SqlitePassageStore::new(&config.store.db_path)?;

    println!("{}", formatter.info(&format!("Ingesting {}", args.path.display())));
    let report = CorpusLoader::new().ingest(&mut store, &args.path)?;

    println!(
        "{}",
        formatter.success(&format!(
            "Ingested {} document(s) into {} passage(s), skipped {}",
            report.documents, report.passages, report.skipped
        ))
    );
    println!(
        "{}",
        formatter.info(&format!(
            "Store now holds {} document(s), {} passage(s)",
            store.document_count()?,
            store.passage_count()?
        ))
    );
    Ok(())
}
