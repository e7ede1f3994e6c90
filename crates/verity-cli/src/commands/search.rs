//! The search command: query the evidence store directly.

use crate::cli::SearchArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use verity_domain::traits::EvidenceStore;
use verity_evidence::SqlitePassageStore;

/// Execute the search command.
pub fn execute_search(args: SearchArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let store = SqlitePassageStore::new(&config.store.db_path)?;
    let passages = store.search(&args.query, args.limit, args.department.as_deref())?;
    println!("{}", formatter.format_passages(&passages)?);
    Ok(())
}
