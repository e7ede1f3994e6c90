//! Interactive REPL (Read-Eval-Print Loop) mode.
//!
//! Plain lines are questions. Meta-commands start with `:`:
//! `:department <name>` scopes retrieval, `:department` clears the scope,
//! `:help` and `:exit` do what they say.

use crate::commands;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

/// Run the interactive REPL.
pub async fn run_repl(config: &Config, formatter: &Formatter) -> Result<()> {
    println!(
        "{}",
        formatter.info("Verity REPL - ask a question, ':help' for commands, ':exit' to quit")
    );
    println!();

    let mut editor = DefaultEditor::new().map_err(|e| {
        CliError::Io(std::io::Error::other(format!("Failed to initialize editor: {}", e)))
    })?;

    let history_path = history_path()?;
    let _ = editor.load_history(&history_path);

    let mut department: Option<String> = None;

    loop {
        let prompt = match &department {
            Some(d) => format!("verity ({})> ", d),
            None => "verity> ".to_string(),
        };

        match editor.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line).ok();

                if let Some(meta) = line.strip_prefix(':') {
                    match handle_meta(meta, &mut department, formatter) {
                        MetaOutcome::Continue => continue,
                        MetaOutcome::Exit => break,
                    }
                }

                if let Err(e) =
                    commands::run_question(line, department.as_deref(), true, config, formatter)
                        .await
                {
                    eprintln!("{}", formatter.error(&e.to_string()));
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", formatter.info("Use ':exit' to quit"));
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", formatter.error(&format!("Error: {}", err)));
                break;
            }
        }
    }

    editor.save_history(&history_path).ok();
    Ok(())
}

enum MetaOutcome {
    Continue,
    Exit,
}

fn handle_meta(
    meta: &str,
    department: &mut Option<String>,
    formatter: &Formatter,
) -> MetaOutcome {
    let mut parts = meta.split_whitespace();
    match parts.next() {
        Some("exit") | Some("quit") | Some("q") => return MetaOutcome::Exit,
        Some("help") | Some("?") => print_help(formatter),
        Some("department") | Some("dept") => match parts.next() {
            Some(name) => {
                *department = Some(name.to_string());
                println!("{}", formatter.success(&format!("Scoped to department '{}'", name)));
            }
            None => {
                *department = None;
                println!("{}", formatter.success("Department scope cleared"));
            }
        },
        Some(other) => {
            eprintln!(
                "{}",
                formatter.error(&format!("Unknown command ':{}'. Try ':help'.", other))
            );
        }
        None => {}
    }
    MetaOutcome::Continue
}

fn print_help(formatter: &Formatter) {
    println!("{}", formatter.info("Commands:"));
    println!("  <question>            ask a question against the corpus");
    println!("  :department <name>    scope retrieval to one department");
    println!("  :department           clear the department scope");
    println!("  :help                 show this help");
    println!("  :exit                 quit");
}

fn history_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
    Ok(home.join(".verity").join("history"))
}
