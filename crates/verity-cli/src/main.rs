//! Verity CLI - verified question answering over a private document corpus.

use clap::Parser;
use verity_cli::{commands, repl, Cli, Command, Config, Formatter};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> verity_cli::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref())?;

    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        None | Some(Command::Repl) => {
            repl::run_repl(&config, &formatter).await?;
        }
        Some(Command::Ask(args)) => {
            commands::execute_ask(args, &config, &formatter).await?;
        }
        Some(Command::Ingest(args)) => {
            commands::execute_ingest(args, &config, &formatter)?;
        }
        Some(Command::Search(args)) => {
            commands::execute_search(args, &config, &formatter)?;
        }
    }

    Ok(())
}
