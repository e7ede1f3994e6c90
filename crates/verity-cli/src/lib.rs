//! Verity CLI library.
//!
//! Command definitions, configuration, output formatting, and the REPL for
//! the `verity` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod repl;

pub use cli::{Cli, CliFormat, Command};
pub use config::{Config, OutputFormat};
pub use error::{CliError, Result};
pub use output::Formatter;
