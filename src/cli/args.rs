//! Command-line arguments and subcommands of the `hookguard` binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "hookguard",
    version,
    about = "Validate webhook event-subscription registrations."
)]
pub struct HookguardArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate a registration file, or every `*.json` file under a directory.
    Validate {
        /// Registration file or directory.
        #[arg(required = true)]
        path: PathBuf,
        /// Validator configuration (YAML or JSON).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print a JSON report instead of coloured verdicts.
        #[arg(long)]
        json: bool,
    },
    /// List the options of the configured pipeline, in order.
    Options {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run the configured URL checker on one URL.
    CheckUrl {
        #[arg(required = true)]
        url: String,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}
