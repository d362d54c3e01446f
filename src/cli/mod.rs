//! The `hookguard` command-line front-end.
//!
//! Loads a [`ValidatorConfig`], builds the checker and option pipeline from
//! it, and runs them over registration files or single URLs.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::checker::UrlChecker;
use crate::cli::args::{Command, HookguardArgs};
use crate::cli::output::{ErrorEntry, FileReport};
use crate::config::{
    build_pipeline, build_url_checker, build_v2_pipeline, ConfigError, ValidatorConfig,
};
use crate::pipeline::Pipeline;
use crate::registration::Registration;
use crate::validator::Validator;

pub mod args;
pub mod output;

/// Every registration passed.
pub const EXIT_OK: i32 = 0;
/// At least one registration or URL was rejected.
pub const EXIT_REJECTED: i32 = 1;
/// The command itself could not run (bad config, unreadable input).
pub const EXIT_ERROR: i32 = 2;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read '{path}'")]
    #[diagnostic(code(hookguard::cli::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk '{path}'")]
    #[diagnostic(code(hookguard::cli::walk))]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("no registration files found under '{path}'")]
    #[diagnostic(
        code(hookguard::cli::empty),
        help("registration files must have a .json extension")
    )]
    NoFiles { path: PathBuf },

    #[error("failed to encode report")]
    #[diagnostic(code(hookguard::cli::report))]
    Report(#[from] serde_json::Error),
}

/// Parses the process arguments, runs the command and returns the exit code.
pub fn run() -> i32 {
    let args = HookguardArgs::parse();

    let result = match args.command {
        Command::Validate { path, config, json } => {
            handle_validate(&path, config.as_deref(), json)
        }
        Command::Options { config } => handle_options(config.as_deref()),
        Command::CheckUrl { url, config } => handle_check_url(&url, config.as_deref()),
    };

    result.unwrap_or_else(|e| {
        output::print_error(e);
        EXIT_ERROR
    })
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

fn handle_validate(path: &Path, config: Option<&Path>, json: bool) -> Result<i32, CliError> {
    let config = load_config(config)?;
    let pipelines = Pipelines {
        v1: build_pipeline(&config)?,
        v2: build_v2_pipeline(&config)?,
    };
    let files = collect_files(path)?;

    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        let text = fs::read_to_string(&file).map_err(|source| CliError::Io {
            path: file.clone(),
            source,
        })?;
        reports.push(validate_payload(file, &text, &pipelines));
    }

    if json {
        output::print_json_report(&reports)?;
    } else {
        output::print_reports(&reports);
    }

    if reports.iter().all(|r| r.valid) {
        Ok(EXIT_OK)
    } else {
        Ok(EXIT_REJECTED)
    }
}

fn handle_options(config: Option<&Path>) -> Result<i32, CliError> {
    let config = load_config(config)?;
    let pipeline = build_pipeline(&config)?;
    output::print_lines(&pipeline.describe());
    Ok(EXIT_OK)
}

fn handle_check_url(url: &str, config: Option<&Path>) -> Result<i32, CliError> {
    let config = load_config(config)?;
    let checker = build_url_checker(&config)?;
    match checker.check(url) {
        Ok(()) => {
            output::print_url_verdict(url, None);
            Ok(EXIT_OK)
        }
        Err(reason) => {
            output::print_url_verdict(url, Some(&reason.to_string()));
            Ok(EXIT_REJECTED)
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<ValidatorConfig, ConfigError> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading validator config");
            ValidatorConfig::from_path(path)
        }
        None => Ok(ValidatorConfig::default()),
    }
}

/// A single file is taken as-is; a directory yields its `*.json` files in
/// name order.
fn collect_files(path: &Path) -> Result<Vec<PathBuf>, CliError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|source| CliError::Walk {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = entry.path().extension().and_then(|e| e.to_str()) == Some("json");
        if entry.file_type().is_file() && is_json {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(CliError::NoFiles {
            path: path.to_path_buf(),
        });
    }
    Ok(files)
}

/// One pipeline per registration version.
struct Pipelines {
    v1: Pipeline,
    v2: Pipeline,
}

impl Pipelines {
    fn for_registration(&self, registration: &Registration) -> &Pipeline {
        match registration {
            Registration::V1(_) => &self.v1,
            Registration::V2(_) => &self.v2,
        }
    }
}

fn validate_payload(path: PathBuf, text: &str, pipelines: &Pipelines) -> FileReport {
    let mut registration = match Registration::from_json(text) {
        Ok(registration) => registration,
        Err(e) => {
            return FileReport::rejected(
                path,
                None,
                vec![ErrorEntry {
                    kind: "decode".to_string(),
                    message: e.to_string(),
                    reason: None,
                }],
            )
        }
    };

    let version = registration.version();
    debug!(
        path = %path.display(),
        variant = registration.as_validator().variant(),
        "validating registration"
    );
    let pipeline = pipelines.for_registration(&registration);
    match registration.validate(pipeline) {
        Ok(()) => FileReport::accepted(path, version),
        Err(errors) => {
            let entries = errors
                .iter()
                .map(|e| ErrorEntry {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                    reason: e.url_error().map(|r| r.to_string()),
                })
                .collect();
            FileReport::rejected(path, Some(version), entries)
        }
    }
}
