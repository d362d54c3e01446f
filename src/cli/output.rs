//! User-facing output of the CLI: coloured verdicts, JSON reports and
//! rendered errors.

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::cli::CliError;

// ============================================================================
// REPORT TYPES
// ============================================================================

/// Verdict for one registration file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    /// Schema version; absent when the payload could not be decoded.
    pub version: Option<u8>,
    pub valid: bool,
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEntry {
    pub kind: String,
    pub message: String,
    /// The URL checker's reason for URL failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FileReport {
    pub fn accepted(path: PathBuf, version: u8) -> Self {
        Self {
            path,
            version: Some(version),
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn rejected(path: PathBuf, version: Option<u8>, errors: Vec<ErrorEntry>) -> Self {
        Self {
            path,
            version,
            valid: false,
            errors,
        }
    }
}

// ============================================================================
// PRINTERS
// ============================================================================

pub fn print_reports(reports: &[FileReport]) {
    let mut stdout = StandardStream::stdout(color_choice());

    for report in reports {
        write_verdict(&mut stdout, report.valid);
        let _ = writeln!(stdout, " {}", report.path.display());
        for error in &report.errors {
            let _ = writeln!(stdout, "    [{}] {}", error.kind, error.message);
            if let Some(reason) = &error.reason {
                let _ = writeln!(stdout, "      caused by: {reason}");
            }
        }
    }

    let passed = reports.iter().filter(|r| r.valid).count();
    let _ = writeln!(
        stdout,
        "\n{} accepted, {} rejected",
        passed,
        reports.len() - passed
    );
}

pub fn print_json_report(reports: &[FileReport]) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(reports)?);
    Ok(())
}

pub fn print_url_verdict(url: &str, reason: Option<&str>) {
    let mut stdout = StandardStream::stdout(color_choice());
    write_verdict(&mut stdout, reason.is_none());
    let _ = writeln!(stdout, " {url}");
    if let Some(reason) = reason {
        let _ = writeln!(stdout, "    {reason}");
    }
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

pub fn print_error(error: CliError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn color_choice() -> ColorChoice {
    if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

fn write_verdict(stdout: &mut StandardStream, valid: bool) {
    let (label, color) = if valid {
        ("PASS", Color::Green)
    } else {
        ("FAIL", Color::Red)
    };
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = write!(stdout, "{label}");
    let _ = stdout.reset();
}
