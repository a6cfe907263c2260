pub mod repl;
pub mod run;

use std::path::PathBuf;
use std::process::ExitCode;
use titan_runtime::repl::REPL_SOURCE;
use titan_runtime::{ColorMode, Diagnostic, DiagnosticFormatter, RunOptions, Titan};

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Diagnostics were reported
    Failed,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Failed => ExitCode::FAILURE,
        }
    }
}

/// Resolved settings shared by both modes
pub struct Session {
    pub analyze: bool,
    pub execute: bool,
    pub include_dirs: Vec<PathBuf>,
    pub json: bool,
    formatter: DiagnosticFormatter,
}

impl Session {
    pub fn new(
        analyze: bool,
        execute: bool,
        include_dirs: Vec<PathBuf>,
        json: bool,
        color: ColorMode,
    ) -> Self {
        Self {
            analyze,
            execute,
            include_dirs,
            json,
            formatter: DiagnosticFormatter::new(color),
        }
    }

    /// A fresh runtime carrying the session's include directories
    pub fn runtime(&self, options: RunOptions) -> Titan {
        Titan::new()
            .with_include_dirs(self.include_dirs.clone())
            .with_options(options)
    }

    /// Print diagnostics to stderr
    ///
    /// Source windows come from `repl_line` for REPL input and from disk for
    /// everything else.
    pub fn report(&self, diagnostics: Vec<Diagnostic>, repl_line: Option<&str>) {
        for diag in diagnostics {
            let source = match repl_line {
                Some(line) if diag.file == REPL_SOURCE => Some(line.to_string()),
                _ => std::fs::read_to_string(&diag.file).ok(),
            };
            let diag = match source {
                Some(source) => diag.with_source(&source),
                None => diag,
            };

            if self.json {
                match diag.to_json_compact() {
                    Ok(json) => eprintln!("{}", json),
                    Err(e) => tracing::warn!(error = %e, "failed to encode diagnostic"),
                }
            } else {
                self.formatter.emit(&diag);
            }
        }
    }
}
