//! REPL core logic (UI-agnostic)

use crate::runtime::{RunOptions, RuntimeResult, Titan};
use std::io::Write;

/// Source name reported for REPL input
pub const REPL_SOURCE: &str = "<repl>";

/// REPL core state
///
/// Maintains persistent state across multiple eval calls:
/// - Variables, functions and analyzer scopes persist
/// - Each line is parsed as its own unit
pub struct ReplCore {
    titan: Titan,
    analyze: bool,
    lines: usize,
}

impl ReplCore {
    /// Create a new REPL core writing program output to stdout
    pub fn new(analyze: bool) -> Self {
        Self {
            titan: Self::fresh_runtime(analyze),
            analyze,
            lines: 0,
        }
    }

    /// Redirect program output
    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.titan = self.titan.with_output(out);
        self
    }

    /// Wrap a configured runtime; entry functions are never called
    pub fn with_runtime(titan: Titan) -> Self {
        let analyze = titan.options().analyze;
        Self {
            titan: titan.with_options(RunOptions::interactive(analyze)),
            analyze,
            lines: 0,
        }
    }

    /// Whether a line carries no code
    pub fn is_blank(input: &str) -> bool {
        let trimmed = input.trim();
        trimmed.is_empty() || trimmed.starts_with("//")
    }

    /// Evaluate a line of input
    ///
    /// Runs lex -> parse -> (analyze) -> execute. Blank and comment-only
    /// lines are skipped.
    pub fn eval_line(&mut self, input: &str) -> RuntimeResult<()> {
        if Self::is_blank(input) {
            return Ok(());
        }
        self.lines += 1;
        tracing::debug!(line = self.lines, "evaluating repl input");
        self.titan.run_source(REPL_SOURCE, input).map(|_| ())
    }

    /// Number of non-blank lines evaluated
    pub fn line_count(&self) -> usize {
        self.lines
    }

    pub fn runtime(&self) -> &Titan {
        &self.titan
    }

    /// Reset REPL state
    ///
    /// Clears all variables, functions and analyzer scopes. Program output
    /// returns to stdout.
    pub fn reset(&mut self) {
        self.titan = Self::fresh_runtime(self.analyze);
        self.lines = 0;
    }

    fn fresh_runtime(analyze: bool) -> Titan {
        Titan::new().with_options(RunOptions::interactive(analyze))
    }
}

impl Default for ReplCore {
    fn default() -> Self {
        Self::new(false)
    }
}
