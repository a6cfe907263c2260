//! Diagnostic system for errors
//!
//! Every failure raised by the lexer, parser, analyzer and executor flows
//! through the unified Diagnostic type, so the CLI and embedders render them
//! consistently. The core never prints; see [`formatter`] for terminal output.

pub mod error_codes;
pub mod formatter;

use crate::span::Span;
use error_codes::ErrorTier;
use serde::{Deserialize, Serialize};

/// Diagnostic schema version
pub const DIAG_VERSION: u32 = 1;

/// Controls which parts of a diagnostic are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Print the line number in the location and gutter
    pub show_line_number: bool,
    /// Print the column in the location
    pub show_column: bool,
    /// Print the source window around the error
    pub show_source_chunk: bool,
    /// Emphasize the offending line
    pub highlight_line: bool,
    /// Draw carets under the offending columns
    pub highlight_column: bool,
    /// Lines of context above the offending line
    pub context_lines_above: usize,
    /// Lines of context below the offending line
    pub context_lines_below: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_line_number: true,
            show_column: true,
            show_source_chunk: true,
            highlight_line: true,
            highlight_column: true,
            context_lines_above: 0,
            context_lines_below: 0,
        }
    }
}

/// A diagnostic message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Diagnostic schema version
    pub diag_version: u32,
    /// Tier derived from the code
    pub tier: ErrorTier,
    /// Stable numeric error code (e.g. 1104)
    pub code: u32,
    /// Main diagnostic message
    pub message: String,
    /// File path (or `<repl>`)
    pub file: String,
    /// Line number (1-based, 0 when unknown)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Length of error span
    pub length: usize,
    /// Source line string
    pub snippet: String,
    /// Source lines shown above the snippet
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub context_before: Vec<String>,
    /// Source lines shown below the snippet
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub context_after: Vec<String>,
    /// Short label for caret range
    pub label: String,
    /// Additional notes (optional)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
    /// Suggested fix (optional)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub help: Option<String>,
    /// Rendering switches
    #[serde(skip)]
    pub display: DisplayConfig,
}

impl Diagnostic {
    /// Create a new error diagnostic with code
    ///
    /// Help text is pre-filled from the error code registry when available.
    pub fn error_with_code(code: u32, message: impl Into<String>, span: Span) -> Self {
        Self {
            diag_version: DIAG_VERSION,
            tier: error_codes::tier_of(code),
            code,
            message: message.into(),
            file: "<unknown>".to_string(),
            line: span.line,
            column: span.column,
            length: span.length,
            snippet: String::new(),
            context_before: Vec::new(),
            context_after: Vec::new(),
            label: String::new(),
            notes: Vec::new(),
            help: error_codes::help_for(code).map(String::from),
            display: DisplayConfig::default(),
        }
    }

    /// Create a diagnostic whose message is the registry description of `code`
    pub fn from_code(code: u32, span: Span) -> Self {
        let message = error_codes::description_for(code).unwrap_or("Unknown error");
        Self::error_with_code(code, message, span)
    }

    /// Set the file path
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Set the line number
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// Set the snippet (source line)
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    /// Set the label (caret description)
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Add a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Add a help message
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Replace the display configuration
    pub fn with_display(mut self, display: DisplayConfig) -> Self {
        self.display = display;
        self
    }

    /// Fill the snippet and context window from the full source text
    pub fn with_source(mut self, source: &str) -> Self {
        if self.line == 0 {
            return self;
        }
        let lines: Vec<&str> = source.lines().collect();
        let idx = self.line - 1;
        if let Some(line) = lines.get(idx) {
            self.snippet = (*line).to_string();
        }
        let above = idx.saturating_sub(self.display.context_lines_above);
        self.context_before = lines
            .get(above..idx)
            .unwrap_or_default()
            .iter()
            .map(|l| l.to_string())
            .collect();
        self.context_after = lines
            .iter()
            .skip(idx + 1)
            .take(self.display.context_lines_below)
            .map(|l| l.to_string())
            .collect();
        self
    }

    /// Whether this diagnostic reports a bug in Titan itself
    pub fn is_internal(&self) -> bool {
        self.tier == ErrorTier::Internal
    }

    /// Format as human-readable string
    pub fn to_human_string(&self) -> String {
        let mut output = String::new();

        // Header: error[1104]: Unknown identifier
        output.push_str(&format!("{}[{}]: {}\n", self.tier, self.code, self.message));

        // Location: --> path/to/file.tn:12:9
        if self.line > 0 {
            output.push_str(&format!("  --> {}", self.file));
            if self.display.show_line_number {
                output.push_str(&format!(":{}", self.line));
                if self.display.show_column {
                    output.push_str(&format!(":{}", self.column));
                }
            }
            output.push('\n');
        }

        // Source window with caret
        if self.display.show_source_chunk && !self.snippet.is_empty() {
            output.push_str("   |\n");
            let first = self.line - self.context_before.len();
            for (offset, line) in self.context_before.iter().enumerate() {
                output.push_str(&format!("{:>2} | {}\n", first + offset, line));
            }
            output.push_str(&format!("{:>2} | {}\n", self.line, self.snippet));

            if self.display.highlight_column && self.length > 0 {
                let padding = " ".repeat(self.column.saturating_sub(1));
                let carets = "^".repeat(self.length);
                output.push_str(&format!("   | {}{}", padding, carets));

                if !self.label.is_empty() {
                    output.push_str(&format!(" {}", self.label));
                }
                output.push('\n');
            }

            for (offset, line) in self.context_after.iter().enumerate() {
                output.push_str(&format!("{:>2} | {}\n", self.line + 1 + offset, line));
            }
        }

        for note in &self.notes {
            output.push_str(&format!("   = note: {}\n", note));
        }

        if let Some(help) = &self.help {
            output.push_str(&format!("   = help: {}\n", help));
        }

        output
    }

    /// Format as JSON string
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Format as compact JSON string
    pub fn to_json_compact(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Sort diagnostics by location: file, then line, then column
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        a.file
            .cmp(&b.file)
            .then(a.line.cmp(&b.line))
            .then(a.column.cmp(&b.column))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_creation() {
        let diag = Diagnostic::error_with_code(1104, "Unknown identifier 'x'", Span::new(3, 5, 1));
        assert_eq!(diag.code, 1104);
        assert_eq!(diag.tier, ErrorTier::Semantic);
        assert_eq!(diag.line, 3);
        assert_eq!(diag.column, 5);
        assert_eq!(diag.diag_version, DIAG_VERSION);
        // Help comes from the registry
        assert!(diag.help.is_some());
    }

    #[test]
    fn test_from_code_uses_description() {
        let diag = Diagnostic::from_code(error_codes::ENTRY_NOT_FOUND, Span::dummy());
        assert_eq!(diag.message, "No entry function present in program");
    }

    #[test]
    fn test_builder_pattern() {
        let diag = Diagnostic::error_with_code(1101, "test", Span::new(1, 5, 1))
            .with_file("test.tn")
            .with_line(10)
            .with_snippet("let x: u8 = 3;")
            .with_label("redefined here")
            .with_note("first defined on line 2")
            .with_help("rename it");

        assert_eq!(diag.file, "test.tn");
        assert_eq!(diag.line, 10);
        assert_eq!(diag.snippet, "let x: u8 = 3;");
        assert_eq!(diag.label, "redefined here");
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.help.as_deref(), Some("rename it"));
    }

    #[test]
    fn test_human_format() {
        let diag = Diagnostic::error_with_code(1111, "Unable to implicitly cast types", Span::new(1, 13, 7))
            .with_file("test.tn")
            .with_snippet("let x: u8 = \"hello\";")
            .with_label("string value");

        let output = diag.to_human_string();
        assert!(output.starts_with("error[1111]: Unable to implicitly cast types\n"));
        assert!(output.contains("  --> test.tn:1:13"));
        assert!(output.contains(" 1 | let x: u8 = \"hello\";"));
        assert!(output.contains("^^^^^^^ string value"));
    }

    #[test]
    fn test_internal_header() {
        let diag = Diagnostic::from_code(error_codes::INTERNAL_MARK_UNSET, Span::new(1, 1, 1));
        assert!(diag.is_internal());
        assert!(diag.to_human_string().starts_with("internal error[200]"));
    }

    #[test]
    fn test_no_location_without_line() {
        let diag = Diagnostic::from_code(error_codes::ENTRY_NOT_FOUND, Span::dummy());
        assert!(!diag.to_human_string().contains("-->"));
    }

    #[test]
    fn test_display_config_hides_parts() {
        let display = DisplayConfig {
            show_column: false,
            show_source_chunk: false,
            ..DisplayConfig::default()
        };
        let diag = Diagnostic::error_with_code(304, "Unexpected token", Span::new(2, 4, 1))
            .with_file("a.tn")
            .with_snippet("x = ;")
            .with_display(display);
        let output = diag.to_human_string();
        assert!(output.contains("  --> a.tn:2\n"));
        assert!(!output.contains('^'));
    }

    #[test]
    fn test_with_source_context() {
        let source = "one\ntwo\nthree\nfour";
        let display = DisplayConfig {
            context_lines_above: 1,
            context_lines_below: 1,
            ..DisplayConfig::default()
        };
        let diag = Diagnostic::error_with_code(304, "Unexpected token", Span::new(3, 1, 5))
            .with_display(display)
            .with_source(source);
        assert_eq!(diag.snippet, "three");
        assert_eq!(diag.context_before, vec!["two".to_string()]);
        assert_eq!(diag.context_after, vec!["four".to_string()]);

        let output = diag.to_human_string();
        assert!(output.contains(" 2 | two\n 3 | three\n   | ^^^^^\n 4 | four\n"));
    }

    #[test]
    fn test_with_source_first_line_has_no_context_above() {
        let display = DisplayConfig {
            context_lines_above: 3,
            ..DisplayConfig::default()
        };
        let diag = Diagnostic::error_with_code(304, "x", Span::new(1, 1, 1))
            .with_display(display)
            .with_source("only\nline");
        assert!(diag.context_before.is_empty());
        assert_eq!(diag.snippet, "only");
    }

    #[test]
    fn test_json_format() {
        let diag = Diagnostic::error_with_code(1104, "Unknown identifier", Span::new(1, 1, 3))
            .with_file("test.tn")
            .with_snippet("foo;")
            .with_label("here");

        let json = diag.to_json_string().unwrap();
        assert!(json.contains("\"diag_version\": 1"));
        assert!(json.contains("\"tier\": \"semantic\""));
        assert!(json.contains("\"code\": 1104"));
        assert!(json.contains("\"message\": \"Unknown identifier\""));
    }

    #[test]
    fn test_json_roundtrip() {
        let diag = Diagnostic::error_with_code(2002, "Division by zero", Span::new(4, 2, 5))
            .with_file("test.tn");

        let json = diag.to_json_compact().unwrap();
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, diag);
    }

    #[test]
    fn test_sort_diagnostics() {
        let mut diagnostics = vec![
            Diagnostic::error_with_code(1104, "b", Span::new(1, 1, 1)).with_file("b.tn"),
            Diagnostic::error_with_code(1104, "a10", Span::new(10, 1, 1)).with_file("a.tn"),
            Diagnostic::error_with_code(1104, "a2", Span::new(2, 7, 1)).with_file("a.tn"),
            Diagnostic::error_with_code(1104, "a2early", Span::new(2, 3, 1)).with_file("a.tn"),
        ];

        sort_diagnostics(&mut diagnostics);

        let order: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(order, vec!["a2early", "a2", "a10", "b"]);
    }
}
