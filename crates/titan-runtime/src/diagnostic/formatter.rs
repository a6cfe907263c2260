//! Color-aware diagnostic formatter
//!
//! Formats diagnostics with a source window, caret indicators, and optional
//! terminal colors. Respects NO_COLOR and TITAN_NO_COLOR and auto-detects
//! terminal capabilities.

use crate::diagnostic::error_codes::ErrorTier;
use crate::diagnostic::Diagnostic;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Color mode for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// Always use colors
    Always,
    /// Never use colors
    Never,
    /// Auto-detect terminal capabilities
    Auto,
}

impl ColorMode {
    /// Resolve to a termcolor ColorChoice
    pub fn to_color_choice(self) -> ColorChoice {
        // Always respect NO_COLOR (https://no-color.org)
        if std::env::var("NO_COLOR").is_ok() || std::env::var("TITAN_NO_COLOR").is_ok() {
            return ColorChoice::Never;
        }
        match self {
            ColorMode::Always => ColorChoice::Always,
            ColorMode::Never => ColorChoice::Never,
            ColorMode::Auto => ColorChoice::Auto,
        }
    }
}

/// Diagnostic formatter with color support
pub struct DiagnosticFormatter {
    color_mode: ColorMode,
}

impl DiagnosticFormatter {
    /// Create a new formatter with the given color mode
    pub fn new(color_mode: ColorMode) -> Self {
        Self { color_mode }
    }

    /// Create a formatter that auto-detects color support
    pub fn auto() -> Self {
        Self::new(ColorMode::Auto)
    }

    /// Create a plain (no color) formatter
    pub fn plain() -> Self {
        Self::new(ColorMode::Never)
    }

    /// Format a diagnostic with colors to stderr
    pub fn emit(&self, diag: &Diagnostic) {
        let mut stream = StandardStream::stderr(self.color_mode.to_color_choice());
        let _ = self.write_diagnostic(&mut stream, diag);
    }

    /// Format multiple diagnostics
    pub fn emit_all(&self, diagnostics: &[Diagnostic]) {
        for diag in diagnostics {
            self.emit(diag);
        }
    }

    /// Format a diagnostic with colors to a WriteColor sink
    pub fn write_diagnostic(
        &self,
        w: &mut impl WriteColor,
        diag: &Diagnostic,
    ) -> std::io::Result<()> {
        self.write_header(w, diag)?;

        if diag.line > 0 {
            self.write_location(w, diag)?;
        }

        if diag.display.show_source_chunk && !diag.snippet.is_empty() {
            self.write_source_window(w, diag)?;
        }

        for note in &diag.notes {
            self.write_trailer(w, "note", Color::White, note)?;
        }

        if let Some(help) = &diag.help {
            self.write_trailer(w, "help", Color::Green, help)?;
        }

        writeln!(w)?;
        Ok(())
    }

    /// Format a diagnostic to a buffer (for testing)
    pub fn format_to_buffer(&self, diag: &Diagnostic) -> Vec<u8> {
        let mut buf = termcolor::Buffer::no_color();
        let _ = self.write_diagnostic(&mut buf, diag);
        buf.into_inner()
    }

    fn write_header(&self, w: &mut impl WriteColor, diag: &Diagnostic) -> std::io::Result<()> {
        w.set_color(ColorSpec::new().set_fg(Some(tier_color(diag.tier))).set_bold(true))?;
        write!(w, "{}[{}]", diag.tier, diag.code)?;
        w.reset()?;

        w.set_color(ColorSpec::new().set_bold(true))?;
        write!(w, ": {}", diag.message)?;
        w.reset()?;
        writeln!(w)?;
        Ok(())
    }

    fn write_location(&self, w: &mut impl WriteColor, diag: &Diagnostic) -> std::io::Result<()> {
        w.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        write!(w, "  --> ")?;
        w.reset()?;
        write!(w, "{}", diag.file)?;
        if diag.display.show_line_number {
            write!(w, ":{}", diag.line)?;
            if diag.display.show_column {
                write!(w, ":{}", diag.column)?;
            }
        }
        writeln!(w)?;
        Ok(())
    }

    fn write_source_window(
        &self,
        w: &mut impl WriteColor,
        diag: &Diagnostic,
    ) -> std::io::Result<()> {
        let last_line = diag.line + diag.context_after.len();
        let gutter_width = format!("{}", last_line).len() + 1;

        self.write_gutter(w, None, gutter_width)?;
        writeln!(w)?;

        let first = diag.line - diag.context_before.len();
        for (offset, line) in diag.context_before.iter().enumerate() {
            self.write_gutter(w, Some(first + offset), gutter_width)?;
            writeln!(w, " {}", line)?;
        }

        self.write_gutter(w, Some(diag.line), gutter_width)?;
        if diag.display.highlight_line {
            w.set_color(ColorSpec::new().set_bold(true))?;
            write!(w, " {}", diag.snippet)?;
            w.reset()?;
            writeln!(w)?;
        } else {
            writeln!(w, " {}", diag.snippet)?;
        }

        if diag.display.highlight_column && diag.length > 0 {
            self.write_gutter(w, None, gutter_width)?;
            let padding = compute_display_width(&diag.snippet, diag.column.saturating_sub(1));
            write!(w, " {}", " ".repeat(padding))?;

            let col = diag.column.saturating_sub(1);
            let caret_len = diag
                .length
                .min(diag.snippet.chars().count().saturating_sub(col).max(1));

            w.set_color(ColorSpec::new().set_fg(Some(tier_color(diag.tier))).set_bold(true))?;
            write!(w, "{}", "^".repeat(caret_len))?;
            if !diag.label.is_empty() {
                write!(w, " {}", diag.label)?;
            }
            w.reset()?;
            writeln!(w)?;
        }

        for (offset, line) in diag.context_after.iter().enumerate() {
            self.write_gutter(w, Some(diag.line + 1 + offset), gutter_width)?;
            writeln!(w, " {}", line)?;
        }

        Ok(())
    }

    fn write_gutter(
        &self,
        w: &mut impl WriteColor,
        line: Option<usize>,
        width: usize,
    ) -> std::io::Result<()> {
        w.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        match line {
            Some(n) => write!(w, "{:>width$} |", n, width = width)?,
            None => write!(w, "{:>width$} |", "", width = width)?,
        }
        w.reset()
    }

    fn write_trailer(
        &self,
        w: &mut impl WriteColor,
        kind: &str,
        color: Color,
        text: &str,
    ) -> std::io::Result<()> {
        w.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        write!(w, "   = ")?;
        w.reset()?;

        w.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
        write!(w, "{}", kind)?;
        w.reset()?;

        writeln!(w, ": {}", text)?;
        Ok(())
    }
}

impl Default for DiagnosticFormatter {
    fn default() -> Self {
        Self::auto()
    }
}

fn tier_color(tier: ErrorTier) -> Color {
    match tier {
        ErrorTier::Internal => Color::Magenta,
        ErrorTier::Syntax | ErrorTier::Semantic => Color::Red,
        ErrorTier::Runtime => Color::Yellow,
    }
}

/// Display width of the first `n` characters of a string
fn compute_display_width(s: &str, n: usize) -> usize {
    s.chars().take(n).count()
}

/// Extract a 1-based line from source text
pub fn extract_snippet(source: &str, line: usize) -> Option<String> {
    source.lines().nth(line.checked_sub(1)?).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DisplayConfig;
    use crate::span::Span;

    fn render(diag: &Diagnostic) -> String {
        String::from_utf8(DiagnosticFormatter::plain().format_to_buffer(diag)).unwrap()
    }

    #[test]
    fn test_format_error_to_buffer() {
        let diag = Diagnostic::error_with_code(1111, "Unable to implicitly cast types", Span::new(5, 13, 7))
            .with_file("test.tn")
            .with_snippet("let x: u8 = \"hello\";")
            .with_label("string value");

        let output = render(&diag);
        assert!(output.contains("error[1111]"));
        assert!(output.contains("test.tn:5:13"));
        assert!(output.contains("^^^^^^^ string value"));
        assert!(output.contains("help:"));
    }

    #[test]
    fn test_internal_and_runtime_headers() {
        let internal = Diagnostic::from_code(201, Span::new(1, 1, 1));
        assert!(render(&internal).starts_with("internal error[201]"));

        let runtime = Diagnostic::from_code(2002, Span::new(1, 1, 1));
        assert!(render(&runtime).starts_with("runtime error[2002]"));
    }

    #[test]
    fn test_no_snippet() {
        let diag = Diagnostic::error_with_code(1102, "No entry", Span::new(1, 1, 1)).with_file("t.tn");
        let output = render(&diag);
        assert!(output.contains("error[1102]"));
        assert!(!output.contains('^'));
    }

    #[test]
    fn test_with_notes() {
        let diag = Diagnostic::error_with_code(1100, "dup", Span::new(1, 1, 1))
            .with_note("first defined in a.tn:3")
            .with_note("another note");

        let output = render(&diag);
        assert!(output.contains("note: first defined in a.tn:3"));
        assert!(output.contains("note: another note"));
    }

    #[test]
    fn test_source_window() {
        let display = DisplayConfig {
            context_lines_above: 1,
            context_lines_below: 1,
            ..DisplayConfig::default()
        };
        let diag = Diagnostic::error_with_code(304, "Unexpected token", Span::new(9, 5, 1))
            .with_display(display)
            .with_source("1\n2\n3\n4\n5\n6\n7\nlet a = 1\nlet b = ;\nlet c = 3;");
        let output = render(&diag);
        assert!(output.contains(" 8 | let a = 1\n"));
        assert!(output.contains(" 9 | let b = ;\n"));
        assert!(output.contains("10 | let c = 3;\n"));
    }

    #[test]
    fn test_caret_clamped_to_line() {
        let diag = Diagnostic::error_with_code(304, "x", Span::new(1, 3, 50)).with_snippet("abcd");
        let output = render(&diag);
        assert!(output.contains("   ^^\n"));
    }

    #[test]
    fn test_extract_snippet() {
        let source = "line one\nline two\nline three";
        assert_eq!(extract_snippet(source, 1).unwrap(), "line one");
        assert_eq!(extract_snippet(source, 3).unwrap(), "line three");
        assert!(extract_snippet(source, 4).is_none());
        assert!(extract_snippet(source, 0).is_none());
        assert!(extract_snippet("", 1).is_none());
    }

    #[test]
    fn test_compute_display_width_unicode() {
        assert_eq!(compute_display_width("hello", 3), 3);
        assert_eq!(compute_display_width("h√©llo", 2), 2);
    }

    #[test]
    fn test_color_mode_never() {
        assert_eq!(ColorMode::Never.to_color_choice(), ColorChoice::Never);
    }
}
