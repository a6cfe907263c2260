//! Lexical analysis (tokenization)
//!
//! The lexer converts Titan source code into a stream of tokens with line and
//! column information. It is a pure function of its input.

use crate::diagnostic::error_codes;
use crate::diagnostic::Diagnostic;
use crate::span::Span;
use crate::token::{Token, TokenKind};

mod literals;

/// Lexer state for tokenizing source code
pub struct Lexer {
    /// Original source code
    pub(super) source: String,
    /// Characters of source code
    pub(super) chars: Vec<char>,
    /// Current position in chars
    pub(super) current: usize,
    /// Current line number (1-indexed)
    pub(super) line: usize,
    /// Current column number (1-indexed)
    pub(super) column: usize,
    /// Start line of current token
    pub(super) start_line: usize,
    /// Start column of current token
    pub(super) start_column: usize,
    /// File name reported in diagnostics
    file: String,
    /// Collected diagnostics
    pub(super) diagnostics: Vec<Diagnostic>,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let chars: Vec<char> = source.chars().collect();
        Self {
            source,
            chars,
            current: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
            file: "<input>".to_string(),
            diagnostics: Vec::new(),
        }
    }

    /// Set the file name attached to lexer diagnostics
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Tokenize the source code, returning tokens and any diagnostics
    ///
    /// The token stream always ends with a single `Eof` token.
    pub fn tokenize(&mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        tracing::trace!(file = %self.file, count = tokens.len(), "tokenized");
        (tokens, std::mem::take(&mut self.diagnostics))
    }

    /// Scan the next token
    fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        self.start_line = self.line;
        self.start_column = self.column;

        if self.is_at_end() {
            return self.make_token(TokenKind::Eof, "");
        }

        let c = self.advance();

        match c {
            // Single-character tokens
            '(' => self.make_token(TokenKind::LeftParen, "("),
            ')' => self.make_token(TokenKind::RightParen, ")"),
            '{' => self.make_token(TokenKind::LeftBrace, "{"),
            '}' => self.make_token(TokenKind::RightBrace, "}"),
            '[' => self.make_token(TokenKind::LeftBracket, "["),
            ']' => self.make_token(TokenKind::RightBracket, "]"),
            ';' => self.make_token(TokenKind::Semicolon, ";"),
            ',' => self.make_token(TokenKind::Comma, ","),
            ':' => self.make_token(TokenKind::Colon, ":"),
            '.' => self.make_token(TokenKind::Dot, "."),
            '@' => self.make_token(TokenKind::At, "@"),
            '$' => self.make_token(TokenKind::Dollar, "$"),
            '\'' => self.make_token(TokenKind::SingleQuote, "'"),
            '?' => self.make_token(TokenKind::Question, "?"),
            '#' => self.make_token(TokenKind::Hash, "#"),

            // Operators with compound forms
            '+' => self.with_assign(TokenKind::Plus, TokenKind::PlusEqual),
            '-' => {
                if self.match_char('>') {
                    self.make_token(TokenKind::Arrow, "->")
                } else {
                    self.with_assign(TokenKind::Minus, TokenKind::MinusEqual)
                }
            }
            '*' => {
                if self.match_char('*') {
                    self.with_assign(TokenKind::StarStar, TokenKind::StarStarEqual)
                } else {
                    self.with_assign(TokenKind::Star, TokenKind::StarEqual)
                }
            }
            '/' => self.with_assign(TokenKind::Slash, TokenKind::SlashEqual),
            '%' => self.with_assign(TokenKind::Percent, TokenKind::PercentEqual),
            '^' => self.with_assign(TokenKind::Caret, TokenKind::CaretEqual),
            '~' => self.with_assign(TokenKind::Tilde, TokenKind::TildeEqual),
            '=' => self.with_assign(TokenKind::Equal, TokenKind::EqualEqual),
            '!' => self.with_assign(TokenKind::Bang, TokenKind::BangEqual),
            '&' => {
                if self.match_char('&') {
                    self.make_token(TokenKind::AmpAmp, "&&")
                } else {
                    self.with_assign(TokenKind::Ampersand, TokenKind::AmpEqual)
                }
            }
            '|' => {
                if self.match_char('|') {
                    self.make_token(TokenKind::PipePipe, "||")
                } else {
                    self.with_assign(TokenKind::Pipe, TokenKind::PipeEqual)
                }
            }
            '<' => {
                if self.match_char('<') {
                    self.with_assign(TokenKind::LessLess, TokenKind::LessLessEqual)
                } else {
                    self.with_assign(TokenKind::Less, TokenKind::LessEqual)
                }
            }
            '>' => {
                if self.match_char('>') {
                    self.with_assign(TokenKind::GreaterGreater, TokenKind::GreaterGreaterEqual)
                } else {
                    self.with_assign(TokenKind::Greater, TokenKind::GreaterEqual)
                }
            }

            '"' => self.string(),

            c if c.is_ascii_digit() => self.number(),

            c if c.is_alphabetic() || c == '_' => self.identifier(),

            _ => self.error_token_with_code(
                error_codes::UNEXPECTED_CHARACTER,
                &format!("Unexpected character '{}'", c),
            ),
        }
    }

    /// Emit `compound` if the next character is `=`, otherwise `plain`
    fn with_assign(&mut self, plain: TokenKind, compound: TokenKind) -> Token {
        if self.match_char('=') {
            self.make_token(compound, compound.as_str())
        } else {
            self.make_token(plain, plain.as_str())
        }
    }

    /// Skip whitespace and `//` comments
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            if self.is_at_end() {
                return;
            }

            match self.peek() {
                ' ' | '\r' | '\t' => {
                    self.advance();
                }
                '\n' => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                }
                '/' if self.peek_next() == Some('/') => {
                    while !self.is_at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    // === Character navigation ===

    /// Advance to next character and return it
    pub(super) fn advance(&mut self) -> char {
        let c = self.chars[self.current];
        self.current += 1;
        self.column += 1;
        c
    }

    /// Peek at current character without advancing
    pub(super) fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.current]
        }
    }

    /// Peek at next character (current + 1)
    pub(super) fn peek_next(&self) -> Option<char> {
        self.chars.get(self.current + 1).copied()
    }

    /// Check if current character matches expected, and advance if so
    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.chars[self.current] != expected {
            false
        } else {
            self.advance();
            true
        }
    }

    /// Check if we've reached the end of source
    pub(super) fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    // === Token creation ===

    /// Span from the token start to the current position
    fn current_span(&self) -> Span {
        let length = if self.line == self.start_line {
            self.column - self.start_column
        } else {
            1
        };
        Span::new(self.start_line, self.start_column, length)
    }

    /// Create a token with the given kind and lexeme
    pub(super) fn make_token(&self, kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, lexeme, self.current_span())
    }

    /// Create an error token and record a diagnostic with a specific code
    pub(super) fn error_token_with_code(&mut self, code: u32, message: &str) -> Token {
        let mut span = self.current_span();
        span.length = span.length.max(1);

        let snippet = self.get_line_snippet(self.start_line);

        self.diagnostics.push(
            Diagnostic::error_with_code(code, message, span)
                .with_file(self.file.clone())
                .with_snippet(snippet)
                .with_label("lexer error"),
        );

        Token::new(TokenKind::Error, message, span)
    }

    /// Get the source line for a given line number
    fn get_line_snippet(&self, line: usize) -> String {
        self.source
            .lines()
            .nth(line.saturating_sub(1))
            .unwrap_or("")
            .to_string()
    }
}
