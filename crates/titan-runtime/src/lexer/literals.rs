//! Literal scanning for the lexer

use crate::diagnostic::error_codes;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

impl Lexer {
    /// Scan a string literal
    ///
    /// The token lexeme holds the unquoted text with `\n`, `\t`, `\r`, `\\`
    /// and `\"` decoded. Other escapes are kept verbatim.
    pub(super) fn string(&mut self) -> Token {
        let mut value = String::new();

        while !self.is_at_end() && self.peek() != '"' {
            if self.peek() == '\n' {
                break;
            }

            if self.peek() == '\\' {
                self.advance();
                if self.is_at_end() {
                    break;
                }
                match self.advance() {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '\\' => value.push('\\'),
                    '"' => value.push('"'),
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
            } else {
                value.push(self.advance());
            }
        }

        if self.is_at_end() || self.peek() != '"' {
            return self.error_token_with_code(
                error_codes::UNTERMINATED_STRING,
                "Unterminated string literal",
            );
        }

        self.advance(); // Closing "
        self.make_token(TokenKind::String, &value)
    }

    /// Scan a number literal: digits with an optional fractional part
    pub(super) fn number(&mut self) -> Token {
        let start = self.current - 1;

        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut kind = TokenKind::Integer;
        if self.peek() == '.' && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            kind = TokenKind::Float;
            self.advance(); // .
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let lexeme: String = self.chars[start..self.current].iter().collect();
        self.make_token(kind, &lexeme)
    }

    /// Scan an identifier or keyword
    pub(super) fn identifier(&mut self) -> Token {
        let start = self.current - 1;

        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let lexeme: String = self.chars[start..self.current].iter().collect();
        let kind = TokenKind::is_keyword(&lexeme).unwrap_or(TokenKind::Identifier);

        self.make_token(kind, &lexeme)
    }
}
