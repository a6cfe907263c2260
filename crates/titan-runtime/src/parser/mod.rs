//! Parsing (tokens to AST)
//!
//! The parser converts the token stream of one compilation unit into a list
//! of top-level instructions. Uses Pratt parsing for expressions and
//! recursive descent for statements. Imports are resolved while parsing and
//! spliced into the program between `ScopeChange` markers.
//!
//! Parsing stops at the first error; a failed parse yields an empty program.

mod expr;
mod stmt;

use crate::ast::*;
use crate::diagnostic::error_codes;
use crate::diagnostic::Diagnostic;
use crate::imports::{scope_name_from_target, ImportContext};
use crate::span::Span;
use crate::token::{Token, TokenKind};
use crate::types::{BaseType, Variable, Vtd};

/// Parser state for building AST from tokens
pub struct Parser<'ctx> {
    pub(super) tokens: Vec<Token>,
    pub(super) current: usize,
    pub(super) diagnostics: Vec<Diagnostic>,
    /// Cleared by the first error; parsing stops once false
    pub(super) okay: bool,
    mark: Option<usize>,
    source_name: String,
    scope_name: String,
    imports: Option<&'ctx mut ImportContext>,
}

/// Operator precedence levels for Pratt parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum Precedence {
    Lowest,
    Assign,     // = += -= ... (right-assoc)
    Logical,    // && || |
    Bitwise,    // & ^
    Equality,   // == !=
    Relational, // < <= > >=
    Shift,      // << >>
    Sum,        // + -
    Product,    // * / %
    Power,      // ** (right-assoc)
    Prefix,     // ! ~ -
    Call,       // ()
    Index,      // []
}

impl Precedence {
    /// The next lower level, used for right-associative operators
    pub(super) fn lower(self) -> Precedence {
        match self {
            Precedence::Lowest | Precedence::Assign => Precedence::Lowest,
            Precedence::Logical => Precedence::Assign,
            Precedence::Bitwise => Precedence::Logical,
            Precedence::Equality => Precedence::Bitwise,
            Precedence::Relational => Precedence::Equality,
            Precedence::Shift => Precedence::Relational,
            Precedence::Sum => Precedence::Shift,
            Precedence::Product => Precedence::Sum,
            Precedence::Power => Precedence::Product,
            Precedence::Prefix => Precedence::Power,
            Precedence::Call => Precedence::Prefix,
            Precedence::Index => Precedence::Call,
        }
    }
}

impl<'ctx> Parser<'ctx> {
    /// Create a new parser for the given tokens
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", span));
        }
        Self {
            tokens,
            current: 0,
            diagnostics: Vec::new(),
            okay: true,
            mark: None,
            source_name: "<input>".to_string(),
            scope_name: GLOBAL_SCOPE.to_string(),
            imports: None,
        }
    }

    /// Set the name reported in diagnostics and recorded on functions
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    /// Set the module scope this unit is parsed under
    pub fn with_scope_name(mut self, name: impl Into<String>) -> Self {
        self.scope_name = name.into();
        self
    }

    /// Attach the import context used to resolve `import` items
    pub fn with_imports(mut self, imports: &'ctx mut ImportContext) -> Self {
        self.imports = Some(imports);
        self
    }

    /// Parse tokens into a program
    pub fn parse(&mut self) -> (Program, Vec<Diagnostic>) {
        let mut items = Vec::new();

        while self.okay && !self.is_at_end() {
            let result = match self.peek().kind {
                TokenKind::Import => self.parse_import(&mut items),
                TokenKind::Fn => self.parse_function().map(|f| items.push(Instruction::Function(f))),
                kind if Self::starts_statement(kind) => {
                    self.parse_statement().map(|s| items.push(s))
                }
                _ => {
                    let message = format!("Invalid top level item '{}'", self.peek().kind.as_str());
                    self.error(error_codes::INVALID_TOP_LEVEL_ITEM, &message);
                    Err(())
                }
            };
            if result.is_err() {
                break;
            }
        }

        if !self.okay {
            items.clear();
        }

        tracing::debug!(
            source = %self.source_name,
            scope = %self.scope_name,
            items = items.len(),
            ok = self.okay,
            "parsed unit"
        );
        (Program { items }, std::mem::take(&mut self.diagnostics))
    }

    /// Whether a token can begin a statement
    fn starts_statement(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Let
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::Break
        ) || Self::starts_expression(kind)
    }

    // === Top-level parsing ===

    /// Parse `import "path";` and splice the imported unit into `items`
    fn parse_import(&mut self, items: &mut Vec<Instruction>) -> Result<(), ()> {
        let span = self.consume(TokenKind::Import, "Expected 'import'")?.span;
        let target = self
            .consume(TokenKind::String, "Expected string value for given import")?
            .lexeme
            .clone();
        self.consume(TokenKind::Semicolon, "Expected ';' after import")?;

        let Some(ctx) = self.imports.as_deref_mut() else {
            self.error_at(
                error_codes::UNABLE_TO_LOCATE_IMPORT,
                &format!("Unable to locate import target: {} (imports are unavailable here)", target),
                span,
            );
            return Err(());
        };

        let Some(path) = ctx.locate(&target) else {
            self.error_at(
                error_codes::UNABLE_TO_LOCATE_IMPORT,
                &format!("Unable to locate import target: {}", target),
                span,
            );
            return Err(());
        };

        if !ctx.mark_imported(&path) {
            tracing::debug!(target_path = %path.display(), "import already spliced, skipping");
            return Ok(());
        }

        let tokens = match ctx.load(&path) {
            Ok(tokens) => tokens,
            Err(diagnostics) => {
                self.diagnostics.extend(diagnostics);
                self.okay = false;
                return Err(());
            }
        };

        let scope = scope_name_from_target(&target);
        tracing::debug!(target_path = %path.display(), scope = %scope, "parsing import");

        let (program, diagnostics) = Parser::new(tokens)
            .with_source_name(path.display().to_string())
            .with_scope_name(scope.clone())
            .with_imports(ctx)
            .parse();

        if !diagnostics.is_empty() {
            self.diagnostics.extend(diagnostics);
            self.okay = false;
            return Err(());
        }

        items.push(Instruction::ScopeChange { scope, span });
        items.extend(program.items);
        items.push(Instruction::ScopeChange {
            scope: self.scope_name.clone(),
            span,
        });
        Ok(())
    }

    /// Parse a function declaration
    ///
    /// Syntax: `fn name(p: type[N]..., ...) -> type[N]... { body }`
    fn parse_function(&mut self) -> Result<FunctionDecl, ()> {
        let fn_span = self.consume(TokenKind::Fn, "Expected 'fn'")?.span;
        let name = self
            .consume(TokenKind::Identifier, "Expected function name following 'fn'")?
            .lexeme
            .clone();

        self.consume(
            TokenKind::LeftParen,
            "Expected '(' to mark beginning of function parameters",
        )?;

        let mut parameters = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                let param_name = self
                    .consume(TokenKind::Identifier, "Expected variable name for parameter")?
                    .lexeme
                    .clone();
                self.consume(
                    TokenKind::Colon,
                    "Expected colon between name:type in parameter definition",
                )?;
                let vtd = self.parse_type()?;
                parameters.push(Variable::new(param_name, vtd));

                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(
            TokenKind::RightParen,
            "Expected ')' to mark the end of function parameters",
        )?;

        let return_type = if self.match_token(TokenKind::Arrow) {
            self.parse_type()?
        } else {
            Vtd::nil()
        };

        let body = self.parse_block()?;

        Ok(FunctionDecl {
            name,
            source_file: self.source_name.clone(),
            return_type,
            parameters,
            body,
            span: fn_span,
        })
    }

    /// Parse a type name followed by an optional accessor
    pub(super) fn parse_type(&mut self) -> Result<Vtd, ()> {
        let type_name = self
            .consume(TokenKind::Identifier, "Expected type name")?
            .lexeme
            .clone();
        let base = BaseType::from_type_name(&type_name);
        let segments = self.parse_accessor()?;
        Ok(Vtd::array(base, segments))
    }

    /// Consume `[N][M]...` and return the segment sizes
    fn parse_accessor(&mut self) -> Result<Vec<u64>, ()> {
        let mut segments = Vec::new();
        let mut depth: u64 = 1;
        while self.match_token(TokenKind::LeftBracket) {
            let token = self.peek().clone();
            let size = match token.kind {
                TokenKind::Integer => token.lexeme.parse::<u64>().ok(),
                _ => None,
            };
            let Some(size) = size else {
                self.error(
                    error_codes::INTERNAL_NON_NUMERIC_REACHED,
                    &format!("Expected array size but found '{}'", token.lexeme),
                );
                return Err(());
            };
            if size == 0 {
                self.error(
                    error_codes::INTERNAL_NON_NUMERIC_REACHED,
                    "Array size must be at least 1",
                );
                return Err(());
            }
            let Some(next) = depth.checked_mul(size) else {
                self.error(
                    error_codes::INTERNAL_NON_NUMERIC_REACHED,
                    "Array size overflows 64 bits",
                );
                return Err(());
            };
            depth = next;
            self.advance();
            segments.push(size);
            self.consume(TokenKind::RightBracket, "Ending bracket expected")?;
        }
        Ok(segments)
    }

    // === Helper methods ===

    /// Advance to next token and return reference to previous
    pub(super) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current - 1]
    }

    /// Peek at current token
    pub(super) fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    /// Peek `n` tokens past the current one (saturates at end of stream)
    pub(super) fn peek_ahead(&self, n: usize) -> &Token {
        let idx = (self.current + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    /// Check if current token matches kind
    pub(super) fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    /// Match and consume token if it matches
    pub(super) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume token of given kind or raise an unexpected-token error
    pub(super) fn consume(&mut self, kind: TokenKind, message: &str) -> Result<&Token, ()> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let found = self.peek().kind.as_str();
            self.error(
                error_codes::UNEXPECTED_TOKEN,
                &format!("{}, found '{}'", message, found),
            );
            Err(())
        }
    }

    /// Check if at end of token stream
    pub(super) fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len() || self.tokens[self.current].kind == TokenKind::Eof
    }

    /// Remember the current position for [`Parser::reset`]
    pub(super) fn mark(&mut self) {
        self.mark = Some(self.current);
    }

    /// Rewind to the last mark
    pub(super) fn reset(&mut self) -> Result<(), ()> {
        match self.mark.take() {
            Some(pos) if pos <= self.current => {
                self.current = pos;
                Ok(())
            }
            _ => {
                self.error(
                    error_codes::INTERNAL_MARK_UNSET,
                    "Attempt to reset with unset mark",
                );
                Err(())
            }
        }
    }

    /// Record an error at the current token and stop parsing
    pub(super) fn error(&mut self, code: u32, message: &str) {
        let span = self.peek().span;
        self.error_at(code, message, span);
    }

    /// Record an error at `span` and stop parsing
    pub(super) fn error_at(&mut self, code: u32, message: &str, span: Span) {
        if !self.okay {
            return;
        }
        self.okay = false;
        self.diagnostics.push(
            Diagnostic::error_with_code(code, message, span)
                .with_file(self.source_name.clone())
                .with_label("syntax error"),
        );
    }
}
